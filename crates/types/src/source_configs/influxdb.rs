//! InfluxDB 2.x source configuration types.

use serde::{Deserialize, Serialize};

/// Connection settings and Flux query for InfluxDB
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct InfluxDbSourceConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
    /// Flux query text
    pub query: String,
    /// Refresh interval in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<u64>,
}
