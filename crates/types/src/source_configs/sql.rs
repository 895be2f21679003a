//! Configuration for SQL databases reached through the backend proxy.

use serde::{Deserialize, Serialize};

pub const DEFAULT_POSTGRES_PORT: u16 = 5432;
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Connection parameters and query text for PostgreSQL or MySQL
///
/// Both dialects share one shape; the enclosing `DataSourceConfig` variant
/// decides which proxy endpoint and default port apply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SqlSourceConfig {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub database: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl: Option<bool>,
    /// Refresh interval in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<u64>,
}
