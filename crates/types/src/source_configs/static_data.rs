//! Static data source configuration types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Keeps an explicit `null` as `Some(Value::Null)` so only a missing field is `None`
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Configuration for a literal in-memory payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StaticSourceConfig {
    /// The payload returned by every fetch. `None` means the field was absent.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Value>,
    /// Refresh interval in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<u64>,
}

impl StaticSourceConfig {
    pub fn new(data: Value) -> Self {
        Self {
            data: Some(data),
            refresh_interval: None,
        }
    }
}
