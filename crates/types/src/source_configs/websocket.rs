//! WebSocket source configuration types.

use serde::{Deserialize, Serialize};

/// Delay between reconnect attempts when none is configured
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 3000;

/// Configuration for a streaming WebSocket source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketSourceConfig {
    /// Must use the ws:// or wss:// scheme
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocols: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect: Option<bool>,
    /// Reconnect delay in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_interval: Option<u64>,
    /// Refresh interval in milliseconds (absent means push-driven)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<u64>,
}

impl WebSocketSourceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn reconnect_enabled(&self) -> bool {
        self.reconnect.unwrap_or(false)
    }

    pub fn reconnect_interval_ms(&self) -> u64 {
        self.reconnect_interval.unwrap_or(DEFAULT_RECONNECT_INTERVAL_MS)
    }
}
