//! Data source configuration union and the transform pairing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub use crate::source_configs::{
    GraphqlSourceConfig, InfluxDbSourceConfig, MqttSourceConfig, RestSourceConfig,
    SqlSourceConfig, StaticSourceConfig, WebSocketSourceConfig,
};

/// Every data source type known to the factory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceType {
    Rest,
    Graphql,
    Websocket,
    Static,
    Postgresql,
    Mysql,
    Mqtt,
    Influxdb,
}

impl DataSourceType {
    pub const ALL: [DataSourceType; 8] = [
        DataSourceType::Rest,
        DataSourceType::Graphql,
        DataSourceType::Websocket,
        DataSourceType::Static,
        DataSourceType::Postgresql,
        DataSourceType::Mysql,
        DataSourceType::Mqtt,
        DataSourceType::Influxdb,
    ];

    /// The `type` tag used in JSON documents
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSourceType::Rest => "rest",
            DataSourceType::Graphql => "graphql",
            DataSourceType::Websocket => "websocket",
            DataSourceType::Static => "static",
            DataSourceType::Postgresql => "postgresql",
            DataSourceType::Mysql => "mysql",
            DataSourceType::Mqtt => "mqtt",
            DataSourceType::Influxdb => "influxdb",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl fmt::Display for DataSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-safe enum for all source configurations.
/// Uses serde tag for JSON serialization: {"type": "rest", ...}
///
/// The variant is fixed once a value exists; switching source type means
/// building a new `DataSourceConfig`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DataSourceConfig {
    Rest(RestSourceConfig),
    Graphql(GraphqlSourceConfig),
    Websocket(WebSocketSourceConfig),
    Static(StaticSourceConfig),
    Postgresql(SqlSourceConfig),
    Mysql(SqlSourceConfig),
    Mqtt(MqttSourceConfig),
    Influxdb(InfluxDbSourceConfig),
}

impl DataSourceConfig {
    /// Get the source type
    pub fn source_type(&self) -> DataSourceType {
        match self {
            DataSourceConfig::Rest(_) => DataSourceType::Rest,
            DataSourceConfig::Graphql(_) => DataSourceType::Graphql,
            DataSourceConfig::Websocket(_) => DataSourceType::Websocket,
            DataSourceConfig::Static(_) => DataSourceType::Static,
            DataSourceConfig::Postgresql(_) => DataSourceType::Postgresql,
            DataSourceConfig::Mysql(_) => DataSourceType::Mysql,
            DataSourceConfig::Mqtt(_) => DataSourceType::Mqtt,
            DataSourceConfig::Influxdb(_) => DataSourceType::Influxdb,
        }
    }

    /// Refresh interval in milliseconds, if any
    pub fn refresh_interval_ms(&self) -> Option<u64> {
        match self {
            DataSourceConfig::Rest(cfg) => cfg.refresh_interval,
            DataSourceConfig::Graphql(cfg) => cfg.refresh_interval,
            DataSourceConfig::Websocket(cfg) => cfg.refresh_interval,
            DataSourceConfig::Static(cfg) => cfg.refresh_interval,
            DataSourceConfig::Postgresql(cfg) => cfg.refresh_interval,
            DataSourceConfig::Mysql(cfg) => cfg.refresh_interval,
            DataSourceConfig::Mqtt(cfg) => cfg.refresh_interval,
            DataSourceConfig::Influxdb(cfg) => cfg.refresh_interval,
        }
    }

    /// Returns a copy with a different refresh interval, keeping the variant
    pub fn with_refresh_interval(mut self, interval_ms: Option<u64>) -> Self {
        match &mut self {
            DataSourceConfig::Rest(cfg) => cfg.refresh_interval = interval_ms,
            DataSourceConfig::Graphql(cfg) => cfg.refresh_interval = interval_ms,
            DataSourceConfig::Websocket(cfg) => cfg.refresh_interval = interval_ms,
            DataSourceConfig::Static(cfg) => cfg.refresh_interval = interval_ms,
            DataSourceConfig::Postgresql(cfg) => cfg.refresh_interval = interval_ms,
            DataSourceConfig::Mysql(cfg) => cfg.refresh_interval = interval_ms,
            DataSourceConfig::Mqtt(cfg) => cfg.refresh_interval = interval_ms,
            DataSourceConfig::Influxdb(cfg) => cfg.refresh_interval = interval_ms,
        }
        self
    }

    /// True for transports that push data rather than being polled
    pub fn is_streaming(&self) -> bool {
        matches!(
            self,
            DataSourceConfig::Websocket(_) | DataSourceConfig::Mqtt(_)
        )
    }

    /// Read the `type` tag of an untyped JSON config without parsing the rest
    pub fn peek_type_tag(value: &Value) -> Option<&str> {
        value.get("type").and_then(Value::as_str)
    }
}

type TransformFn = dyn Fn(Value) -> anyhow::Result<Value> + Send + Sync;

/// User-supplied transform applied to every fetched payload
///
/// Cloning shares the same closure; equality is identity of that closure,
/// so two bindings only compare equal when they use the very same transform.
#[derive(Clone)]
pub struct Transformer(Arc<TransformFn>);

impl Transformer {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Run the transform. Panics are not caught here; see
    /// `multidash_core::apply_transform`.
    pub fn call(&self, value: Value) -> anyhow::Result<Value> {
        (self.0)(value)
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transformer({:p})", Arc::as_ptr(&self.0))
    }
}

impl PartialEq for Transformer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A data source config together with its optional transform
///
/// Only `config` is persisted; transforms live in code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataSource {
    pub config: DataSourceConfig,
    #[serde(skip)]
    pub transformer: Option<Transformer>,
}

impl DataSource {
    pub fn new(config: DataSourceConfig) -> Self {
        Self {
            config,
            transformer: None,
        }
    }

    pub fn with_transformer(mut self, transformer: Transformer) -> Self {
        self.transformer = Some(transformer);
        self
    }
}

impl From<DataSourceConfig> for DataSource {
    fn from(config: DataSourceConfig) -> Self {
        DataSource::new(config)
    }
}
