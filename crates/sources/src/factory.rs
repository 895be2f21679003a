//! Data source factory: config -> adapter, plus type metadata

use multidash_core::{AdapterProvider, BoxedAdapter, DataSourceError, SourceTypeInfo};
use multidash_types::{DataSource, DataSourceConfig, DataSourceType, Transformer};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::graphql::GraphqlAdapter;
use crate::influxdb::InfluxDbAdapter;
use crate::mqtt::MqttAdapter;
use crate::rest::RestAdapter;
use crate::sql_proxy::{SqlDialect, SqlProxyAdapter};
use crate::static_data::StaticAdapter;
use crate::websocket::WebSocketAdapter;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:3001";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings shared by every adapter the factory builds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorySettings {
    /// Base URL of the backend proxy; relative REST URLs resolve against it
    pub backend_url: String,
    pub http_timeout: Duration,
}

impl Default for FactorySettings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Builds adapters from data source configs
pub struct DataSourceFactory {
    settings: FactorySettings,
    client: Client,
}

impl DataSourceFactory {
    pub fn new(settings: FactorySettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(settings.http_timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
        Ok(Self::with_client(settings, client))
    }

    /// Use an existing HTTP client (its own timeout applies)
    pub fn with_client(settings: FactorySettings, client: Client) -> Self {
        Self { settings, client }
    }

    pub fn settings(&self) -> &FactorySettings {
        &self.settings
    }

    /// Create an adapter for a data source
    pub fn create_adapter(&self, source: &DataSource) -> Result<BoxedAdapter, DataSourceError> {
        self.build(source.config.clone(), source.transformer.clone())
    }

    /// Create an adapter from an untyped JSON config
    pub fn create_adapter_from_value(
        &self,
        config: &Value,
        transformer: Option<Transformer>,
    ) -> Result<BoxedAdapter, DataSourceError> {
        let tag = DataSourceConfig::peek_type_tag(config).ok_or_else(|| {
            DataSourceError::validation("Data source config is missing a type")
        })?;
        if DataSourceType::from_tag(tag).is_none() {
            return Err(DataSourceError::UnsupportedSourceType(tag.to_string()));
        }

        let parsed: DataSourceConfig = serde_json::from_value(config.clone()).map_err(|e| {
            DataSourceError::validation(format!("Invalid {} data source config: {}", tag, e))
        })?;
        self.build(parsed, transformer)
    }

    fn build(
        &self,
        config: DataSourceConfig,
        transformer: Option<Transformer>,
    ) -> Result<BoxedAdapter, DataSourceError> {
        let backend = self.settings.backend_url.as_str();
        let client = self.client.clone();
        log::debug!("Creating {} adapter", config.source_type());

        let adapter: BoxedAdapter = match config {
            DataSourceConfig::Rest(cfg) => {
                Box::new(RestAdapter::new(cfg, transformer, client, backend)?)
            }
            DataSourceConfig::Graphql(cfg) => {
                Box::new(GraphqlAdapter::new(cfg, transformer, client, backend)?)
            }
            DataSourceConfig::Websocket(cfg) => Box::new(WebSocketAdapter::new(cfg, transformer)?),
            DataSourceConfig::Static(cfg) => Box::new(StaticAdapter::new(cfg, transformer)?),
            DataSourceConfig::Postgresql(cfg) => Box::new(SqlProxyAdapter::new(
                SqlDialect::Postgres,
                cfg,
                transformer,
                client,
                backend,
            )?),
            DataSourceConfig::Mysql(cfg) => Box::new(SqlProxyAdapter::new(
                SqlDialect::Mysql,
                cfg,
                transformer,
                client,
                backend,
            )?),
            DataSourceConfig::Mqtt(cfg) => {
                Box::new(MqttAdapter::new(cfg, transformer, client, backend)?)
            }
            DataSourceConfig::Influxdb(cfg) => {
                Box::new(InfluxDbAdapter::new(cfg, transformer, client)?)
            }
        };
        Ok(adapter)
    }

    /// Metadata for every supported source type
    pub fn available_types() -> Vec<SourceTypeInfo> {
        DataSourceType::ALL.into_iter().map(type_info).collect()
    }

    pub fn type_name(source_type: DataSourceType) -> &'static str {
        type_info(source_type).name
    }

    pub fn type_icon(source_type: DataSourceType) -> &'static str {
        type_info(source_type).icon
    }
}

impl AdapterProvider for DataSourceFactory {
    fn adapter_for(&self, source: &DataSource) -> Result<BoxedAdapter, DataSourceError> {
        self.create_adapter(source)
    }
}

/// Display metadata of one source type
pub fn type_info(source_type: DataSourceType) -> SourceTypeInfo {
    let (name, icon, description, requires_backend) = match source_type {
        DataSourceType::Rest => ("REST API", "Globe", "Fetch data from REST endpoints", false),
        DataSourceType::Graphql => ("GraphQL", "Code", "Query GraphQL endpoints", false),
        DataSourceType::Websocket => ("WebSocket", "Radio", "Real-time data via WebSocket", false),
        DataSourceType::Static => ("Static Data", "FileJson", "Use hardcoded JSON data", false),
        DataSourceType::Postgresql => {
            ("PostgreSQL", "Database", "Connect to PostgreSQL database", true)
        }
        DataSourceType::Mysql => ("MySQL", "Database", "Connect to MySQL database", true),
        DataSourceType::Mqtt => ("MQTT", "Radio", "Subscribe to MQTT topics", true),
        DataSourceType::Influxdb => {
            ("InfluxDB", "TrendingUp", "Time-series data from InfluxDB", false)
        }
    };
    SourceTypeInfo {
        source_type,
        name,
        icon,
        description,
        requires_backend,
    }
}
