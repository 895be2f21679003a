//! Source configuration types for all data sources.

pub mod graphql;
pub mod influxdb;
pub mod mqtt;
pub mod rest;
pub mod sql;
pub mod static_data;
pub mod websocket;

// Re-export all source config types for convenience
pub use graphql::GraphqlSourceConfig;
pub use influxdb::InfluxDbSourceConfig;
pub use mqtt::{MqttSourceConfig, QoS, DEFAULT_MQTT_PORT};
pub use rest::{HttpMethod, RestSourceConfig};
pub use sql::{SqlSourceConfig, DEFAULT_MYSQL_PORT, DEFAULT_POSTGRES_PORT};
pub use static_data::StaticSourceConfig;
pub use websocket::{WebSocketSourceConfig, DEFAULT_RECONNECT_INTERVAL_MS};
