//! multidash-sources: Data source adapters for multidash dashboards.
//!
//! One adapter per transport, all behind the `DataSourceAdapter` contract,
//! and the `DataSourceFactory` that picks the right one for a config.

mod factory;
mod graphql;
mod http;
mod influxdb;
mod mqtt;
mod rest;
mod sql_proxy;
mod static_data;
mod websocket;

pub use factory::{
    type_info, DataSourceFactory, FactorySettings, DEFAULT_BACKEND_URL, DEFAULT_HTTP_TIMEOUT,
};
pub use graphql::{GraphqlAdapter, GRAPHQL_ERROR_CODE};
pub use influxdb::{flatten_tables, parse_csv, InfluxDbAdapter};
pub use mqtt::{MqttAdapter, MqttListener, INITIAL_DATA_WAIT};
pub use rest::RestAdapter;
pub use sql_proxy::{SqlDialect, SqlProxyAdapter};
pub use static_data::{StaticAdapter, STATIC_DELAY};
pub use websocket::{WebSocketAdapter, FETCH_TIMEOUT, MAX_RECONNECT_ATTEMPTS, MESSAGE_BUFFER_SIZE};
