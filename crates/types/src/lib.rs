//! multidash-types: Shared data types for the multidash dashboard core.
//!
//! This crate contains pure data types (source configs, layouts, widgets,
//! dashboards) that are shared across all multidash crates. These types carry
//! no I/O, making them suitable as a foundation layer.

pub mod dashboard;
pub mod data_source;
pub mod layout;
pub mod source_configs;
pub mod widget;

// Re-export commonly used types at the crate root for convenience
pub use dashboard::{AutoRotateConfig, Dashboard, DashboardCollection};
pub use data_source::{DataSource, DataSourceConfig, DataSourceType, Transformer};
pub use layout::{Breakpoints, CompactType, DefaultLayout, GridLayout, LayoutConfig};
pub use source_configs::{
    GraphqlSourceConfig, HttpMethod, InfluxDbSourceConfig, MqttSourceConfig, QoS,
    RestSourceConfig, SqlSourceConfig, StaticSourceConfig, WebSocketSourceConfig,
};
pub use widget::{Widget, WidgetConfig, WidgetType, WidgetUpdate};
