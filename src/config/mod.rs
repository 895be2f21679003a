//! Configuration management

mod demo;
mod settings;

pub use demo::{demo_dashboard, DEMO_DASHBOARD_ID};
pub use settings::{AppConfig, BindingConfig};
