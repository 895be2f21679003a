//! multidash: widget registry, data-source adapters and dashboard store
//!
//! This library wires the workspace crates into an application core:
//! - Dashboard store with pluggable persistence and auto-rotation
//! - Data bindings that keep widget data fresh from their sources
//! - Built-in widget catalogue and text renderers
//! - Configuration management

pub mod commands;
pub mod config;
pub mod core;
pub mod widgets;

// Re-export commonly used types
pub use commands::Session;
pub use config::AppConfig;
pub use core::{DashboardStore, DataBinding, SharedStore};
