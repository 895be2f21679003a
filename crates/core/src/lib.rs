//! multidash-core: Core traits and registry for the multidash dashboard core.
//!
//! This crate contains the fundamental traits (DataSourceAdapter,
//! WidgetRenderer), the error taxonomy shared by adapters and bindings, and
//! the widget registry.

mod data_source;
mod error;
mod registry;
mod renderer;

pub use data_source::{
    apply_transform, AdapterProvider, BoxedAdapter, DataSourceAdapter, SourceTypeInfo,
};
pub use error::{ApiError, DataSourceError};
pub use registry::{WidgetDefinition, WidgetRegistry};
pub use renderer::{RenderInput, SharedRenderer, WidgetRenderer};

// Re-export types used in trait signatures for convenience
pub use multidash_types::{DataSource, DataSourceConfig, DataSourceType, Transformer, Widget};
