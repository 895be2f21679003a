//! Widget renderer trait and related types

use anyhow::Result;
use multidash_types::Widget;
use serde_json::Value;
use std::sync::Arc;

use crate::error::ApiError;

/// What a renderer receives for one widget on each update
#[derive(Debug, Clone, Default)]
pub struct RenderInput<'a> {
    /// Last good data, if any fetch succeeded
    pub data: Option<&'a Value>,
    pub is_loading: bool,
    pub error: Option<&'a ApiError>,
}

/// Trait for all widget renderers
///
/// Renderers turn a widget and its bound data into a presentation. The core
/// only needs a textual form; graphical front ends wrap their own drawing
/// behind the same trait.
pub trait WidgetRenderer: Send + Sync {
    /// Unique identifier for this renderer
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    /// Render the widget with its current data state
    fn render(&self, widget: &Widget, input: &RenderInput<'_>) -> Result<String>;
}

/// Shared renderer handle stored in widget definitions
pub type SharedRenderer = Arc<dyn WidgetRenderer>;
