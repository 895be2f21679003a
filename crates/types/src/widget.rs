//! Widget instance types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::data_source::DataSource;
use crate::layout::LayoutConfig;

/// Identifier of a widget type in the registry (e.g. "number", "chart")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetType(String);

impl WidgetType {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WidgetType {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for WidgetType {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Widget configuration: the common fields plus type-specific extras
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Refresh interval in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_header: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_border: Option<bool>,
    /// Type-specific fields (chartType, format, scadaConfig, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WidgetConfig {
    /// Build from an untyped JSON object; non-object values yield an empty config
    pub fn from_value(value: &Value) -> Self {
        match serde_json::from_value(value.clone()) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring malformed widget config {}: {}", value, e);
                Self::default()
            }
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set a type-specific field
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Look up a type-specific field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

/// A positioned, typed, independently data-bound dashboard element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    /// Unique within its dashboard
    pub id: String,
    #[serde(rename = "type")]
    widget_type: WidgetType,
    #[serde(default)]
    pub config: WidgetConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<DataSource>,
    pub layout: LayoutConfig,
}

impl Widget {
    pub fn new(
        id: impl Into<String>,
        widget_type: impl Into<WidgetType>,
        config: WidgetConfig,
        layout: LayoutConfig,
    ) -> Self {
        Self {
            id: id.into(),
            widget_type: widget_type.into(),
            config,
            data_source: None,
            layout,
        }
    }

    pub fn with_data_source(mut self, data_source: impl Into<DataSource>) -> Self {
        self.data_source = Some(data_source.into());
        self
    }

    /// The widget type; fixed for the lifetime of the widget
    pub fn widget_type(&self) -> &WidgetType {
        &self.widget_type
    }

    /// Title for display, falling back to the widget type
    pub fn display_title(&self) -> &str {
        self.config
            .title
            .as_deref()
            .unwrap_or_else(|| self.widget_type.as_str())
    }
}

/// Partial update of a widget. Id and type cannot be changed.
#[derive(Debug, Clone, Default)]
pub struct WidgetUpdate {
    pub config: Option<WidgetConfig>,
    /// `Some(None)` detaches the data source
    pub data_source: Option<Option<DataSource>>,
    pub layout: Option<LayoutConfig>,
}

impl WidgetUpdate {
    pub fn config(config: WidgetConfig) -> Self {
        Self {
            config: Some(config),
            ..Default::default()
        }
    }

    pub fn data_source(data_source: Option<DataSource>) -> Self {
        Self {
            data_source: Some(data_source),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.config.is_none() && self.data_source.is_none() && self.layout.is_none()
    }

    /// Apply to a widget in place
    pub fn apply_to(self, widget: &mut Widget) {
        if let Some(config) = self.config {
            widget.config = config;
        }
        if let Some(data_source) = self.data_source {
            widget.data_source = data_source;
        }
        if let Some(layout) = self.layout {
            widget.layout = layout;
        }
    }
}
