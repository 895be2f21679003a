//! Text widget renderer

use anyhow::Result;
use multidash_core::{RenderInput, WidgetRenderer};
use multidash_types::Widget;
use serde_json::Value;

/// Renders configured content; bound data, when present, replaces it
pub struct TextRenderer {
    id: String,
    name: String,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self {
            id: "text".to_string(),
            name: "Text Display".to_string(),
        }
    }
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetRenderer for TextRenderer {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, widget: &Widget, input: &RenderInput<'_>) -> Result<String> {
        let content = match input.data {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => widget.config.get_str("content").unwrap_or_default().to_string(),
            Some(other) => other
                .get("content")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        };
        Ok(format!("{}: {}", widget.display_title(), content))
    }
}
