//! Summary renderer for graphical widget types
//!
//! Charts, maps, SCADA and robot panels are drawn by graphical front ends;
//! the core describes the shape of their data instead.

use anyhow::Result;
use multidash_core::{RenderInput, WidgetRenderer};
use multidash_types::Widget;
use serde_json::Value;

use super::state_line;

const PREVIEW_LEN: usize = 60;

fn describe(data: &Value) -> String {
    if let (Some(labels), Some(datasets)) = (
        data.get("labels").and_then(Value::as_array),
        data.get("datasets").and_then(Value::as_array),
    ) {
        let names: Vec<&str> = datasets
            .iter()
            .filter_map(|d| d.get("label").and_then(Value::as_str))
            .collect();
        return format!(
            "{} series x {} points ({})",
            datasets.len(),
            labels.len(),
            names.join(", ")
        );
    }
    match data {
        Value::Array(items) => format!("{} items", items.len()),
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("{{{}}}", keys.join(", "))
        }
        other => {
            let text = other.to_string();
            if text.chars().count() > PREVIEW_LEN {
                format!("{}...", text.chars().take(PREVIEW_LEN).collect::<String>())
            } else {
                text
            }
        }
    }
}

pub struct SummaryRenderer {
    id: String,
    name: String,
}

impl SummaryRenderer {
    pub fn new() -> Self {
        Self {
            id: "summary".to_string(),
            name: "Data Summary".to_string(),
        }
    }
}

impl Default for SummaryRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetRenderer for SummaryRenderer {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, widget: &Widget, input: &RenderInput<'_>) -> Result<String> {
        if let Some(line) = state_line(widget, input) {
            return Ok(line);
        }
        let data = input.data.unwrap_or(&Value::Null);
        let kind = widget
            .config
            .get_str("chartType")
            .map(|t| format!("{} {}", t, widget.widget_type()))
            .unwrap_or_else(|| widget.widget_type().to_string());
        Ok(format!("{} [{}]: {}", widget.display_title(), kind, describe(data)))
    }
}
