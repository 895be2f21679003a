//! Built-in widget catalog
//!
//! Registers every widget type the dashboard ships with. Each type gets a
//! textual renderer: number, table and text widgets have dedicated ones, the
//! graphical types share a summary renderer that describes their data.

mod number;
mod summary;
mod table;
mod text;

pub use number::{format_number, NumberRenderer, Trend};
pub use summary::SummaryRenderer;
pub use table::TableRenderer;
pub use text::TextRenderer;

use multidash_core::{RenderInput, SharedRenderer, WidgetDefinition, WidgetRegistry};
use multidash_types::{DefaultLayout, Widget};
use serde_json::{json, Value};
use std::sync::Arc;

/// Render the loading / error / empty states shared by every renderer.
///
/// Returns `None` when there is data to draw.
pub(crate) fn state_line(widget: &Widget, input: &RenderInput<'_>) -> Option<String> {
    let title = widget.display_title();
    if let Some(error) = input.error {
        if input.data.is_none() {
            return Some(format!("{}: error: {}", title, error.message));
        }
    }
    match input.data {
        Some(_) => None,
        None if input.is_loading => Some(format!("{}: loading...", title)),
        None => Some(format!("{}: no data", title)),
    }
}

/// Config defaults every widget type starts with
fn base_config(title: &str) -> Value {
    json!({"title": title, "showHeader": true, "showBorder": true})
}

/// Merge type-specific fields over the base config
fn config_with(title: &str, fields: Value) -> Value {
    let mut config = base_config(title);
    if let (Some(base), Value::Object(extra)) = (config.as_object_mut(), fields) {
        base.extend(extra);
    }
    config
}

struct Entry {
    widget_type: &'static str,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    config: Value,
    layout: DefaultLayout,
}

fn catalog() -> Vec<Entry> {
    let entry = |widget_type, name, description, icon, config, (w, h, min_w, min_h, max_w, max_h)| Entry {
        widget_type,
        name,
        description,
        icon,
        config,
        layout: DefaultLayout::new(w, h).with_min(min_w, min_h).with_max(max_w, max_h),
    };

    vec![
        entry(
            "number",
            "Number Widget",
            "Display KPI numbers with trend indicators",
            "Hash",
            config_with(
                "New Number Widget",
                json!({"format": "number", "decimals": 0, "showTrend": false, "size": "md"}),
            ),
            (3, 3, 2, 2, 6, 4),
        ),
        entry(
            "chart",
            "Chart Widget",
            "Display data in various chart types",
            "BarChart",
            config_with(
                "New Chart",
                json!({
                    "chartType": "line",
                    "showLegend": true,
                    "showGrid": true,
                    "smooth": false,
                    "colors": ["#3b82f6", "#10b981", "#f59e0b", "#ef4444"]
                }),
            ),
            (6, 5, 4, 4, 12, 8),
        ),
        entry(
            "table",
            "Table Widget",
            "Display data in a sortable table",
            "Table",
            config_with(
                "New Table",
                json!({"pagination": true, "pageSize": 10, "sortable": true, "striped": true}),
            ),
            (8, 6, 6, 5, 12, 10),
        ),
        entry(
            "text",
            "Text Widget",
            "Display static text or markdown content",
            "FileText",
            config_with(
                "New Text Widget",
                json!({"content": "Enter your text here...", "markdown": false, "align": "left"}),
            ),
            (4, 3, 3, 2, 12, 6),
        ),
        entry(
            "map",
            "Map Widget",
            "Display geospatial data on a map",
            "Map",
            config_with(
                "New Map",
                json!({"center": [13.7563, 100.5018], "zoom": 12, "markerColor": "#3b82f6"}),
            ),
            (6, 6, 4, 4, 12, 10),
        ),
        entry(
            "scada",
            "SCADA Widget",
            "Industrial equipment visualization with alarms",
            "Cpu",
            base_config("Equipment"),
            (4, 5, 3, 4, 6, 8),
        ),
        entry(
            "sankey",
            "Sankey Diagram",
            "Visualize flow and relationships between data points",
            "GitBranch",
            base_config("Flow Diagram"),
            (6, 6, 4, 4, 12, 10),
        ),
        entry(
            "piechart",
            "Pie Chart",
            "Display proportional data in a circular chart",
            "PieChart",
            config_with(
                "Distribution",
                json!({
                    "showLegend": true,
                    "showLabels": true,
                    "innerRadius": 0,
                    "colors": [
                        "#3b82f6", "#10b981", "#f59e0b", "#ef4444",
                        "#8b5cf6", "#ec4899", "#06b6d4", "#84cc16"
                    ]
                }),
            ),
            (4, 5, 3, 4, 8, 8),
        ),
        entry(
            "robot-status",
            "Robot Status",
            "Display robot controller overall status and mode",
            "Activity",
            base_config("Robot Status"),
            (3, 4, 3, 4, 5, 6),
        ),
        entry(
            "robot-position",
            "Robot Position",
            "Display robot X, Y, Z position and rotation",
            "Move",
            base_config("Robot Position"),
            (4, 6, 4, 5, 6, 8),
        ),
        entry(
            "robot-joint",
            "Joint Status",
            "Display robot joint angles with visual indicators",
            "Cog",
            base_config("Joint Angles"),
            (4, 6, 3, 5, 6, 8),
        ),
        entry(
            "robot-io",
            "Digital I/O",
            "Monitor digital inputs and outputs status",
            "ToggleRight",
            base_config("I/O Signals"),
            (4, 7, 3, 6, 6, 10),
        ),
        entry(
            "robot-speed",
            "Speed Monitor",
            "Display linear/angular speed and acceleration",
            "Gauge",
            base_config("Speed & Acceleration"),
            (4, 5, 3, 4, 6, 7),
        ),
        entry(
            "robot-error",
            "Error & Alarms",
            "Display robot errors, warnings and alarms",
            "AlertCircle",
            base_config("Errors & Alarms"),
            (5, 6, 4, 5, 8, 10),
        ),
    ]
}

fn renderer_for(widget_type: &str) -> SharedRenderer {
    match widget_type {
        "number" => Arc::new(NumberRenderer::new()),
        "table" => Arc::new(TableRenderer::new()),
        "text" => Arc::new(TextRenderer::new()),
        _ => Arc::new(SummaryRenderer::new()),
    }
}

/// Register all built-in widget types. Returns how many were added.
pub fn register_all(registry: &mut WidgetRegistry) -> usize {
    let mut added = 0;
    for entry in catalog() {
        let definition = WidgetDefinition::new(
            entry.widget_type,
            entry.name,
            renderer_for(entry.widget_type),
            entry.layout,
        )
        .with_description(entry.description)
        .with_icon(entry.icon)
        .with_default_config(entry.config);

        if registry.register(definition) {
            added += 1;
        }
    }
    log::info!("Registered {} widget types", added);
    added
}
