//! Number (KPI) widget renderer

use anyhow::Result;
use multidash_core::{RenderInput, WidgetRenderer};
use multidash_types::Widget;
use serde_json::Value;

use super::state_line;

/// Direction of change against the previous value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trend {
    Up(f64),
    Down(f64),
    Neutral,
}

impl Trend {
    /// Percentage change of `current` against `previous`
    pub fn between(current: f64, previous: f64) -> Self {
        if previous == 0.0 {
            return Trend::Neutral;
        }
        let percentage = (current - previous) / previous * 100.0;
        if percentage > 0.0 {
            Trend::Up(percentage.abs())
        } else if percentage < 0.0 {
            Trend::Down(percentage.abs())
        } else {
            Trend::Neutral
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Trend::Up(_) => "▲",
            Trend::Down(_) => "▼",
            Trend::Neutral => "-",
        }
    }

    fn percentage(&self) -> f64 {
        match self {
            Trend::Up(p) | Trend::Down(p) => *p,
            Trend::Neutral => 0.0,
        }
    }
}

/// Group the integer part in thousands
fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a value the way number widgets display it.
///
/// `number` and `currency` group thousands; `percentage` appends `%`.
/// Currency symbols come from the widget's `prefix`.
pub fn format_number(value: f64, format: &str, decimals: usize, prefix: &str, suffix: &str) -> String {
    let body = match format {
        "percentage" => format!("{:.*}%", decimals, value),
        _ => {
            let fixed = format!("{:.*}", decimals, value.abs());
            let (int_part, frac_part) = match fixed.split_once('.') {
                Some((i, f)) => (i, Some(f)),
                None => (fixed.as_str(), None),
            };
            let sign = if value < 0.0 { "-" } else { "" };
            match frac_part {
                Some(f) => format!("{}{}.{}", sign, group_thousands(int_part), f),
                None => format!("{}{}", sign, group_thousands(int_part)),
            }
        }
    };
    format!("{}{}{}", prefix, body, suffix)
}

pub struct NumberRenderer {
    id: String,
    name: String,
}

impl NumberRenderer {
    pub fn new() -> Self {
        Self {
            id: "number".to_string(),
            name: "Number Display".to_string(),
        }
    }
}

impl Default for NumberRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetRenderer for NumberRenderer {
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

        // Accept either {value, previousValue, trend} or a bare number
        let value = data
            .get("value")
            .and_then(Value::as_f64)
            .or_else(|| data.as_f64())
            .ok_or_else(|| anyhow::anyhow!("Expected a numeric value, got {}", data))?;

        let config = &widget.config;
        let formatted = format_number(
            value,
            config.get_str("format").unwrap_or("number"),
            config.get("decimals").and_then(Value::as_u64).unwrap_or(0) as usize,
            config.get_str("prefix").unwrap_or(""),
            config.get_str("suffix").unwrap_or(""),
        );

        let mut line = format!("{}: {}", widget.display_title(), formatted);

        let show_trend = config.get("showTrend").and_then(Value::as_bool).unwrap_or(false);
        if show_trend {
            let previous = data.get("previousValue").and_then(Value::as_f64);
            let computed = previous
                .map(|p| Trend::between(value, p))
                .unwrap_or(Trend::Neutral);
            // An explicit trend wins over the computed direction
            let trend = match data.get("trend").and_then(Value::as_str) {
                Some("up") => Trend::Up(computed.percentage()),
                Some("down") => Trend::Down(computed.percentage()),
                Some(_) => Trend::Neutral,
                None => computed,
            };
            line.push_str(&format!(" {} {:.1}%", trend.symbol(), trend.percentage()));
        }

        if input.error.is_some() {
            line.push_str(" (stale)");
        }
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multidash_core::ApiError;
    use multidash_types::{DefaultLayout, WidgetConfig};
    use serde_json::json;

    fn widget(config: WidgetConfig) -> Widget {
        Widget::new("kpi", "number", config, DefaultLayout::new(3, 3).at(0, 0))
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(125430.0, "currency", 0, "$", ""), "$125,430");
        assert_eq!(format_number(3.8, "percentage", 1, "", ""), "3.8%");
        assert_eq!(format_number(-1234567.891, "number", 2, "", " units"), "-1,234,567.89 units");
        assert_eq!(format_number(842.0, "number", 0, "", ""), "842");
    }

    #[test]
    fn test_trend() {
        assert_eq!(Trend::between(125.0, 100.0), Trend::Up(25.0));
        assert_eq!(Trend::between(50.0, 100.0), Trend::Down(50.0));
        assert_eq!(Trend::between(5.0, 0.0), Trend::Neutral);
    }

    #[test]
    fn test_render_with_trend() {
        let w = widget(
            WidgetConfig::default()
                .with_title("Active Users")
                .with("showTrend", json!(true)),
        );
        let data = json!({"value": 2543, "previousValue": 2890, "trend": "down"});
        let out = NumberRenderer::new()
            .render(&w, &RenderInput { data: Some(&data), ..Default::default() })
            .unwrap();
        assert_eq!(out, "Active Users: 2,543 ▼ 12.0%");
    }

    #[test]
    fn test_render_states() {
        let w = widget(WidgetConfig::default().with_title("Orders"));
        let renderer = NumberRenderer::new();
        assert_eq!(
            renderer
                .render(&w, &RenderInput { is_loading: true, ..Default::default() })
                .unwrap(),
            "Orders: loading..."
        );

        let error = ApiError {
            message: "HTTP 500: Internal Server Error".into(),
            code: Some("FETCH_ERROR".into()),
        };
        assert_eq!(
            renderer
                .render(&w, &RenderInput { error: Some(&error), ..Default::default() })
                .unwrap(),
            "Orders: error: HTTP 500: Internal Server Error"
        );

        let data = json!(42);
        assert_eq!(
            renderer
                .render(&w, &RenderInput { data: Some(&data), error: Some(&error), is_loading: false })
                .unwrap(),
            "Orders: 42 (stale)"
        );
    }

    #[test]
    fn test_non_numeric_data_is_an_error() {
        let w = widget(WidgetConfig::default());
        let data = json!({"value": "n/a"});
        assert!(NumberRenderer::new()
            .render(&w, &RenderInput { data: Some(&data), ..Default::default() })
            .is_err());
    }
}
