//! Table widget renderer

use anyhow::Result;
use multidash_core::{RenderInput, WidgetRenderer};
use multidash_types::Widget;
use serde_json::Value;

use super::state_line;

/// (accessor, header) pairs
type Columns = Vec<(String, String)>;

/// Columns and rows from either `{columns, rows}` or a plain array of objects
fn table_parts(data: &Value) -> Option<(Columns, &Vec<Value>)> {
    if let Some(rows) = data.as_array() {
        let columns = rows
            .first()
            .and_then(Value::as_object)
            .map(|first| first.keys().map(|k| (k.clone(), k.clone())).collect())
            .unwrap_or_default();
        return Some((columns, rows));
    }

    let rows = data.get("rows")?.as_array()?;
    let columns = match data.get("columns").and_then(Value::as_array) {
        Some(columns) => columns
            .iter()
            .filter_map(|c| {
                let accessor = c.get("accessor").or_else(|| c.get("id"))?.as_str()?;
                let header = c.get("header").and_then(Value::as_str).unwrap_or(accessor);
                Some((accessor.to_string(), header.to_string()))
            })
            .collect(),
        None => Vec::new(),
    };
    Some((columns, rows))
}

fn cell(row: &Value, accessor: &str) -> String {
    match row.get(accessor) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

pub struct TableRenderer {
    id: String,
    name: String,
}

impl TableRenderer {
    pub fn new() -> Self {
        Self {
            id: "table".to_string(),
            name: "Table Display".to_string(),
        }
    }
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetRenderer for TableRenderer {
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
        let (columns, rows) =
            table_parts(data).ok_or_else(|| anyhow::anyhow!("Table data needs rows"))?;

        let paginate = widget
            .config
            .get("pagination")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let page_size = widget
            .config
            .get("pageSize")
            .and_then(Value::as_u64)
            .unwrap_or(10) as usize;
        let shown = if paginate { rows.len().min(page_size) } else { rows.len() };

        let mut lines = vec![widget.display_title().to_string()];
        lines.push(
            columns
                .iter()
                .map(|(_, header)| header.as_str())
                .collect::<Vec<_>>()
                .join(" | "),
        );
        for row in &rows[..shown] {
            lines.push(
                columns
                    .iter()
                    .map(|(accessor, _)| cell(row, accessor))
                    .collect::<Vec<_>>()
                    .join(" | "),
            );
        }
        if shown < rows.len() {
            lines.push(format!("page 1 of {}", rows.len().div_ceil(page_size.max(1))));
        }
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multidash_types::{DefaultLayout, WidgetConfig};
    use serde_json::json;

    fn render(config: WidgetConfig, data: Value) -> String {
        let widget = Widget::new("t", "table", config, DefaultLayout::new(8, 6).at(0, 0));
        TableRenderer::new()
            .render(&widget, &RenderInput { data: Some(&data), ..Default::default() })
            .unwrap()
    }

    #[test]
    fn test_columns_and_pagination() {
        let config = WidgetConfig::default()
            .with_title("Orders")
            .with("pagination", json!(true))
            .with("pageSize", json!(2));
        let data = json!({
            "columns": [
                {"id": "id", "header": "Order ID", "accessor": "id"},
                {"id": "amount", "header": "Amount", "accessor": "amount"}
            ],
            "rows": [
                {"id": "#1", "amount": "$10"},
                {"id": "#2", "amount": 20},
                {"id": "#3"}
            ]
        });
        assert_eq!(
            render(config, data),
            "Orders\nOrder ID | Amount\n#1 | $10\n#2 | 20\npage 1 of 2"
        );
    }

    #[test]
    fn test_plain_array() {
        let out = render(
            WidgetConfig::default().with_title("Rows"),
            json!([{"a": 1, "b": "x"}, {"a": 2, "b": "y"}]),
        );
        assert_eq!(out, "Rows\na | b\n1 | x\n2 | y");
    }
}
