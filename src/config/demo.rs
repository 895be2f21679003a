//! Sample "Sales Dashboard" seeded on first launch

use chrono::Utc;
use multidash_types::{
    Breakpoints, CompactType, Dashboard, DataSourceConfig, DefaultLayout, GridLayout,
    StaticSourceConfig, Widget, WidgetConfig,
};
use serde_json::{json, Value};

pub const DEMO_DASHBOARD_ID: &str = "demo-dashboard";

fn widget(
    id: &str,
    widget_type: &str,
    config: WidgetConfig,
    data: Value,
    footprint: DefaultLayout,
    x: u32,
    y: u32,
) -> Widget {
    Widget::new(id, widget_type, config, footprint.at(x, y))
        .with_data_source(DataSourceConfig::Static(StaticSourceConfig::new(data)))
}

fn kpi(title: &str, description: &str, format: &str, decimals: u32, show_trend: bool) -> WidgetConfig {
    let mut config = WidgetConfig::default()
        .with_title(title)
        .with("format", json!(format))
        .with("decimals", json!(decimals))
        .with("showTrend", json!(show_trend))
        .with("size", json!("md"));
    config.description = Some(description.to_string());
    config
}

fn described(title: &str, description: &str) -> WidgetConfig {
    let mut config = WidgetConfig::default().with_title(title);
    config.description = Some(description.to_string());
    config
}

fn order(id: &str, customer: &str, product: &str, amount: &str, status: &str) -> Value {
    json!({"id": id, "customer": customer, "product": product, "amount": amount, "status": status})
}

/// The demo dashboard with static data for every widget
pub fn demo_dashboard() -> Dashboard {
    let kpi_size = DefaultLayout::new(3, 3).with_min(2, 2);
    let chart_size = DefaultLayout::new(6, 5).with_min(4, 4);

    let widgets = vec![
        widget(
            "revenue-widget",
            "number",
            kpi("Total Revenue", "Monthly revenue", "currency", 0, true).with("prefix", json!("$")),
            json!({"value": 125430, "previousValue": 98750, "trend": "up"}),
            kpi_size,
            0,
            0,
        ),
        widget(
            "users-widget",
            "number",
            kpi("Active Users", "Current active users", "number", 0, true),
            json!({"value": 2543, "previousValue": 2890, "trend": "down"}),
            kpi_size,
            3,
            0,
        ),
        widget(
            "conversion-widget",
            "number",
            kpi("Conversion Rate", "Monthly conversion", "percentage", 1, true),
            json!({"value": 3.8, "previousValue": 3.2, "trend": "up"}),
            kpi_size,
            6,
            0,
        ),
        widget(
            "orders-widget",
            "number",
            kpi("Total Orders", "This month", "number", 0, false),
            json!({"value": 842}),
            kpi_size,
            9,
            0,
        ),
        widget(
            "revenue-chart",
            "chart",
            described("Revenue Trend", "Last 6 months")
                .with("chartType", json!("line"))
                .with("showLegend", json!(true))
                .with("showGrid", json!(true))
                .with("smooth", json!(true))
                .with("colors", json!(["#3b82f6", "#10b981"])),
            json!({
                "labels": ["Jan", "Feb", "Mar", "Apr", "May", "Jun"],
                "datasets": [
                    {"label": "Revenue", "data": [65000, 75000, 82000, 78000, 95000, 125430]},
                    {"label": "Target", "data": [70000, 72000, 75000, 80000, 90000, 100000]}
                ]
            }),
            chart_size,
            0,
            3,
        ),
        widget(
            "category-chart",
            "chart",
            described("Sales by Category", "Current month")
                .with("chartType", json!("pie"))
                .with("showLegend", json!(true))
                .with(
                    "colors",
                    json!(["#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6"]),
                ),
            json!({
                "labels": ["Electronics", "Clothing", "Food", "Books", "Other"],
                "datasets": [{"label": "Sales", "data": [35, 25, 20, 12, 8]}]
            }),
            chart_size,
            6,
            3,
        ),
        widget(
            "orders-table",
            "table",
            described("Recent Orders", "Latest customer orders")
                .with("pagination", json!(true))
                .with("pageSize", json!(5))
                .with("sortable", json!(true))
                .with("striped", json!(true)),
            json!({
                "columns": [
                    {"id": "id", "header": "Order ID", "accessor": "id"},
                    {"id": "customer", "header": "Customer", "accessor": "customer"},
                    {"id": "product", "header": "Product", "accessor": "product"},
                    {"id": "amount", "header": "Amount", "accessor": "amount"},
                    {"id": "status", "header": "Status", "accessor": "status"}
                ],
                "rows": [
                    order("#1234", "John Doe", "Laptop", "$1,299", "Completed"),
                    order("#1235", "Jane Smith", "Phone", "$899", "Processing"),
                    order("#1236", "Bob Johnson", "Tablet", "$499", "Completed"),
                    order("#1237", "Alice Brown", "Headphones", "$299", "Shipped"),
                    order("#1238", "Charlie Wilson", "Monitor", "$599", "Completed"),
                    order("#1239", "Diana Lee", "Keyboard", "$149", "Processing")
                ]
            }),
            DefaultLayout::new(12, 6).with_min(6, 5),
            0,
            8,
        ),
    ];

    let now = Utc::now();
    Dashboard {
        id: DEMO_DASHBOARD_ID.to_string(),
        name: "Sales Dashboard".to_string(),
        description: Some("Real-time sales metrics and analytics".to_string()),
        widgets,
        layout: GridLayout {
            cols: 12,
            row_height: 50,
            breakpoints: Some(Breakpoints {
                lg: Some(1200),
                md: Some(996),
                sm: Some(768),
                xs: Some(480),
            }),
            margin: Some([16, 16]),
            container_padding: Some([16, 16]),
            compact_type: Some(CompactType::Vertical),
        },
        theme: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_demo_is_consistent() {
        let demo = demo_dashboard();
        assert_eq!(demo.widgets.len(), 7);

        let ids: HashSet<_> = demo.widgets.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids.len(), demo.widgets.len());
        assert!(demo.widgets.iter().all(|w| w.data_source.is_some()));
        assert_eq!(demo.next_free_row(), 14);
        assert!(demo
            .widgets
            .iter()
            .all(|w| w.layout.x + w.layout.w <= demo.layout.cols));
    }

    #[test]
    fn test_demo_table_rows() {
        let demo = demo_dashboard();
        let table = demo.widget("orders-table").unwrap();
        let DataSourceConfig::Static(config) = &table.data_source.as_ref().unwrap().config else {
            panic!("orders table should use static data");
        };
        let rows = config.data.as_ref().unwrap()["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0]["customer"], "John Doe");
        assert_eq!(table.config.get("pageSize"), Some(&json!(5)));
    }
}
