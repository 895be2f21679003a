//! Creates widgets from registry defaults and places them on the current dashboard

use log::info;
use multidash_core::WidgetRegistry;
use multidash_types::{Widget, WidgetConfig};

use super::error::DashboardError;
use super::store::DashboardStore;

/// Create a widget of `widget_type` below everything on the current dashboard.
///
/// The widget starts at `x = 0`, `y` = the first free row, with the type's
/// default footprint and config and a fresh id.
pub fn create_widget(
    store: &mut DashboardStore,
    registry: &WidgetRegistry,
    widget_type: &str,
) -> Result<Widget, DashboardError> {
    let definition = registry
        .get(widget_type)
        .ok_or_else(|| DashboardError::UnknownWidgetType(widget_type.to_string()))?;
    let dashboard = store
        .current_dashboard()
        .ok_or(DashboardError::NoCurrentDashboard)?;

    let layout = definition.default_layout.at(0, dashboard.next_free_row());
    let config = WidgetConfig::from_value(&definition.default_config);
    let widget = Widget::new(
        uuid::Uuid::new_v4().to_string(),
        definition.widget_type.clone(),
        config,
        layout,
    );

    store.add_widget(widget.clone())?;
    info!(
        "Created {} widget {} at row {}",
        widget_type, widget.id, widget.layout.y
    );
    Ok(widget)
}
