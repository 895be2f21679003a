//! Dashboard-level errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    #[error("Unknown widget type: {0}")]
    UnknownWidgetType(String),

    #[error("No dashboard is currently selected")]
    NoCurrentDashboard,

    #[error("Widget id '{0}' already exists on this dashboard")]
    DuplicateWidgetId(String),

    /// Refused by the caller-level policy that keeps at least one dashboard
    #[error("Cannot delete the last remaining dashboard")]
    LastDashboard,

    #[error("Dashboard not found: {0}")]
    DashboardNotFound(String),
}
