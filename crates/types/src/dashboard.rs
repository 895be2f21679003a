//! Dashboard document and the persisted dashboard collection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::layout::GridLayout;
use crate::widget::Widget;

/// One dashboard: metadata, grid settings and an ordered widget list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub widgets: Vec<Widget>,
    #[serde(default)]
    pub layout: GridLayout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Dashboard {
    /// Create an empty dashboard with a fresh id and the default grid
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description,
            widgets: Vec::new(),
            layout: GridLayout::default(),
            theme: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh `updated_at`; call after every mutation
    pub fn touch(&mut self) {
        let now = Utc::now();
        // Keep the timestamp strictly increasing even on coarse clocks
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + chrono::Duration::microseconds(1)
        };
    }

    pub fn widget(&self, id: &str) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.id == id)
    }

    pub fn widget_mut(&mut self, id: &str) -> Option<&mut Widget> {
        self.widgets.iter_mut().find(|w| w.id == id)
    }

    pub fn has_widget(&self, id: &str) -> bool {
        self.widget(id).is_some()
    }

    /// First grid row below every existing widget
    pub fn next_free_row(&self) -> u32 {
        self.widgets
            .iter()
            .map(|w| w.layout.bottom())
            .max()
            .unwrap_or(0)
    }
}

fn default_rotate_interval() -> u64 {
    30
}

fn default_pause_on_hover() -> bool {
    true
}

/// Automatic rotation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoRotateConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Seconds between rotations
    #[serde(default = "default_rotate_interval")]
    pub interval: u64,
    #[serde(default = "default_pause_on_hover")]
    pub pause_on_hover: bool,
}

impl Default for AutoRotateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: default_rotate_interval(),
            pause_on_hover: default_pause_on_hover(),
        }
    }
}

/// Persisted state: every dashboard, the current pointer and rotation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCollection {
    #[serde(default)]
    pub dashboards: Vec<Dashboard>,
    #[serde(default)]
    pub current_dashboard_id: Option<String>,
    #[serde(default)]
    pub auto_rotate: AutoRotateConfig,
}

impl DashboardCollection {
    pub fn current(&self) -> Option<&Dashboard> {
        let id = self.current_dashboard_id.as_deref()?;
        self.dashboards.iter().find(|d| d.id == id)
    }

    pub fn current_mut(&mut self) -> Option<&mut Dashboard> {
        let id = self.current_dashboard_id.clone()?;
        self.dashboards.iter_mut().find(|d| d.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.dashboards.iter().position(|d| d.id == id)
    }

    /// Repair a current pointer that does not resolve.
    ///
    /// An unset pointer stays unset; a dangling one moves to the first
    /// dashboard, or to `None` when there are none. Returns true if changed.
    pub fn repair_current(&mut self) -> bool {
        let dangling = match self.current_dashboard_id.as_deref() {
            Some(id) => self.position(id).is_none(),
            None => false,
        };
        if dangling {
            self.current_dashboard_id = self.dashboards.first().map(|d| d.id.clone());
        }
        dangling
    }
}
