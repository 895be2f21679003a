//! Dashboard store: the authoritative in-memory dashboard collection
//!
//! Every mutation is applied to the in-memory state, then written through the
//! configured [`StateStore`] and announced on a revision channel. Persistence
//! failures are logged and never undo the in-memory change.

use log::{debug, error, info};
use multidash_types::{
    AutoRotateConfig, Dashboard, DashboardCollection, GridLayout, LayoutConfig, Widget,
    WidgetUpdate,
};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

use super::error::DashboardError;
use super::persistence::StateStore;

/// Store handle shared by the CLI, bindings and the rotation controller
pub type SharedStore = Arc<RwLock<DashboardStore>>;

/// Partial update of the auto-rotation settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoRotateUpdate {
    pub enabled: Option<bool>,
    /// Seconds; values below 1 are raised to 1
    pub interval: Option<u64>,
    pub pause_on_hover: Option<bool>,
}

/// Partial update of dashboard metadata
#[derive(Debug, Clone, Default)]
pub struct DashboardUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub theme: Option<Option<String>>,
    pub layout: Option<GridLayout>,
    /// Replaces the whole widget list
    pub widgets: Option<Vec<Widget>>,
}

pub struct DashboardStore {
    state: DashboardCollection,
    backend: Box<dyn StateStore>,
    revision: watch::Sender<u64>,
}

impl DashboardStore {
    /// Load the persisted collection from `backend`
    pub fn new(backend: Box<dyn StateStore>) -> Self {
        let state = backend.load();
        info!(
            "Loaded {} dashboards (current: {:?})",
            state.dashboards.len(),
            state.current_dashboard_id
        );
        let (revision, _) = watch::channel(0);
        Self {
            state,
            backend,
            revision,
        }
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    pub fn state(&self) -> &DashboardCollection {
        &self.state
    }

    pub fn dashboards(&self) -> &[Dashboard] {
        &self.state.dashboards
    }

    pub fn dashboard(&self, id: &str) -> Option<&Dashboard> {
        self.state.dashboards.iter().find(|d| d.id == id)
    }

    pub fn current_dashboard_id(&self) -> Option<&str> {
        self.state.current_dashboard_id.as_deref()
    }

    pub fn current_dashboard(&self) -> Option<&Dashboard> {
        self.state.current()
    }

    pub fn auto_rotate(&self) -> AutoRotateConfig {
        self.state.auto_rotate
    }

    /// Receiver notified after every mutation
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Persist and announce the current state
    fn commit(&mut self) {
        if let Err(e) = self.backend.save(&self.state) {
            error!("Failed to persist dashboards: {:#}", e);
        }
        self.revision.send_modify(|r| *r += 1);
    }

    /// Create an empty dashboard and make it current
    pub fn create_dashboard(&mut self, name: &str, description: Option<String>) -> Dashboard {
        let dashboard = Dashboard::new(name, description);
        info!("Created dashboard '{}' ({})", dashboard.name, dashboard.id);
        self.state.current_dashboard_id = Some(dashboard.id.clone());
        self.state.dashboards.push(dashboard.clone());
        self.commit();
        dashboard
    }

    /// Remove a dashboard. Deleting the current one re-points to the first
    /// remaining dashboard (or none). Returns false for an unknown id.
    pub fn delete_dashboard(&mut self, id: &str) -> bool {
        let Some(pos) = self.state.position(id) else {
            debug!("delete_dashboard: unknown id {}", id);
            return false;
        };
        let removed = self.state.dashboards.remove(pos);
        if self.state.current_dashboard_id.as_deref() == Some(id) {
            self.state.current_dashboard_id = self.state.dashboards.first().map(|d| d.id.clone());
        }
        info!("Deleted dashboard '{}' ({})", removed.name, removed.id);
        self.commit();
        true
    }

    /// Make `id` current; unknown ids are ignored
    pub fn switch_dashboard(&mut self, id: &str) -> bool {
        if self.state.position(id).is_none() {
            debug!("switch_dashboard: unknown id {}", id);
            return false;
        }
        if self.state.current_dashboard_id.as_deref() != Some(id) {
            self.state.current_dashboard_id = Some(id.to_string());
            self.commit();
        }
        true
    }

    /// Advance cyclically; with nothing current, select the first
    pub fn next_dashboard(&mut self) {
        self.step(true);
    }

    /// Go back cyclically; with nothing current, select the last
    pub fn previous_dashboard(&mut self) {
        self.step(false);
    }

    fn step(&mut self, forward: bool) {
        let len = self.state.dashboards.len();
        if len == 0 {
            return;
        }
        let current = self
            .state
            .current_dashboard_id
            .as_deref()
            .and_then(|id| self.state.position(id));
        let target = match (current, forward) {
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
            (None, true) => 0,
            (None, false) => len - 1,
        };
        let id = self.state.dashboards[target].id.clone();
        if self.state.current_dashboard_id.as_deref() != Some(id.as_str()) {
            debug!("Rotating to dashboard {}", id);
            self.state.current_dashboard_id = Some(id);
            self.commit();
        }
    }

    /// Unset the current dashboard (back to the overview)
    pub fn clear_current(&mut self) {
        if self.state.current_dashboard_id.take().is_some() {
            self.commit();
        }
    }

    pub fn update_dashboard(
        &mut self,
        id: &str,
        update: DashboardUpdate,
    ) -> Result<(), DashboardError> {
        if let Some(widgets) = &update.widgets {
            let mut seen = std::collections::HashSet::new();
            if let Some(dup) = widgets.iter().find(|w| !seen.insert(w.id.as_str())) {
                return Err(DashboardError::DuplicateWidgetId(dup.id.clone()));
            }
        }
        let dashboard = self
            .state
            .dashboards
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| DashboardError::DashboardNotFound(id.to_string()))?;

        if let Some(name) = update.name {
            dashboard.name = name;
        }
        if let Some(description) = update.description {
            dashboard.description = description;
        }
        if let Some(theme) = update.theme {
            dashboard.theme = theme;
        }
        if let Some(layout) = update.layout {
            dashboard.layout = layout;
        }
        if let Some(widgets) = update.widgets {
            dashboard.widgets = widgets;
        }
        dashboard.touch();
        self.commit();
        Ok(())
    }

    /// Apply `f` to the current dashboard, then touch and commit.
    /// Returns None when nothing is current.
    fn with_current<R>(&mut self, f: impl FnOnce(&mut Dashboard) -> R) -> Option<R> {
        let dashboard = self.state.current_mut()?;
        let result = f(dashboard);
        dashboard.touch();
        self.commit();
        Some(result)
    }

    /// Append a widget to the current dashboard
    pub fn add_widget(&mut self, widget: Widget) -> Result<(), DashboardError> {
        let dashboard = self
            .state
            .current()
            .ok_or(DashboardError::NoCurrentDashboard)?;
        if dashboard.has_widget(&widget.id) {
            return Err(DashboardError::DuplicateWidgetId(widget.id));
        }
        debug!("Adding {} widget {}", widget.widget_type(), widget.id);
        self.with_current(|d| d.widgets.push(widget))
            .ok_or(DashboardError::NoCurrentDashboard)
    }

    /// Remove a widget from the current dashboard; false if not found
    pub fn remove_widget(&mut self, widget_id: &str) -> bool {
        let found = self
            .current_dashboard()
            .map(|d| d.has_widget(widget_id))
            .unwrap_or(false);
        if !found {
            return false;
        }
        self.with_current(|d| d.widgets.retain(|w| w.id != widget_id))
            .is_some()
    }

    /// Update config, data source or layout of a widget on the current dashboard
    pub fn update_widget(&mut self, widget_id: &str, update: WidgetUpdate) -> bool {
        let found = self
            .current_dashboard()
            .map(|d| d.has_widget(widget_id))
            .unwrap_or(false);
        if !found || update.is_empty() {
            return false;
        }
        self.with_current(|d| {
            if let Some(widget) = d.widget_mut(widget_id) {
                update.apply_to(widget);
            }
        })
        .is_some()
    }

    pub fn update_widget_layout(&mut self, widget_id: &str, layout: LayoutConfig) -> bool {
        self.update_widget(
            widget_id,
            WidgetUpdate {
                layout: Some(layout),
                ..Default::default()
            },
        )
    }

    pub fn set_auto_rotate(&mut self, update: AutoRotateUpdate) {
        let rotate = &mut self.state.auto_rotate;
        if let Some(enabled) = update.enabled {
            rotate.enabled = enabled;
        }
        if let Some(interval) = update.interval {
            rotate.interval = interval.max(1);
        }
        if let Some(pause) = update.pause_on_hover {
            rotate.pause_on_hover = pause;
        }
        self.commit();
    }

    pub fn start_auto_rotate(&mut self) {
        self.set_auto_rotate(AutoRotateUpdate {
            enabled: Some(true),
            ..Default::default()
        });
    }

    pub fn stop_auto_rotate(&mut self) {
        self.set_auto_rotate(AutoRotateUpdate {
            enabled: Some(false),
            ..Default::default()
        });
    }

    /// Insert the sample dashboard when the collection is empty.
    /// Returns true if it was added.
    pub fn seed_demo_if_empty(&mut self) -> bool {
        if !self.state.dashboards.is_empty() {
            return false;
        }
        let demo = crate::config::demo_dashboard();
        info!("Seeding demo dashboard '{}'", demo.name);
        self.state.current_dashboard_id = Some(demo.id.clone());
        self.state.dashboards.push(demo);
        self.commit();
        true
    }
}
