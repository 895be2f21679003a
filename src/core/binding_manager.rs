//! Binding manager - one data binding per widget of the current dashboard
//!
//! Reconciles the set of live bindings with the store: new widgets get a
//! started binding, changed sources are rebound, removed widgets lose theirs,
//! and switching dashboards tears everything down.

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use multidash_core::{AdapterProvider, WidgetRegistry};
use std::collections::HashMap;
use std::sync::Arc;

use super::binding::{BindingOptions, BindingState, DataBinding};
use super::store::SharedStore;

pub struct BindingManager {
    store: SharedStore,
    provider: Arc<dyn AdapterProvider>,
    options: BindingOptions,
    /// Dashboard the bindings belong to
    dashboard_id: Option<String>,
    bindings: HashMap<String, DataBinding>,
}

impl BindingManager {
    pub fn new(
        store: SharedStore,
        provider: Arc<dyn AdapterProvider>,
        options: BindingOptions,
    ) -> Self {
        Self {
            store,
            provider,
            options,
            dashboard_id: None,
            bindings: HashMap::new(),
        }
    }

    /// Bring bindings in line with the current dashboard
    pub fn sync(&mut self) -> Result<()> {
        let (dashboard_id, widgets) = {
            let store = self.store.read().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
            match store.current_dashboard() {
                Some(d) => (Some(d.id.clone()), d.widgets.clone()),
                None => (None, Vec::new()),
            }
        };

        if dashboard_id != self.dashboard_id {
            if !self.bindings.is_empty() {
                info!(
                    "Dashboard changed to {:?}, stopping {} bindings",
                    dashboard_id,
                    self.bindings.len()
                );
            }
            self.stop_all();
            self.dashboard_id = dashboard_id;
        }

        self.bindings
            .retain(|id, _| widgets.iter().any(|w| &w.id == id));

        for widget in &widgets {
            let binding = self.bindings.entry(widget.id.clone()).or_insert_with(|| {
                debug!("Creating binding for widget {}", widget.id);
                DataBinding::new(self.provider.clone(), self.options)
            });
            binding.bind(widget.data_source.clone());
            binding.start();
        }
        Ok(())
    }

    /// Stop and drop every binding
    pub fn stop_all(&mut self) {
        for (_, binding) in self.bindings.drain() {
            binding.stop();
        }
    }

    pub fn binding(&self, widget_id: &str) -> Option<&DataBinding> {
        self.bindings.get(widget_id)
    }

    pub fn state(&self, widget_id: &str) -> Option<BindingState> {
        self.bindings.get(widget_id).map(DataBinding::state)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Render every widget of the current dashboard in order.
    ///
    /// Widgets without a registered renderer are reported, not skipped.
    pub fn render_current(&self, registry: &WidgetRegistry) -> Result<Vec<(String, String)>> {
        let store = self.store.read().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let Some(dashboard) = store.current_dashboard() else {
            return Ok(Vec::new());
        };

        let mut rendered = Vec::with_capacity(dashboard.widgets.len());
        for widget in &dashboard.widgets {
            let state = self.state(&widget.id).unwrap_or_default();
            let output = match registry.renderer(widget.widget_type().as_str()) {
                Some(renderer) => match renderer.render(widget, &state.render_input()) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Renderer {} failed for {}: {}", renderer.id(), widget.id, e);
                        format!("[render error: {}]", e)
                    }
                },
                None => format!("Unknown widget type: {}", widget.widget_type()),
            };
            rendered.push((widget.id.clone(), output));
        }
        Ok(rendered)
    }
}

impl Drop for BindingManager {
    fn drop(&mut self) {
        self.stop_all();
    }
}
