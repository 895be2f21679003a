//! Application session: the store, registry and factory wired together,
//! plus the caller-level operations the CLI exposes

use anyhow::{anyhow, Result};
use log::info;
use multidash_core::WidgetRegistry;
use multidash_sources::DataSourceFactory;
use multidash_types::{AutoRotateConfig, Dashboard, Widget};
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::config::AppConfig;
use crate::core::{
    create_widget, AutoRotateController, AutoRotateUpdate, BindingManager, DashboardError,
    DashboardStore, JsonFileStore, SharedStore, StateStore,
};
use crate::widgets;

pub struct Session {
    config: AppConfig,
    store: SharedStore,
    registry: Arc<WidgetRegistry>,
    factory: Arc<DataSourceFactory>,
}

impl Session {
    /// Open the session backed by the JSON state file.
    ///
    /// The file is `state_file` if given, else the config's override, else
    /// the platform data directory.
    pub fn open(config: AppConfig, state_file: Option<PathBuf>) -> Result<Self> {
        let backend = match state_file.or_else(|| config.state_file.clone()) {
            Some(path) => JsonFileStore::new(path),
            None => JsonFileStore::default_location()?,
        };
        info!("Dashboard state: {}", backend.path().display());
        Self::with_backend(config, Box::new(backend))
    }

    pub fn with_backend(config: AppConfig, backend: Box<dyn StateStore>) -> Result<Self> {
        let mut registry = WidgetRegistry::new();
        widgets::register_all(&mut registry);
        let factory = DataSourceFactory::new(config.factory_settings())?;

        let mut store = DashboardStore::new(backend);
        if config.seed_demo {
            store.seed_demo_if_empty();
        }

        Ok(Self {
            config,
            store: store.into_shared(),
            registry: Arc::new(registry),
            factory: Arc::new(factory),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn registry(&self) -> &Arc<WidgetRegistry> {
        &self.registry
    }

    pub fn factory(&self) -> &Arc<DataSourceFactory> {
        &self.factory
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, DashboardStore>> {
        self.store.read().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, DashboardStore>> {
        self.store.write().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// One line per dashboard; the current one is marked with `*`
    pub fn list_dashboards(&self) -> Result<Vec<String>> {
        let store = self.read()?;
        let current = store.current_dashboard_id();
        Ok(store
            .dashboards()
            .iter()
            .map(|d| {
                let marker = if Some(d.id.as_str()) == current { "*" } else { " " };
                format!("{} {}  {}  ({} widgets)", marker, d.id, d.name, d.widgets.len())
            })
            .collect())
    }

    pub fn create_dashboard(&self, name: &str, description: Option<String>) -> Result<Dashboard> {
        Ok(self.write()?.create_dashboard(name, description))
    }

    /// Delete a dashboard, refusing to remove the last one
    pub fn delete_dashboard(&self, id: &str) -> Result<()> {
        let mut store = self.write()?;
        if store.dashboard(id).is_none() {
            return Err(DashboardError::DashboardNotFound(id.to_string()).into());
        }
        if store.dashboards().len() <= 1 {
            return Err(DashboardError::LastDashboard.into());
        }
        store.delete_dashboard(id);
        Ok(())
    }

    pub fn switch_dashboard(&self, id: &str) -> Result<()> {
        if !self.write()?.switch_dashboard(id) {
            return Err(DashboardError::DashboardNotFound(id.to_string()).into());
        }
        Ok(())
    }

    /// Advance (or go back) and return the new current dashboard id
    pub fn rotate(&self, forward: bool) -> Result<Option<String>> {
        let mut store = self.write()?;
        if forward {
            store.next_dashboard();
        } else {
            store.previous_dashboard();
        }
        Ok(store.current_dashboard_id().map(str::to_string))
    }

    pub fn add_widget(&self, widget_type: &str) -> Result<Widget> {
        let mut store = self.write()?;
        Ok(create_widget(&mut store, &self.registry, widget_type)?)
    }

    pub fn remove_widget(&self, widget_id: &str) -> Result<bool> {
        Ok(self.write()?.remove_widget(widget_id))
    }

    pub fn set_auto_rotate(&self, update: AutoRotateUpdate) -> Result<AutoRotateConfig> {
        let mut store = self.write()?;
        store.set_auto_rotate(update);
        Ok(store.auto_rotate())
    }

    /// `type  name  [icon]  description` for every registered widget type
    pub fn widget_types(&self) -> Vec<String> {
        self.registry
            .get_all()
            .into_iter()
            .map(|d| format!("{:<15} {:<18} [{}]  {}", d.widget_type.as_str(), d.name, d.icon, d.description))
            .collect()
    }

    pub fn source_types(&self) -> Vec<String> {
        DataSourceFactory::available_types()
            .into_iter()
            .map(|t| {
                let backend = if t.requires_backend { " (requires backend)" } else { "" };
                format!("{:<11} {:<12} {}{}", t.source_type.as_str(), t.name, t.description, backend)
            })
            .collect()
    }

    /// Fetch once from an untyped data source config
    pub async fn fetch(&self, config: &Value) -> Result<Value> {
        let adapter = self.factory.create_adapter_from_value(config, None)?;
        let result = adapter.fetch().await;
        adapter.cleanup();
        Ok(result?)
    }

    /// Bind every widget of the current dashboard, rotate dashboards and log
    /// the rendered widgets every `render_every`, until `shutdown` completes
    pub async fn run<F>(&self, render_every: Duration, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut revisions = self.read()?.subscribe();
        let mut bindings = BindingManager::new(
            self.store.clone(),
            self.factory.clone(),
            self.config.binding.into(),
        );
        bindings.sync()?;
        let rotation = AutoRotateController::spawn(self.store.clone())?;

        let mut ticker = tokio::time::interval(render_every);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                changed = revisions.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    bindings.sync()?;
                }
                _ = ticker.tick() => {
                    for (id, line) in bindings.render_current(&self.registry)? {
                        info!("[{}] {}", id, line);
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutting down");
                    break;
                }
            }
        }

        bindings.stop_all();
        rotation.shutdown().await;
        Ok(())
    }
}
