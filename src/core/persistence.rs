//! Durable storage of the dashboard collection

use anyhow::{Context, Result};
use log::{debug, info, warn};
use multidash_types::DashboardCollection;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Key under which the whole collection is stored
pub const STATE_KEY: &str = "multi-dashboard";

/// Backend that loads and saves the dashboard collection
///
/// `load` never fails: a missing or unreadable document yields the empty
/// default collection.
pub trait StateStore: Send + Sync {
    fn load(&self) -> DashboardCollection;
    fn save(&self, state: &DashboardCollection) -> Result<()>;
}

/// Parse a persisted document, falling back to defaults on malformed JSON.
/// A dangling current pointer is repaired.
pub fn parse_state(content: &str) -> DashboardCollection {
    let mut state = match serde_json::from_str::<DashboardCollection>(content) {
        Ok(state) => state,
        Err(e) => {
            warn!("Ignoring malformed dashboard state: {}", e);
            return DashboardCollection::default();
        }
    };
    if state.repair_current() {
        warn!(
            "Current dashboard did not resolve, reset to {:?}",
            state.current_dashboard_id
        );
    }
    state
}

/// Stores the collection as pretty JSON in `<dir>/multi-dashboard.json`
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store inside a directory using the standard file name
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(format!("{}.json", STATE_KEY)))
    }

    /// Store in the platform data directory
    pub fn default_location() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("io", "multidash", "multidash")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(Self::in_dir(dirs.data_dir()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> DashboardCollection {
        if !self.path.exists() {
            info!("No saved dashboards at {}, starting empty", self.path.display());
            return DashboardCollection::default();
        }
        match std::fs::read_to_string(&self.path) {
            Ok(content) => parse_state(&content),
            Err(e) => {
                warn!("Failed to read {}: {}", self.path.display(), e);
                DashboardCollection::default()
            }
        }
    }

    fn save(&self, state: &DashboardCollection) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        debug!("Saved {} dashboards to {}", state.dashboards.len(), self.path.display());
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<Option<DashboardCollection>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: DashboardCollection) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Last saved collection, if any
    pub fn saved(&self) -> Option<DashboardCollection> {
        self.state.lock().ok().and_then(|s| s.clone())
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> DashboardCollection {
        let mut state = self.saved().unwrap_or_default();
        state.repair_current();
        state
    }

    fn save(&self, state: &DashboardCollection) -> Result<()> {
        let mut slot = self
            .state
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {}", e))?;
        *slot = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl<T: StateStore + ?Sized> StateStore for std::sync::Arc<T> {
    fn load(&self) -> DashboardCollection {
        (**self).load()
    }

    fn save(&self, state: &DashboardCollection) -> Result<()> {
        (**self).save(state)
    }
}
