//! Application configuration

use anyhow::{Context, Result};
use multidash_sources::{FactorySettings, DEFAULT_BACKEND_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::BindingOptions;

/// Application-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Version of the config format
    pub version: u32,
    /// Base URL of the backend proxy (SQL, MQTT bridge, relative REST URLs)
    pub backend_url: String,
    pub http_timeout_ms: u64,
    /// Overrides the default location of the dashboard state file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
    pub binding: BindingConfig,
    /// Create the sample dashboard on first launch
    pub seed_demo: bool,
}

impl AppConfig {
    /// Load configuration from disk, defaulting when no file exists
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_path()?)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("io", "multidash", "multidash")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.json"))
    }

    /// Load configuration from a specific file path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to a specific file path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn factory_settings(&self) -> FactorySettings {
        FactorySettings {
            backend_url: self.backend_url.clone(),
            http_timeout: Duration::from_millis(self.http_timeout_ms),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            http_timeout_ms: 30_000,
            state_file: None,
            binding: BindingConfig::default(),
            seed_demo: true,
        }
    }
}

/// Data binding tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    pub stale_time_ms: u64,
    pub retry: u32,
    pub retry_delay_ms: u64,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            stale_time_ms: 30_000,
            retry: 2,
            retry_delay_ms: 1_000,
        }
    }
}

impl From<BindingConfig> for BindingOptions {
    fn from(config: BindingConfig) -> Self {
        BindingOptions {
            stale_time: Duration::from_millis(config.stale_time_ms),
            retry: config.retry,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}
