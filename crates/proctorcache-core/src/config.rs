//! Application configuration management.
//!
//! Holds the seed database location and the timing knobs of the cache and
//! polling layers. Stored at `~/.config/proctorcache/config.json`; every
//! field is optional in the file and falls back to its default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::DEFAULT_LATENCY_MS;
use crate::table::DEFAULT_PAGE_SIZE;

/// Application name used for config directory paths
const APP_NAME: &str = "proctorcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Overrides `data_path` when set
pub const DATA_ENV: &str = "PROCTORCACHE_DATA";

/// Seed database used when nothing else is configured
const DEFAULT_DATA_FILE: &str = "data/db.json";

/// Five minutes, same as the typed queries.
const DEFAULT_STALE_TIME_SECS: u64 = 300;

/// Submissions views refresh this often while open.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_path: PathBuf,
    pub page_size: usize,
    pub stale_time_secs: u64,
    pub poll_interval_secs: u64,
    /// Simulated data source latency
    pub latency_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_FILE),
            page_size: DEFAULT_PAGE_SIZE,
            stale_time_secs: DEFAULT_STALE_TIME_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            latency_ms: DEFAULT_LATENCY_MS,
        }
    }
}

impl Config {
    /// Load from the user config directory, then apply `PROCTORCACHE_DATA`.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(std::env::var(DATA_ENV).ok());
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    fn apply_overrides(&mut self, data_path: Option<String>) {
        if let Some(path) = data_path.filter(|p| !p.trim().is_empty()) {
            debug!(path = %path, "Data path overridden from environment");
            self.data_path = PathBuf::from(path);
        }
    }

    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        // A zero interval would spin the polling loop
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}
