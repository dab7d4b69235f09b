//! Application configuration loaded from `config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::models::grid_config::TimeGridConfig;
use crate::services::sweeper::DEFAULT_SWEEP_INTERVAL_SECS;

const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "schedule.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file; defaults to the platform data directory
    pub database_path: Option<PathBuf>,
    /// Scopes change notifications to one clinic
    pub facility_id: String,
    pub sweep_interval_secs: u64,
    pub grid: TimeGridConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            facility_id: "default".to_string(),
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            grid: TimeGridConfig::default(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "clinic-scheduler")
}

impl AppConfig {
    /// Platform config file location, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: AppConfig = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config
            .validate()
            .map_err(|e| anyhow!("Invalid config {}: {}", path.display(), e))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => {
                log::warn!("Unable to resolve config directory; using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let text = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, text).with_context(|| format!("Failed to write config {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.facility_id.trim().is_empty() {
            return Err("Facility id cannot be empty".to_string());
        }
        if self.sweep_interval_secs == 0 {
            return Err("Sweep interval must be at least one second".to_string());
        }
        self.grid.validate()
    }

    pub fn sweep_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.sweep_interval_secs)
    }

    /// The configured database file, or one in the platform data directory.
    pub fn resolve_database_path(&self) -> PathBuf {
        if let Some(path) = &self.database_path {
            return path.clone();
        }

        match project_dirs() {
            Some(dirs) => dirs.data_dir().join(DATABASE_FILE),
            None => {
                log::warn!("Unable to resolve data directory; using current dir for database");
                PathBuf::from(DATABASE_FILE)
            }
        }
    }
}
