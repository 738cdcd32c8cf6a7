//! Engine settings
//!
//! Every section has serde defaults so a partial (or empty) file loads.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::models::{DEFAULT_SPLIT_RATIO, MAX_SPLIT_RATIO, MIN_SPLIT_RATIO};
use crate::repository::MAX_CLOSED_TABS;
use crate::tracing::TracingLevel;

/// Directory name used under the platform config and data directories.
pub const APP_DIR_NAME: &str = "tabstate";

/// Default database file name for the SQLite backend.
pub const DEFAULT_DB_FILE: &str = "tabs.db";

/// Top-level engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Storage backend selection
    pub storage: StorageSettings,
    /// Closed-tab history
    pub history: HistorySettings,
    /// Split-view behaviour
    pub split_view: SplitViewSettings,
    /// Logging
    pub logging: LoggingSettings,
}

impl EngineSettings {
    /// Checks every value against its allowed range.
    pub fn validate(&self) -> ConfigResult<()> {
        self.history.validate()?;
        self.split_view.validate()?;
        if let Some(path) = &self.storage.path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("storage.path must not be empty".into()));
            }
        }
        Ok(())
    }
}

/// Storage engine kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory; nothing survives a restart
    #[default]
    Memory,
    /// SQLite database file
    Sqlite,
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Backend to open
    pub backend: StorageBackend,
    /// Database file for the SQLite backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StorageSettings {
    /// Returns the configured database path, or the platform default.
    pub fn resolved_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR_NAME).join(DEFAULT_DB_FILE))
            .ok_or(ConfigError::NoPlatformDir("data"))
    }
}

/// `[history]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Soft-closed tabs kept for restore
    pub max_closed_tabs: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_closed_tabs: MAX_CLOSED_TABS,
        }
    }
}

impl HistorySettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_closed_tabs == 0 {
            return Err(ConfigError::Invalid(
                "history.max_closed_tabs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// `[split_view]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitViewSettings {
    /// Quiet window before a ratio change is persisted
    pub debounce_ms: u64,
    /// Longest a pending ratio may wait while changes keep arriving
    pub max_wait_ms: u64,
    /// Ratio given to new split views
    pub default_ratio: i64,
}

impl Default for SplitViewSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            max_wait_ms: 1000,
            default_ratio: i64::from(DEFAULT_SPLIT_RATIO),
        }
    }
}

impl SplitViewSettings {
    /// Quiet window as a `Duration`.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Hard cap as a `Duration`.
    #[must_use]
    pub const fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::Invalid(
                "split_view.debounce_ms must be positive".into(),
            ));
        }
        if self.max_wait_ms < self.debounce_ms {
            return Err(ConfigError::Invalid(format!(
                "split_view.max_wait_ms ({}) is shorter than debounce_ms ({})",
                self.max_wait_ms, self.debounce_ms
            )));
        }
        let range = i64::from(MIN_SPLIT_RATIO)..=i64::from(MAX_SPLIT_RATIO);
        if !range.contains(&self.default_ratio) {
            return Err(ConfigError::Invalid(format!(
                "split_view.default_ratio {} is outside 20..=80",
                self.default_ratio
            )));
        }
        Ok(())
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Minimum level for this crate's events
    pub level: TracingLevel,
    /// Full `EnvFilter` directive, overrides `level`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Write logs to this file instead of stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}
