//! Configuration file manager

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

use super::settings::{APP_DIR_NAME, EngineSettings};

/// Name of the settings file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Loads and saves [`EngineSettings`] as TOML.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a manager for the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform has no config directory.
    pub fn new() -> ConfigResult<Self> {
        let base = dirs::config_dir().ok_or(ConfigError::NoPlatformDir("config"))?;
        Ok(Self::with_config_dir(base.join(APP_DIR_NAME)))
    }

    /// Creates a manager for a custom directory.
    #[must_use]
    pub const fn with_config_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Directory holding the settings file.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Full path of the settings file.
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Loads and validates the settings, or returns defaults if the file is absent.
    pub fn load_settings(&self) -> ConfigResult<EngineSettings> {
        let path = self.settings_path();
        let _span = crate::trace_operation_debug!(
            crate::tracing::span_names::CONFIG_LOAD,
            path = %path.display()
        )
        .entered();

        if !path.exists() {
            tracing::debug!("No settings file, using defaults");
            return Ok(EngineSettings::default());
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let settings: EngineSettings = toml::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates and writes the settings, creating the directory if needed.
    pub fn save_settings(&self, settings: &EngineSettings) -> ConfigResult<()> {
        settings.validate()?;
        let path = self.settings_path();
        let _span = crate::trace_operation_debug!(
            crate::tracing::span_names::CONFIG_SAVE,
            path = %path.display()
        )
        .entered();

        fs::create_dir_all(&self.config_dir).map_err(|source| ConfigError::Io {
            path: self.config_dir.clone(),
            source,
        })?;
        let contents = toml::to_string_pretty(settings)?;
        fs::write(&path, contents).map_err(|source| ConfigError::Io { path, source })?;
        Ok(())
    }
}
