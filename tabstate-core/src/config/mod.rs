//! Configuration management
//!
//! `EngineSettings` is stored as TOML; `ConfigManager` handles the file.

mod manager;
pub mod settings;

pub use manager::{CONFIG_FILE_NAME, ConfigManager};
pub use settings::{
    APP_DIR_NAME, DEFAULT_DB_FILE, EngineSettings, HistorySettings, LoggingSettings,
    SplitViewSettings, StorageBackend, StorageSettings,
};
