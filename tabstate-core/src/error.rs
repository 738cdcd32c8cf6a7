//! Error types for the tab engine
//!
//! Each concern gets its own `thiserror` enum. [`TabError`] is what the
//! repository, split-view engine and client store hand back to callers.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::TabId;

/// Errors returned by tab operations.
#[derive(Debug, Error)]
pub enum TabError {
    /// The referenced tab is not in the expected state (not open, not closed).
    ///
    /// The repository logs and swallows this variant; it only surfaces from
    /// lower-level helpers.
    #[error("tab not found: {0}")]
    NotFound(TabId),

    /// Malformed input that bypassed clamping.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The storage engine failed. Always fatal for the operation.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The agent collaborator could not create an agent for a chat tab.
    #[error("agent creation failed for definition '{agent_def_id}': {reason}")]
    Agent {
        /// Agent definition the chat tab was requested for
        agent_def_id: String,
        /// Collaborator error message
        reason: String,
    },
}

impl TabError {
    /// Returns true if this error only means "nothing to do".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Input validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Split ratio outside the allowed percentage range.
    #[error("split ratio {0} is outside 20..=80")]
    SplitRatioOutOfRange(i64),

    /// A split view was given more than two child tabs.
    #[error("a split view holds at most 2 tabs, got {0}")]
    TooManyChildTabs(usize),

    /// A split view was placed inside another split view.
    #[error("split views cannot be nested")]
    NestedSplitView,

    /// The tab would be open and embedded in a split view at the same time.
    #[error("tab {0} cannot be both open and embedded in a split view")]
    EmbeddedTabConflict(TabId),
}

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// SQLite backend error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored row could not be interpreted.
    #[error("corrupt record '{id}': {reason}")]
    Corrupt {
        /// Row identifier
        id: String,
        /// What was wrong with it
        reason: String,
    },

    /// Generic backend failure (I/O, injected faults, worker panics).
    #[error("storage backend failure: {0}")]
    Backend(String),

    /// Schema written by a newer version of the engine.
    #[error("unsupported schema version {found}, max supported {supported}")]
    UnsupportedSchemaVersion {
        /// Version found in the database
        found: i64,
        /// Highest version this build understands
        supported: i64,
    },
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or write the configuration file.
    #[error("failed to access config file '{path}': {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for the settings schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Settings could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is outside its allowed range.
    #[error("invalid config value: {0}")]
    Invalid(String),

    /// No platform directory is available for the default location.
    #[error("could not determine the platform {0} directory")]
    NoPlatformDir(&'static str),
}

/// Result type for tab operations
pub type TabResult<T> = Result<T, TabError>;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
