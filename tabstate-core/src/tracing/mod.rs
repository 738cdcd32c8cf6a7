//! Structured logging
//!
//! Subscriber setup for hosts that embed the engine, plus the span names
//! the repository, storage layer and configuration use. Split-view and chat
//! operations name their spans in `#[tracing::instrument]` attributes.

use std::path::PathBuf;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingSettings;

static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

static TRACING_CONFIG: OnceLock<TracingConfig> = OnceLock::new();

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// The subscriber could not be installed
    #[error("Failed to initialize tracing: {0}")]
    InitializationFailed(String),

    /// The filter directive did not parse
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter {
        /// Directive as given
        filter: String,
        /// Parser message
        reason: String,
    },

    /// Tracing already initialized
    #[error("Tracing has already been initialized")]
    AlreadyInitialized,

    /// Failed to create log file
    #[error("Failed to create log file: {0}")]
    FileCreationFailed(String),
}

/// Result type for tracing operations
pub type TracingResult<T> = Result<T, TracingError>;

/// Log level for the engine's own events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracingLevel {
    /// Errors only
    Error,
    /// Errors and warnings, including swallowed not-found cases
    Warn,
    /// Lifecycle events (default)
    #[default]
    Info,
    /// Per-operation details
    Debug,
    /// Everything, including individual storage writes
    Trace,
}

impl TracingLevel {
    /// Converts to the `tracing` crate's level.
    #[must_use]
    pub const fn to_tracing_level(self) -> Level {
        match self {
            Self::Error => Level::ERROR,
            Self::Warn => Level::WARN,
            Self::Info => Level::INFO,
            Self::Debug => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl std::str::FromStr for TracingLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for TracingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TracingOutput {
    /// Standard output
    Stdout,
    /// Standard error
    #[default]
    Stderr,
    /// Plain-text file, truncated on start
    File(PathBuf),
}

/// Configuration for [`init_tracing`].
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Level for `tabstate_core` targets
    pub level: TracingLevel,
    /// Output destination
    pub output: TracingOutput,
    /// Custom filter string (overrides level if set)
    pub filter: Option<String>,
}

impl TracingConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from the `[logging]` settings section.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level,
            output: settings
                .log_file
                .clone()
                .map_or(TracingOutput::Stderr, TracingOutput::File),
            filter: settings.filter.clone(),
        }
    }

    /// Sets the log level
    #[must_use]
    pub const fn with_level(mut self, level: TracingLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the output destination
    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    /// Sets a custom filter string
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Returns the effective `EnvFilter` directive.
    #[must_use]
    pub fn directive(&self) -> String {
        self.filter
            .clone()
            .unwrap_or_else(|| format!("tabstate_core={}", self.level))
    }
}

/// Installs the global subscriber.
///
/// Call once at startup; later calls fail with
/// [`TracingError::AlreadyInitialized`].
///
/// # Errors
///
/// Returns an error if the filter is invalid, the log file cannot be
/// created, or another subscriber is already installed.
pub fn init_tracing(config: &TracingConfig) -> TracingResult<()> {
    if TRACING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(TracingError::AlreadyInitialized);
    }

    let result = install(config);
    if result.is_err() {
        TRACING_INITIALIZED.store(false, Ordering::SeqCst);
        return result;
    }
    let _ = TRACING_CONFIG.set(config.clone());

    tracing::info!(
        level = %config.level,
        filter = %config.directive(),
        "Tracing initialized"
    );
    Ok(())
}

fn install(config: &TracingConfig) -> TracingResult<()> {
    let directive = config.directive();
    let filter = EnvFilter::try_new(&directive).map_err(|e| TracingError::InvalidFilter {
        filter: directive.clone(),
        reason: e.to_string(),
    })?;

    let (writer, ansi) = match &config.output {
        TracingOutput::Stdout => (BoxMakeWriter::new(std::io::stdout), true),
        TracingOutput::Stderr => (BoxMakeWriter::new(std::io::stderr), true),
        TracingOutput::File(path) => {
            let file = std::fs::File::create(path).map_err(|e| {
                TracingError::FileCreationFailed(format!("{}: {e}", path.display()))
            })?;
            (BoxMakeWriter::new(std::sync::Mutex::new(file)), false)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(ansi)
                .with_writer(writer),
        )
        .try_init()
        .map_err(|e| TracingError::InitializationFailed(e.to_string()))
}

/// Checks if tracing has been initialized
#[must_use]
pub fn is_tracing_initialized() -> bool {
    TRACING_INITIALIZED.load(Ordering::SeqCst)
}

/// Gets the configuration passed to a successful [`init_tracing`]
#[must_use]
pub fn get_tracing_config() -> Option<&'static TracingConfig> {
    TRACING_CONFIG.get()
}

/// Creates an info-level span with the engine's field conventions.
///
/// ```ignore
/// let _span = trace_operation!(span_names::TAB_CLOSE, tab_id = %id).entered();
/// ```
#[macro_export]
macro_rules! trace_operation {
    ($name:expr) => {
        tracing::info_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

/// Debug-level variant of `trace_operation!` for reads and bookkeeping.
#[macro_export]
macro_rules! trace_operation_debug {
    ($name:expr) => {
        tracing::debug_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::debug_span!($name, $($field)*)
    };
}

/// Standard span names
pub mod span_names {
    /// Repository startup and repair
    pub const REPOSITORY_OPEN: &str = "repository.open";
    /// Tab insertion
    pub const TAB_ADD: &str = "tab.add";
    /// Tab patch
    pub const TAB_UPDATE: &str = "tab.update";
    /// Activation change
    pub const TAB_ACTIVATE: &str = "tab.activate";
    /// Single close
    pub const TAB_CLOSE: &str = "tab.close";
    /// Batch close
    pub const TAB_CLOSE_MANY: &str = "tab.close_many";
    /// Pin toggle
    pub const TAB_PIN: &str = "tab.pin";
    /// History restore
    pub const TAB_RESTORE: &str = "tab.restore";
    /// Changeset application
    pub const STORAGE_APPLY: &str = "storage.apply";
    /// Compensation after a failed changeset
    pub const STORAGE_ROLLBACK: &str = "storage.rollback";
    /// Configuration load
    pub const CONFIG_LOAD: &str = "config.load";
    /// Configuration save
    pub const CONFIG_SAVE: &str = "config.save";
}
