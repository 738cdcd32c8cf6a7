//! Tab state and persistence engine
//!
//! Models, persists and synchronizes the open tabs of a tabbed desktop
//! surface: web pages, agent chats, agent builders, wiki embeds and split
//! views that show two tabs side by side.
//!
//! # Crate Structure
//!
//! - [`models`] - `Tab`, its variants, patches and the persisted record
//! - [`storage`] - `TabStorage` trait with memory and SQLite backends
//! - [`repository`] - `TabRepository`, the single writer of the tab table
//! - [`split`] - split-view composition and debounced ratio writes
//! - [`sync`] - `TabStore`, a subscriber view with optimistic split ratios
//! - [`collab`] - agent and embedded-view collaborators
//! - [`config`] - TOML settings and their file manager
//! - [`tracing`] - subscriber setup and span conventions
//!
//! # Example
//!
//! ```no_run
//! # async fn demo() -> tabstate_core::TabResult<()> {
//! use std::sync::Arc;
//! use tabstate_core::{MemoryStorage, SplitViewEngine, Tab, TabRepository, TabStore};
//!
//! let repository = Arc::new(TabRepository::open(Arc::new(MemoryStorage::new())).await?);
//! let store = TabStore::attach(Arc::new(SplitViewEngine::new(repository)));
//!
//! let docs = store.add_tab(Tab::web("Docs", "https://docs.rs"), None).await?;
//! store.set_active_tab(&docs.id).await?;
//! assert_eq!(store.active_tab_id(), Some(docs.id));
//! # Ok(())
//! # }
//! ```

// Enable missing_docs warning for public API documentation
#![warn(missing_docs)]

pub mod collab;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod split;
pub mod storage;
pub mod sync;
pub mod tracing;

pub use collab::{
    AgentError, AgentInstance, AgentProvider, ChatTabLauncher, should_clear_embed_bounds,
};
pub use config::{ConfigManager, EngineSettings};
pub use error::{
    ConfigError, ConfigResult, StorageError, StorageResult, TabError, TabResult, ValidationError,
};
pub use models::{
    SplitRatio, SplitViewContent, Tab, TabId, TabKind, TabPatch, TabRecord, TabState, TabType,
};
pub use repository::{CloseDirection, CloseOutcome, MAX_CLOSED_TABS, TabRepository, TabSnapshot};
pub use split::{RatioCommit, SplitViewEngine};
pub use storage::{MemoryStorage, RecordQuery, SqliteStorage, TabStorage, open_storage};
pub use sync::{ClientState, TabStore};
pub use tracing::{TracingConfig, TracingError, TracingLevel, TracingOutput, init_tracing};
