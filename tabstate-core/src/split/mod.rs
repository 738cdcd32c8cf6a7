//! Split-view composition engine
//!
//! A split view is a tab whose content embeds up to two other tabs by value.
//! The engine builds containers out of open tabs and takes children back
//! out, using only repository operations.
//!
//! # Module Structure
//!
//! - `engine` - `SplitViewEngine` (create, convert, add, remove, ratio)
//! - `debounce` - `SplitRatioDebouncer`, one ratio write per drag burst
//!
//! # Example
//!
//! ```no_run
//! # async fn demo() -> tabstate_core::TabResult<()> {
//! use std::sync::Arc;
//! use tabstate_core::{MemoryStorage, SplitViewEngine, Tab, TabRepository};
//!
//! let repository = Arc::new(TabRepository::open(Arc::new(MemoryStorage::new())).await?);
//! let a = repository.add_tab(Tab::web("Docs", "https://docs.rs"), None).await?;
//! let b = repository.add_tab(Tab::web("Crates", "https://crates.io"), None).await?;
//!
//! let engine = SplitViewEngine::new(Arc::clone(&repository));
//! let split = engine.create_split_view_from_two_tabs(&a.id, &b.id).await?;
//! assert_eq!(split.map(|tab| tab.title), Some("Docs | Crates".to_string()));
//! # Ok(())
//! # }
//! ```

mod debounce;
mod engine;

pub use debounce::{PendingRatioWrite, RatioCommit, SplitRatioDebouncer};
pub use engine::SplitViewEngine;
