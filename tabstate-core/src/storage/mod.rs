//! Storage engine boundary
//!
//! The repository only needs a simple entity table: query by the `opened`
//! flag with an optional ordering and limit, insert, update-by-id and
//! delete-by-id. There are no multi-row transactions; cross-row invariants
//! are enforced by the repository itself.
//!
//! Two backends ship with the crate:
//!
//! - [`MemoryStorage`] - in-process table with operation counters and fault
//!   injection, used by tests and by the `memory` backend setting
//! - [`SqliteStorage`] - `rusqlite` table with versioned migrations

mod memory;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{StorageBackend, StorageSettings};
use crate::error::StorageResult;
use crate::models::{TabId, TabRecord};

pub use memory::{MemoryStorage, StorageStats};
pub use sqlite::{SqliteStorage, TAB_SCHEMA_VERSION};

/// Row ordering for [`RecordQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordOrder {
    /// Backend order
    #[default]
    Unordered,
    /// `position` ascending, ties broken by id
    Position,
    /// `closed_at` descending (most recent first), ties broken by id
    ClosedAtDesc,
}

/// Filter, ordering and limit for a table scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordQuery {
    /// Only rows with this `opened` flag, or all rows
    pub opened: Option<bool>,
    /// Result ordering
    pub order: RecordOrder,
    /// Maximum number of rows
    pub limit: Option<usize>,
}

impl RecordQuery {
    /// Every row in backend order.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            opened: None,
            order: RecordOrder::Unordered,
            limit: None,
        }
    }

    /// Open rows by position.
    #[must_use]
    pub const fn open_tabs() -> Self {
        Self {
            opened: Some(true),
            order: RecordOrder::Position,
            limit: None,
        }
    }

    /// Closed rows, most recently closed first.
    #[must_use]
    pub const fn closed_tabs() -> Self {
        Self {
            opened: Some(false),
            order: RecordOrder::ClosedAtDesc,
            limit: None,
        }
    }

    /// Caps the number of returned rows.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if the record passes the filter.
    #[must_use]
    pub fn matches(&self, record: &TabRecord) -> bool {
        self.opened.is_none_or(|opened| record.opened == opened)
    }
}

/// Persistence engine for tab records.
///
/// Implementations must be safe to share between tasks. Each call is atomic
/// for the single row it touches.
#[async_trait]
pub trait TabStorage: Send + Sync {
    /// Returns the rows matching the query.
    async fn find(&self, query: &RecordQuery) -> StorageResult<Vec<TabRecord>>;

    /// Inserts a new row. Fails if the id already exists.
    async fn insert(&self, record: &TabRecord) -> StorageResult<()>;

    /// Replaces an existing row. Fails if the id does not exist.
    async fn update(&self, record: &TabRecord) -> StorageResult<()>;

    /// Deletes a row. Deleting a missing id is not an error.
    async fn delete(&self, id: &TabId) -> StorageResult<()>;
}

/// Opens the backend selected in the settings.
pub fn open_storage(settings: &StorageSettings) -> StorageResult<Arc<dyn TabStorage>> {
    match settings.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageBackend::Sqlite => {
            let path = settings.resolved_path().map_err(|e| {
                crate::error::StorageError::Backend(format!("cannot resolve database path: {e}"))
            })?;
            tracing::info!(path = %path.display(), "Opening SQLite tab storage");
            Ok(Arc::new(SqliteStorage::open(&path)?))
        }
    }
}
