//! In-memory tab table

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::models::{TabId, TabRecord};

use super::{RecordOrder, RecordQuery, TabStorage};

/// Snapshot of the operation counters of a [`MemoryStorage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StorageStats {
    /// `find` calls
    pub queries: usize,
    /// Successful `insert` calls
    pub inserts: usize,
    /// Successful `update` calls
    pub updates: usize,
    /// Successful `delete` calls
    pub deletes: usize,
}

impl StorageStats {
    /// Total successful writes.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.inserts + self.updates + self.deletes
    }

    /// Every counted call, reads included.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.queries + self.writes()
    }
}

/// Tab table kept in process memory.
///
/// Counts every call and can be told to start failing writes, which is how
/// the repository's rollback path is exercised.
#[derive(Debug)]
pub struct MemoryStorage {
    rows: Mutex<BTreeMap<TabId, TabRecord>>,
    queries: AtomicUsize,
    inserts: AtomicUsize,
    updates: AtomicUsize,
    deletes: AtomicUsize,
    /// Writes left before the injected failure; `usize::MAX` = none armed
    writes_before_failure: AtomicUsize,
}

impl MemoryStorage {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            queries: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            writes_before_failure: AtomicUsize::new(usize::MAX),
        }
    }

    /// Creates a table pre-filled with rows, bypassing the counters.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = TabRecord>) -> Self {
        let storage = Self::new();
        if let Ok(mut rows) = storage.rows.lock() {
            rows.extend(records.into_iter().map(|r| (r.id.clone(), r)));
        }
        storage
    }

    /// Returns the current operation counters.
    #[must_use]
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            queries: self.queries.load(Ordering::SeqCst),
            inserts: self.inserts.load(Ordering::SeqCst),
            updates: self.updates.load(Ordering::SeqCst),
            deletes: self.deletes.load(Ordering::SeqCst),
        }
    }

    /// Lets `count` more writes succeed, then fails the next one. Writes
    /// after the failed one succeed again, so compensation can run.
    pub fn fail_write_after(&self, count: usize) {
        self.writes_before_failure.store(count, Ordering::SeqCst);
    }

    /// Disarms a pending injected failure.
    pub fn clear_faults(&self) {
        self.writes_before_failure.store(usize::MAX, Ordering::SeqCst);
    }

    /// Returns a copy of every row, bypassing the counters.
    #[must_use]
    pub fn dump(&self) -> Vec<TabRecord> {
        self.rows
            .lock()
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, BTreeMap<TabId, TabRecord>>> {
        self.rows
            .lock()
            .map_err(|e| StorageError::Backend(format!("memory table poisoned: {e}")))
    }

    fn check_fault(&self) -> StorageResult<()> {
        let left = self
            .writes_before_failure
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                usize::MAX | 0 => Some(usize::MAX),
                n => Some(n - 1),
            })
            .unwrap_or(usize::MAX);
        if left == 0 {
            return Err(StorageError::Backend("injected write failure".into()));
        }
        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TabStorage for MemoryStorage {
    async fn find(&self, query: &RecordQuery) -> StorageResult<Vec<TabRecord>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let rows = self.lock()?;
        let mut found: Vec<TabRecord> = rows
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();
        drop(rows);

        match query.order {
            RecordOrder::Unordered => {}
            RecordOrder::Position => {
                found.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
            }
            RecordOrder::ClosedAtDesc => {
                found.sort_by(|a, b| b.closed_at.cmp(&a.closed_at).then_with(|| a.id.cmp(&b.id)));
            }
        }
        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn insert(&self, record: &TabRecord) -> StorageResult<()> {
        self.check_fault()?;
        let mut rows = self.lock()?;
        if rows.contains_key(&record.id) {
            return Err(StorageError::Backend(format!(
                "duplicate tab id '{}'",
                record.id
            )));
        }
        rows.insert(record.id.clone(), record.clone());
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update(&self, record: &TabRecord) -> StorageResult<()> {
        self.check_fault()?;
        let mut rows = self.lock()?;
        let Some(slot) = rows.get_mut(&record.id) else {
            return Err(StorageError::Backend(format!(
                "no tab row with id '{}'",
                record.id
            )));
        };
        *slot = record.clone();
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, id: &TabId) -> StorageResult<()> {
        self.check_fault()?;
        self.lock()?.remove(id);
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
