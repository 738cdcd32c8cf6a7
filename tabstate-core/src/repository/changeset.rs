//! Row-level diff between two tables, applied with compensation
//!
//! The storage engine only guarantees single-row atomicity. A changeset is
//! applied row by row; if one write fails, the writes already made are
//! undone in reverse order so the table on disk matches the last committed
//! mirror again.

use tracing::Instrument;

use crate::error::StorageResult;
use crate::models::TabRecord;
use crate::storage::TabStorage;

use super::table::TabTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Change {
    Insert(TabRecord),
    Update { before: TabRecord, after: TabRecord },
    Delete(TabRecord),
}

impl Change {
    fn inverse(&self) -> Self {
        match self {
            Self::Insert(record) => Self::Delete(record.clone()),
            Self::Update { before, after } => Self::Update {
                before: after.clone(),
                after: before.clone(),
            },
            Self::Delete(record) => Self::Insert(record.clone()),
        }
    }

    async fn apply(&self, storage: &dyn TabStorage) -> StorageResult<()> {
        match self {
            Self::Insert(record) => storage.insert(record).await,
            Self::Update { after, .. } => storage.update(after).await,
            Self::Delete(record) => storage.delete(&record.id).await,
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Insert(_) => "insert",
            Self::Update { .. } => "update",
            Self::Delete(_) => "delete",
        }
    }

    fn record(&self) -> &TabRecord {
        match self {
            Self::Insert(record) | Self::Delete(record) => record,
            Self::Update { after, .. } => after,
        }
    }
}

/// Ordered list of row writes turning one table into another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Changeset {
    changes: Vec<Change>,
}

impl Changeset {
    /// Computes the writes that turn `base` into `next`.
    ///
    /// Deletes come first, then updates, then inserts; each group is sorted
    /// by id so the write order is deterministic.
    pub fn between(base: &TabTable, next: &TabTable) -> StorageResult<Self> {
        let mut deletes = Vec::new();
        let mut updates = Vec::new();
        let mut inserts = Vec::new();

        for (id, row) in base.rows() {
            if !next.rows().contains_key(id) {
                deletes.push(Change::Delete(row.to_record()?));
            }
        }
        for (id, row) in next.rows() {
            match base.rows().get(id) {
                None => inserts.push(Change::Insert(row.to_record()?)),
                Some(old) if old != row => updates.push(Change::Update {
                    before: old.to_record()?,
                    after: row.to_record()?,
                }),
                Some(_) => {}
            }
        }

        for group in [&mut deletes, &mut updates, &mut inserts] {
            group.sort_by(|a, b| a.record().id.cmp(&b.record().id));
        }
        deletes.append(&mut updates);
        deletes.append(&mut inserts);
        Ok(Self { changes: deletes })
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[cfg(test)]
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Writes every change, compensating on the first failure.
    pub async fn apply(&self, storage: &dyn TabStorage) -> StorageResult<()> {
        let span = crate::trace_operation_debug!(
            crate::tracing::span_names::STORAGE_APPLY,
            writes = self.changes.len()
        );
        self.apply_all(storage).instrument(span).await
    }

    async fn apply_all(&self, storage: &dyn TabStorage) -> StorageResult<()> {
        for (index, change) in self.changes.iter().enumerate() {
            if let Err(err) = change.apply(storage).await {
                tracing::warn!(
                    op = change.kind(),
                    tab_id = %change.record().id,
                    error = %err,
                    "Storage write failed, rolling back"
                );
                let span = crate::trace_operation!(
                    crate::tracing::span_names::STORAGE_ROLLBACK,
                    writes = index
                );
                Self::compensate(storage, &self.changes[..index])
                    .instrument(span)
                    .await;
                return Err(err);
            }
        }
        Ok(())
    }

    async fn compensate(storage: &dyn TabStorage, applied: &[Change]) {
        for change in applied.iter().rev() {
            let undo = change.inverse();
            if let Err(err) = undo.apply(storage).await {
                tracing::error!(
                    op = undo.kind(),
                    tab_id = %undo.record().id,
                    error = %err,
                    "Rollback write failed; storage diverges from the last committed state"
                );
            }
        }
    }
}
