//! Tab repository
//!
//! `TabRepository` owns the tab table. It keeps an in-memory mirror of every
//! row, open and closed, loaded once at [`TabRepository::open`]. A mutation
//! takes the write gate, edits a clone of the mirror, writes only the rows
//! that changed, and on success swaps the clone in and publishes a new
//! [`TabSnapshot`] before the gate is released.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tracing::Instrument;

use crate::config::EngineSettings;
use crate::error::{TabError, TabResult, ValidationError};
use crate::models::{SplitViewContent, Tab, TabId, TabPatch};
use crate::storage::{RecordQuery, TabStorage, open_storage};
use crate::tracing::span_names;

use super::changeset::Changeset;
use super::snapshot::TabSnapshot;
use super::table::{TabRow, TabTable};

/// Number of soft-closed tabs kept for restore.
pub const MAX_CLOSED_TABS: usize = 10;

/// Which tabs a batch close selects, relative to the anchor tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloseDirection {
    /// Tabs listed before the anchor (lower positions)
    Above,
    /// Tabs listed after the anchor (higher positions)
    Below,
    /// Every tab except the anchor
    Other,
}

impl fmt::Display for CloseDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Above => "above",
            Self::Below => "below",
            Self::Other => "other",
        })
    }
}

/// What `close_tab` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Moved to the closed-tab history
    SoftClosed,
    /// Removed for good (new-tab pages, empty split views)
    Deleted,
    /// Nothing to close: unknown, already closed, or ephemeral
    NotOpen,
}

struct Committed {
    table: TabTable,
    revision: u64,
}

/// Persistent, ordered collection of tabs with a single active tab.
pub struct TabRepository {
    storage: Arc<dyn TabStorage>,
    /// Write gate; holds the committed mirror
    state: Mutex<Committed>,
    snapshot_tx: watch::Sender<TabSnapshot>,
    history_tx: watch::Sender<Arc<Vec<Tab>>>,
}

impl fmt::Debug for TabRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot_tx.borrow();
        f.debug_struct("TabRepository")
            .field("revision", &snapshot.revision)
            .field("open_tabs", &snapshot.len())
            .finish_non_exhaustive()
    }
}

impl TabRepository {
    /// Loads the table with the default history cap.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or repaired.
    pub async fn open(storage: Arc<dyn TabStorage>) -> TabResult<Self> {
        Self::open_with_history(storage, MAX_CLOSED_TABS).await
    }

    /// Opens the configured storage backend and loads the table with the
    /// configured history cap.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be opened or the table cannot
    /// be read or repaired.
    pub async fn from_settings(settings: &EngineSettings) -> TabResult<Self> {
        let storage = open_storage(&settings.storage)?;
        Self::open_with_history(storage, settings.history.max_closed_tabs).await
    }

    /// Loads the table, repairing rows that break the bookkeeping rules.
    ///
    /// Unreadable rows are logged and left alone. Repairs (duplicate ACTIVE
    /// rows, gaps in positions, history beyond the cap) are written back
    /// before the repository is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or repaired.
    pub async fn open_with_history(
        storage: Arc<dyn TabStorage>,
        max_closed_tabs: usize,
    ) -> TabResult<Self> {
        let span = crate::trace_operation!(span_names::REPOSITORY_OPEN, max_closed_tabs);
        Self::load(storage, max_closed_tabs).instrument(span).await
    }

    async fn load(storage: Arc<dyn TabStorage>, max_closed_tabs: usize) -> TabResult<Self> {
        let records = storage.find(&RecordQuery::all()).await?;
        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            if record.id.is_ephemeral() {
                tracing::warn!(tab_id = %record.id, "Ignoring stored ephemeral tab");
                continue;
            }
            match TabRow::from_record(record) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    tracing::error!(tab_id = %record.id, error = %e, "Skipping unreadable tab row");
                }
            }
        }

        let loaded = TabTable::from_rows(max_closed_tabs, rows);
        let mut repaired = loaded.clone();
        repaired.repair();
        repaired.normalize();

        let changes = Changeset::between(&loaded, &repaired)?;
        if !changes.is_empty() {
            tracing::info!(writes = changes.len(), "Repairing tab table");
            changes.apply(storage.as_ref()).await?;
        }

        let snapshot = TabSnapshot::new(0, repaired.open_tabs());
        let history = Arc::new(repaired.closed_tabs());
        tracing::info!(
            open = snapshot.len(),
            closed = history.len(),
            "Tab repository ready"
        );

        Ok(Self {
            storage,
            state: Mutex::new(Committed {
                table: repaired,
                revision: 0,
            }),
            snapshot_tx: watch::Sender::new(snapshot),
            history_tx: watch::Sender::new(history),
        })
    }

    /// Subscribes to snapshots. The receiver starts at the current one.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TabSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Subscribes to the closed-tab history, most recent first. The
    /// receiver starts at the current history.
    #[must_use]
    pub fn subscribe_history(&self) -> watch::Receiver<Arc<Vec<Tab>>> {
        self.history_tx.subscribe()
    }

    /// The last committed snapshot.
    #[must_use]
    pub fn snapshot(&self) -> TabSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Open tabs ordered by position.
    #[must_use]
    pub fn get_all_open_tabs(&self) -> Vec<Tab> {
        self.snapshot_tx.borrow().tabs.as_ref().clone()
    }

    /// Id of the ACTIVE tab, if any.
    #[must_use]
    pub fn get_active_tab_id(&self) -> Option<TabId> {
        self.snapshot_tx.borrow().active_tab_id()
    }

    /// Looks up an open tab.
    #[must_use]
    pub fn get_open_tab(&self, id: &TabId) -> Option<Tab> {
        self.snapshot_tx.borrow().get(id).cloned()
    }

    /// The open split view embedding a child with this id.
    #[must_use]
    pub fn find_split_view_containing(&self, child_id: &TabId) -> Option<Tab> {
        self.snapshot_tx
            .borrow()
            .tabs
            .iter()
            .find(|tab| {
                tab.split_view_content()
                    .is_some_and(|content| content.contains(child_id))
            })
            .cloned()
    }

    /// Closed tabs, most recently closed first, at most `limit`.
    #[must_use]
    pub fn get_closed_tabs(&self, limit: usize) -> Vec<Tab> {
        self.history_tx
            .borrow()
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Makes `id` the only ACTIVE tab.
    ///
    /// # Errors
    ///
    /// Returns an error only if storage fails.
    pub async fn set_active_tab(&self, id: &TabId) -> TabResult<()> {
        if id.is_ephemeral() {
            return Ok(());
        }
        let span = crate::trace_operation!(span_names::TAB_ACTIVATE, tab_id = %id);
        let result = self
            .commit(|table| {
                if table.activate(id) {
                    Ok(())
                } else {
                    Err(TabError::NotFound(id.clone()))
                }
            })
            .instrument(span)
            .await;
        ignore_not_found(result, ())
    }

    /// Adds a tab, appended or inserted at `position`.
    ///
    /// Rows at or after `position` move one slot right. An ACTIVE tab
    /// deactivates every other. Ephemeral tabs are returned unchanged
    /// without being stored.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed split views, or a storage error.
    pub async fn add_tab(&self, tab: Tab, position: Option<usize>) -> TabResult<Tab> {
        if tab.id.is_ephemeral() {
            return Ok(tab);
        }
        if let Some(content) = tab.split_view_content() {
            SplitViewContent::validate_children(&content.child_tabs)?;
        }

        let span = crate::trace_operation!(
            span_names::TAB_ADD,
            tab_id = %tab.id,
            tab_type = %tab.tab_type().as_str(),
            position = ?position
        );
        self.commit(move |table| {
            if let Some(conflict) = table.embedding_conflict(&tab) {
                return Err(ValidationError::EmbeddedTabConflict(conflict).into());
            }
            table.insert_open(tab.clone(), position);
            Ok(tab)
        })
        .instrument(span)
        .await
    }

    /// Merges a patch into an open tab and returns the result.
    ///
    /// Only shared fields and fields of the tab's own variant are applied.
    /// Returns `None` if the tab is not open or the id is ephemeral.
    ///
    /// # Errors
    ///
    /// Returns a validation error for out-of-range values, or a storage error.
    pub async fn update_tab(&self, id: &TabId, patch: &TabPatch) -> TabResult<Option<Tab>> {
        if id.is_ephemeral() {
            return Ok(None);
        }
        let span = crate::trace_operation!(span_names::TAB_UPDATE, tab_id = %id);
        let result = self
            .commit(|table| {
                let Some(row) = table.open_row(id) else {
                    return Err(TabError::NotFound(id.clone()));
                };
                let mut tab = row.tab.clone();
                if !tab.apply_patch(patch)? {
                    return Ok(Some(tab));
                }
                tab.updated_at = Utc::now();
                if let Some(conflict) = table.embedding_conflict(&tab) {
                    return Err(ValidationError::EmbeddedTabConflict(conflict).into());
                }
                if tab.is_active() {
                    table.deactivate_all_except(Some(id));
                }
                if let Some(row) = table.open_row_mut(id) {
                    row.tab = tab.clone();
                }
                Ok(Some(tab))
            })
            .instrument(span)
            .await;
        ignore_not_found(result, None)
    }

    /// Closes one tab.
    ///
    /// New-tab pages and empty split views are deleted, everything else moves
    /// to the history. Closing the ACTIVE tab activates the one before it.
    ///
    /// # Errors
    ///
    /// Returns an error only if storage fails.
    pub async fn close_tab(&self, id: &TabId) -> TabResult<CloseOutcome> {
        if id.is_ephemeral() {
            return Ok(CloseOutcome::NotOpen);
        }
        let span = crate::trace_operation!(span_names::TAB_CLOSE, tab_id = %id);
        let result = self
            .commit(|table| match table.close(id) {
                CloseOutcome::NotOpen => Err(TabError::NotFound(id.clone())),
                outcome => Ok(outcome),
            })
            .instrument(span)
            .await;
        ignore_not_found(result, CloseOutcome::NotOpen)
    }

    /// Closes the unpinned tabs on one side of `from_id` (or all others).
    ///
    /// Returns the number of tabs closed. One snapshot is published for the
    /// whole batch.
    ///
    /// # Errors
    ///
    /// Returns an error only if storage fails.
    pub async fn close_tabs(&self, direction: CloseDirection, from_id: &TabId) -> TabResult<usize> {
        if from_id.is_ephemeral() {
            return Ok(0);
        }
        let span = crate::trace_operation!(
            span_names::TAB_CLOSE_MANY,
            tab_id = %from_id,
            direction = %direction
        );
        let result = self
            .commit(|table| {
                if !table.is_open(from_id) {
                    return Err(TabError::NotFound(from_id.clone()));
                }
                let targets = table.batch_targets(direction, from_id);
                for id in &targets {
                    table.close(id);
                }
                Ok(targets.len())
            })
            .instrument(span)
            .await;
        ignore_not_found(result, 0)
    }

    /// Pins or unpins a tab and reindexes.
    ///
    /// # Errors
    ///
    /// Returns an error only if storage fails.
    pub async fn pin_tab(&self, id: &TabId, pinned: bool) -> TabResult<()> {
        if id.is_ephemeral() {
            return Ok(());
        }
        let span = crate::trace_operation!(span_names::TAB_PIN, tab_id = %id, pinned);
        let result = self
            .commit(|table| {
                let Some(row) = table.open_row_mut(id) else {
                    return Err(TabError::NotFound(id.clone()));
                };
                if row.tab.is_pinned != pinned {
                    row.tab.is_pinned = pinned;
                    row.tab.updated_at = Utc::now();
                }
                Ok(())
            })
            .instrument(span)
            .await;
        ignore_not_found(result, ())
    }

    /// Reopens the most recently closed tab as the ACTIVE tab.
    ///
    /// The tab returns to its former position, clamped to the number of open
    /// tabs. Returns `None` if the history is empty.
    ///
    /// # Errors
    ///
    /// Returns an error only if storage fails.
    pub async fn restore_closed_tab(&self) -> TabResult<Option<Tab>> {
        let span = crate::trace_operation!(span_names::TAB_RESTORE);
        self.commit(|table| Ok(table.reopen_most_recent()))
            .instrument(span)
            .await
    }

    /// Runs `op` on a working copy and commits the rows it changed.
    ///
    /// Nothing is written or published if `op` fails or changes nothing. A
    /// storage failure is compensated and leaves the mirror untouched.
    async fn commit<T, F>(&self, op: F) -> TabResult<T>
    where
        T: Send,
        F: FnOnce(&mut TabTable) -> TabResult<T> + Send,
    {
        let mut state = self.state.lock().await;
        let mut working = state.table.clone();
        let value = op(&mut working)?;
        working.normalize();

        let changes = Changeset::between(&state.table, &working)?;
        if changes.is_empty() {
            return Ok(value);
        }
        changes.apply(self.storage.as_ref()).await?;

        state.table = working;
        state.revision += 1;
        self.publish(&state);
        tracing::debug!(
            revision = state.revision,
            writes = changes.len(),
            "Committed tab change"
        );
        Ok(value)
    }

    fn publish(&self, state: &Committed) {
        self.snapshot_tx.send_replace(TabSnapshot::new(
            state.revision,
            state.table.open_tabs(),
        ));
        self.history_tx
            .send_replace(Arc::new(state.table.closed_tabs()));
    }
}

/// Turns `NotFound` into a logged no-op.
fn ignore_not_found<T>(result: TabResult<T>, fallback: T) -> TabResult<T> {
    match result {
        Err(TabError::NotFound(id)) => {
            tracing::warn!(tab_id = %id, "Tab is not open, ignoring");
            Ok(fallback)
        }
        other => other,
    }
}
