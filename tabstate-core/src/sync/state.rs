//! Client-side view of the tab table

use std::sync::Arc;

use crate::models::{SplitRatio, Tab, TabId};
use crate::repository::TabSnapshot;
use crate::split::RatioCommit;

/// A split ratio shown before the repository has confirmed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRatio<'a> {
    /// Split view the override applies to
    pub split_view_id: &'a TabId,
    /// Value shown in place of the committed ratio
    pub value: SplitRatio,
    /// Revision that will contain the write, once known
    pub committed_at: Option<u64>,
}

#[derive(Debug, Clone)]
struct PendingOverride {
    split_view_id: TabId,
    value: SplitRatio,
    committed_at: Option<u64>,
}

/// Everything a subscriber caches between snapshots.
///
/// Open tabs and the active id are replaced wholesale by every snapshot.
/// The split ratio override is the only locally written field.
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    tabs: Arc<Vec<Tab>>,
    revision: u64,
    active_tab_id: Option<TabId>,
    closed_tabs: Vec<Tab>,
    pending_ratio: Option<PendingOverride>,
}

impl ClientState {
    /// Open tabs ordered by position.
    #[must_use]
    pub fn tabs(&self) -> &Arc<Vec<Tab>> {
        &self.tabs
    }

    /// Revision of the last applied snapshot.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Id of the ACTIVE tab.
    #[must_use]
    pub const fn active_tab_id(&self) -> Option<&TabId> {
        self.active_tab_id.as_ref()
    }

    /// Closed tabs as of the last refresh, most recent first.
    #[must_use]
    pub fn closed_tabs(&self) -> &[Tab] {
        &self.closed_tabs
    }

    /// The unconfirmed split ratio, if any.
    #[must_use]
    pub fn pending_ratio(&self) -> Option<PendingRatio<'_>> {
        self.pending_ratio.as_ref().map(|pending| PendingRatio {
            split_view_id: &pending.split_view_id,
            value: pending.value,
            committed_at: pending.committed_at,
        })
    }

    /// Replaces the open-tab view with `snapshot`.
    ///
    /// Snapshots older than the one already applied are ignored. Returns
    /// true if the state changed.
    pub fn apply_snapshot(&mut self, snapshot: &TabSnapshot) -> bool {
        if snapshot.revision < self.revision {
            tracing::trace!(
                revision = snapshot.revision,
                current = self.revision,
                "Ignoring stale snapshot"
            );
            return false;
        }
        if snapshot.revision == self.revision && Arc::ptr_eq(&snapshot.tabs, &self.tabs) {
            return false;
        }
        self.tabs = Arc::clone(&snapshot.tabs);
        self.revision = snapshot.revision;
        self.active_tab_id = snapshot.active_tab_id();
        self.settle_pending_ratio();
        true
    }

    /// Replaces the cached history. Returns `false` if it was already equal.
    pub fn set_closed_tabs(&mut self, closed_tabs: Vec<Tab>) -> bool {
        if self.closed_tabs == closed_tabs {
            return false;
        }
        self.closed_tabs = closed_tabs;
        true
    }

    /// Shows `value` for `split_view_id` until its write is confirmed.
    pub fn set_pending_ratio(&mut self, split_view_id: TabId, value: SplitRatio) {
        self.pending_ratio = Some(PendingOverride {
            split_view_id,
            value,
            committed_at: None,
        });
    }

    /// Records the outcome of a debounced write.
    ///
    /// A commit for an older value is ignored: a newer override is still
    /// waiting for its own write. A failed write drops the override so the
    /// committed ratio shows again.
    pub fn record_commit(&mut self, commit: &RatioCommit) -> bool {
        let Some(pending) = self.pending_ratio.as_mut() else {
            return false;
        };
        if pending.split_view_id != commit.split_view_id || pending.value != commit.ratio {
            return false;
        }
        match commit.revision {
            Some(revision) => pending.committed_at = Some(revision),
            None => {
                tracing::debug!(split_view_id = %commit.split_view_id, "Dropping unconfirmed split ratio");
                self.pending_ratio = None;
                return true;
            }
        }
        self.settle_pending_ratio();
        true
    }

    /// The ratio to display for a split view: the pending override if one
    /// exists for it, otherwise the committed value.
    #[must_use]
    pub fn effective_split_ratio(&self, split_view_id: &TabId) -> Option<SplitRatio> {
        if let Some(pending) = &self.pending_ratio
            && &pending.split_view_id == split_view_id
        {
            return Some(pending.value);
        }
        self.tabs
            .iter()
            .find(|tab| &tab.id == split_view_id)
            .and_then(Tab::split_view_content)
            .map(|content| content.split_ratio)
    }

    fn settle_pending_ratio(&mut self) {
        let Some(pending) = &self.pending_ratio else {
            return;
        };
        let confirmed = pending
            .committed_at
            .is_some_and(|revision| self.revision >= revision);
        let still_open = self
            .tabs
            .iter()
            .any(|tab| tab.id == pending.split_view_id && tab.is_split_view());
        if confirmed || !still_open {
            self.pending_ratio = None;
        }
    }
}
