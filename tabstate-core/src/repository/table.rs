//! Working copy of the tab table
//!
//! Every repository operation clones the committed table, mutates the copy
//! through the methods here, then calls [`TabTable::normalize`] which trims
//! history, reindexes and asserts the table invariants. Nothing in this file
//! touches storage.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::error::StorageResult;
use crate::models::{Tab, TabId, TabRecord, TabState};

use super::manager::{CloseDirection, CloseOutcome};

/// A tab plus its bookkeeping columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TabRow {
    pub tab: Tab,
    pub opened: bool,
    pub position: i64,
    pub closed_at: Option<DateTime<Utc>>,
}

impl TabRow {
    fn open(tab: Tab, position: i64) -> Self {
        Self {
            tab,
            opened: true,
            position,
            closed_at: None,
        }
    }

    pub fn from_record(record: &TabRecord) -> StorageResult<Self> {
        Ok(Self {
            tab: record.decode()?,
            opened: record.opened,
            position: record.position,
            closed_at: record.closed_at,
        })
    }

    pub fn to_record(&self) -> StorageResult<TabRecord> {
        TabRecord::encode(&self.tab, self.opened, self.position, self.closed_at)
    }
}

/// All rows, open and closed, keyed by id.
#[derive(Debug, Clone)]
pub(crate) struct TabTable {
    rows: HashMap<TabId, TabRow>,
    history_cap: usize,
}

impl TabTable {
    pub fn new(history_cap: usize) -> Self {
        Self {
            rows: HashMap::new(),
            history_cap,
        }
    }

    pub fn from_rows(history_cap: usize, rows: impl IntoIterator<Item = TabRow>) -> Self {
        Self {
            rows: rows.into_iter().map(|row| (row.tab.id.clone(), row)).collect(),
            history_cap,
        }
    }

    pub fn rows(&self) -> &HashMap<TabId, TabRow> {
        &self.rows
    }

    pub fn get(&self, id: &TabId) -> Option<&TabRow> {
        self.rows.get(id)
    }

    pub fn open_row(&self, id: &TabId) -> Option<&TabRow> {
        self.rows.get(id).filter(|row| row.opened)
    }

    pub fn open_row_mut(&mut self, id: &TabId) -> Option<&mut TabRow> {
        self.rows.get_mut(id).filter(|row| row.opened)
    }

    pub fn is_open(&self, id: &TabId) -> bool {
        self.open_row(id).is_some()
    }

    /// Open rows ordered by position, ties broken by id.
    fn open_rows(&self) -> Vec<&TabRow> {
        let mut open: Vec<&TabRow> = self.rows.values().filter(|row| row.opened).collect();
        open.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then_with(|| a.tab.id.cmp(&b.tab.id))
        });
        open
    }

    /// Closed rows, most recently closed first.
    fn closed_rows(&self) -> Vec<&TabRow> {
        let mut closed: Vec<&TabRow> = self.rows.values().filter(|row| !row.opened).collect();
        closed.sort_by(|a, b| {
            b.closed_at
                .cmp(&a.closed_at)
                .then_with(|| a.tab.id.cmp(&b.tab.id))
        });
        closed
    }

    pub fn open_ids(&self) -> Vec<TabId> {
        self.open_rows().into_iter().map(|row| row.tab.id.clone()).collect()
    }

    pub fn open_tabs(&self) -> Vec<Tab> {
        self.open_rows().into_iter().map(|row| row.tab.clone()).collect()
    }

    pub fn open_count(&self) -> usize {
        self.rows.values().filter(|row| row.opened).count()
    }

    pub fn closed_tabs(&self) -> Vec<Tab> {
        self.closed_rows()
            .into_iter()
            .map(|row| row.tab.clone())
            .collect()
    }

    pub fn active_id(&self) -> Option<TabId> {
        self.open_rows()
            .into_iter()
            .find(|row| row.tab.is_active())
            .map(|row| row.tab.id.clone())
    }

    /// Clears ACTIVE on every open row except `keep`.
    pub fn deactivate_all_except(&mut self, keep: Option<&TabId>) {
        for row in self.rows.values_mut() {
            if row.opened && row.tab.is_active() && Some(&row.tab.id) != keep {
                row.tab.state = TabState::Inactive;
            }
        }
    }

    /// Makes `id` the only ACTIVE open row. Returns false if it is not open.
    pub fn activate(&mut self, id: &TabId) -> bool {
        if !self.is_open(id) {
            return false;
        }
        self.deactivate_all_except(Some(id));
        if let Some(row) = self.open_row_mut(id) {
            row.tab.state = TabState::Active;
        }
        true
    }

    fn max_open_position(&self) -> Option<i64> {
        self.rows
            .values()
            .filter(|row| row.opened)
            .map(|row| row.position)
            .max()
    }

    /// Moves open rows at or after `position` one slot to the right.
    fn shift_from(&mut self, position: i64) {
        for row in self.rows.values_mut() {
            if row.opened && row.position >= position {
                row.position += 1;
            }
        }
    }

    /// Inserts (or replaces) an open row, appending when no position is given.
    pub fn insert_open(&mut self, tab: Tab, position: Option<usize>) {
        if tab.is_active() {
            self.deactivate_all_except(None);
        }
        self.rows.remove(&tab.id);
        let position = match position {
            Some(position) => {
                let position = position.min(self.open_count()) as i64;
                self.shift_from(position);
                position
            }
            None => self.max_open_position().map_or(0, |max| max + 1),
        };
        self.rows.insert(tab.id.clone(), TabRow::open(tab, position));
    }

    /// A `closed_at` strictly later than every existing one, so history order
    /// stays total even for closes within one clock tick.
    fn next_closed_at(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let latest = self.rows.values().filter_map(|row| row.closed_at).max();
        match latest {
            Some(latest) if latest >= now => latest + Duration::microseconds(1),
            _ => now,
        }
    }

    /// Closes one open row with single-tab semantics.
    pub fn close(&mut self, id: &TabId) -> CloseOutcome {
        let Some(row) = self.open_row(id) else {
            return CloseOutcome::NotOpen;
        };
        let was_active = row.tab.is_active();
        let position = row.position;
        let hard_delete = row.tab.is_hard_deleted_on_close();

        let outcome = if hard_delete {
            self.rows.remove(id);
            CloseOutcome::Deleted
        } else {
            let closed_at = self.next_closed_at();
            if let Some(row) = self.rows.get_mut(id) {
                row.opened = false;
                row.closed_at = Some(closed_at);
                row.tab.state = TabState::Inactive;
            }
            CloseOutcome::SoftClosed
        };

        if was_active {
            if let Some(next) = self.successor_of(position) {
                self.activate(&next);
            }
        }
        outcome
    }

    /// The open row just before `position`, or the first one if none precedes it.
    fn successor_of(&self, position: i64) -> Option<TabId> {
        let open = self.open_rows();
        open.iter()
            .rev()
            .find(|row| row.position < position)
            .or_else(|| open.first())
            .map(|row| row.tab.id.clone())
    }

    /// Ids a batch close selects, in position order. Pinned rows never qualify.
    pub fn batch_targets(&self, direction: CloseDirection, from: &TabId) -> Vec<TabId> {
        let Some(anchor) = self.open_row(from).map(|row| row.position) else {
            return Vec::new();
        };
        self.open_rows()
            .into_iter()
            .filter(|row| !row.tab.is_pinned && &row.tab.id != from)
            .filter(|row| match direction {
                CloseDirection::Above => row.position < anchor,
                CloseDirection::Below => row.position > anchor,
                CloseDirection::Other => true,
            })
            .map(|row| row.tab.id.clone())
            .collect()
    }

    /// Reopens the most recently closed row as the ACTIVE tab.
    pub fn reopen_most_recent(&mut self) -> Option<Tab> {
        let id = self.closed_rows().first().map(|row| row.tab.id.clone())?;
        let target = self.rows.get(&id).map(|row| row.position)?;
        let position = target.clamp(0, self.open_count() as i64);

        self.deactivate_all_except(None);
        self.shift_from(position);
        let row = self.rows.get_mut(&id)?;
        row.opened = true;
        row.closed_at = None;
        row.position = position;
        row.tab.state = TabState::Active;
        self.reid_clashing_children();
        self.rows.get(&id).map(|row| row.tab.clone())
    }

    /// Hard-deletes closed rows beyond the history cap, oldest first.
    fn trim_history(&mut self) -> usize {
        let evicted: Vec<TabId> = self
            .closed_rows()
            .into_iter()
            .skip(self.history_cap)
            .map(|row| row.tab.id.clone())
            .collect();
        for id in &evicted {
            self.rows.remove(id);
        }
        evicted.len()
    }

    /// Stable reindex: pinned block first, each group keeps its relative order.
    fn reindex(&mut self) {
        let open = self.open_rows();
        let (pinned, unpinned): (Vec<&TabRow>, Vec<&TabRow>) =
            open.into_iter().partition(|row| row.tab.is_pinned);
        let order: Vec<TabId> = pinned
            .into_iter()
            .chain(unpinned)
            .map(|row| row.tab.id.clone())
            .collect();

        for (index, id) in order.iter().enumerate() {
            if let Some(row) = self.rows.get_mut(id) {
                row.position = index as i64;
            }
        }
    }

    /// Returns the id that would end up both open and embedded if `tab`
    /// became an open row.
    pub fn embedding_conflict(&self, tab: &Tab) -> Option<TabId> {
        if let Some(content) = tab.split_view_content() {
            if let Some(child) = content
                .child_tabs
                .iter()
                .find(|child| child.id == tab.id || self.is_open(&child.id))
            {
                return Some(child.id.clone());
            }
        }
        self.rows
            .values()
            .filter(|row| row.opened && row.tab.id != tab.id)
            .filter_map(|row| row.tab.split_view_content())
            .any(|content| content.contains(&tab.id))
            .then(|| tab.id.clone())
    }

    /// Fixes rows loaded from storage that break the bookkeeping rules.
    ///
    /// Several ACTIVE rows collapse to the most recently updated one; closed
    /// rows lose ACTIVE and get a `closed_at`; open rows lose theirs. Split
    /// view children that clash with an open row get a fresh id.
    pub fn repair(&mut self) {
        let keep = self
            .rows
            .values()
            .filter(|row| row.opened && row.tab.is_active())
            .max_by(|a, b| {
                a.tab
                    .updated_at
                    .cmp(&b.tab.updated_at)
                    .then_with(|| b.tab.id.cmp(&a.tab.id))
            })
            .map(|row| row.tab.id.clone());
        self.deactivate_all_except(keep.as_ref());

        self.reid_clashing_children();

        for row in self.rows.values_mut() {
            if row.opened {
                row.closed_at = None;
            } else {
                if row.tab.is_active() {
                    row.tab.state = TabState::Inactive;
                }
                if row.closed_at.is_none() {
                    row.closed_at = Some(row.tab.updated_at);
                }
            }
        }
    }

    /// Gives a fresh id to every embedded child that shares its id with an
    /// open row or with its own container.
    fn reid_clashing_children(&mut self) {
        let open_ids: std::collections::HashSet<TabId> = self
            .rows
            .values()
            .filter(|row| row.opened)
            .map(|row| row.tab.id.clone())
            .collect();

        for row in self.rows.values_mut() {
            let container_id = row.tab.id.clone();
            if let crate::models::TabKind::SplitView(content) = &mut row.tab.kind {
                for child in &mut content.child_tabs {
                    if child.id == container_id || open_ids.contains(&child.id) {
                        tracing::debug!(
                            split_view_id = %container_id,
                            child_id = %child.id,
                            "Re-identifying embedded tab that clashes with an open tab"
                        );
                        *child = child.clone_with_new_id();
                    }
                }
            }
        }
    }

    /// Trims history, reindexes and asserts every invariant.
    ///
    /// # Panics
    ///
    /// Panics if the table is inconsistent afterwards. That is always a logic
    /// error in the repository, never bad input.
    pub fn normalize(&mut self) {
        let evicted = self.trim_history();
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted closed tabs beyond history cap");
        }
        self.reindex();
        if let Err(violation) = self.check_invariants() {
            panic!("tab table invariant violated: {violation}");
        }
    }

    pub fn check_invariants(&self) -> Result<(), String> {
        let open = self.open_rows();

        let active = open.iter().filter(|row| row.tab.is_active()).count();
        if active > 1 {
            return Err(format!("{active} open tabs are ACTIVE"));
        }

        for (index, row) in open.iter().enumerate() {
            if row.position != index as i64 {
                return Err(format!(
                    "tab {} has position {}, expected {index}",
                    row.tab.id, row.position
                ));
            }
            if row.closed_at.is_some() {
                return Err(format!("open tab {} has closed_at set", row.tab.id));
            }
        }

        if let Some(first_unpinned) = open.iter().position(|row| !row.tab.is_pinned) {
            if open[first_unpinned..].iter().any(|row| row.tab.is_pinned) {
                return Err("pinned tab after an unpinned tab".into());
            }
        }

        let closed = self.closed_rows();
        if closed.len() > self.history_cap {
            return Err(format!(
                "{} closed tabs exceed the history cap of {}",
                closed.len(),
                self.history_cap
            ));
        }
        if let Some(row) = closed.iter().find(|row| row.closed_at.is_none()) {
            return Err(format!("closed tab {} has no closed_at", row.tab.id));
        }

        for row in &open {
            if let Some(content) = row.tab.split_view_content() {
                if content.child_tabs.len() > crate::models::MAX_SPLIT_CHILDREN {
                    return Err(format!("split view {} has too many children", row.tab.id));
                }
                if let Some(child) = content.child_tabs.iter().find(|c| self.is_open(&c.id)) {
                    return Err(format!(
                        "child {} of split view {} is also an open tab",
                        child.id, row.tab.id
                    ));
                }
            }
        }

        if let Some(row) = self.rows.values().find(|row| row.tab.id.is_ephemeral()) {
            return Err(format!("ephemeral tab {} reached the table", row.tab.id));
        }

        Ok(())
    }
}
