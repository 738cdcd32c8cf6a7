//! Published repository state

use std::sync::Arc;

use crate::models::{Tab, TabId};

/// Open tabs as of one committed write.
///
/// `revision` increases by one for every write that changed something, so
/// subscribers can order snapshots against their own pending edits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TabSnapshot {
    /// Logical timestamp of the write that produced this snapshot
    pub revision: u64,
    /// Open tabs ordered by position
    pub tabs: Arc<Vec<Tab>>,
}

impl TabSnapshot {
    pub(crate) fn new(revision: u64, tabs: Vec<Tab>) -> Self {
        Self {
            revision,
            tabs: Arc::new(tabs),
        }
    }

    /// The ACTIVE tab, if any.
    #[must_use]
    pub fn active_tab(&self) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.is_active())
    }

    /// Id of the ACTIVE tab, if any.
    #[must_use]
    pub fn active_tab_id(&self) -> Option<TabId> {
        self.active_tab().map(|tab| tab.id.clone())
    }

    /// Looks up an open tab.
    #[must_use]
    pub fn get(&self, id: &TabId) -> Option<&Tab> {
        self.tabs.iter().find(|tab| &tab.id == id)
    }

    /// Position of an open tab.
    #[must_use]
    pub fn position_of(&self, id: &TabId) -> Option<usize> {
        self.tabs.iter().position(|tab| &tab.id == id)
    }

    /// Number of open tabs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// Returns true if no tab is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}
