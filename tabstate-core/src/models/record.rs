//! Persisted tab record
//!
//! The storage-layer shape of a tab: the shared columns, the bookkeeping
//! columns (`opened`, `position`, `closed_at`) and an opaque payload blob
//! holding the variant fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

use super::tab::{Tab, TabKind};
use super::types::{TabId, TabState, TabType};

/// A row of the tab table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabRecord {
    /// Tab identifier (primary key)
    pub id: TabId,
    /// Variant discriminator
    pub tab_type: TabType,
    /// Display title
    pub title: String,
    /// Activation state
    pub state: TabState,
    /// Pinned flag
    pub is_pinned: bool,
    /// True while the tab is part of the live tab bar
    pub opened: bool,
    /// Ordering key among open rows; last known position for closed rows
    pub position: i64,
    /// When the tab was soft-closed
    pub closed_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
    /// JSON blob of the variant fields
    pub payload: String,
}

impl TabRecord {
    /// Encodes a tab together with its bookkeeping columns.
    pub fn encode(
        tab: &Tab,
        opened: bool,
        position: i64,
        closed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            id: tab.id.clone(),
            tab_type: tab.tab_type(),
            title: tab.title.clone(),
            state: tab.state,
            is_pinned: tab.is_pinned,
            opened,
            position,
            closed_at,
            created_at: tab.created_at,
            updated_at: tab.updated_at,
            payload: tab.kind.to_payload()?,
        })
    }

    /// Decodes the logical tab held by this row.
    pub fn decode(&self) -> Result<Tab, StorageError> {
        let kind =
            TabKind::from_payload(self.tab_type, &self.payload).map_err(|e| StorageError::Corrupt {
                id: self.id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Tab {
            id: self.id.clone(),
            title: self.title.clone(),
            state: self.state,
            is_pinned: self.is_pinned,
            created_at: self.created_at,
            updated_at: self.updated_at,
            kind,
        })
    }
}
