//! Core identifier and enum types for tabs
//!
//! This module contains the tab identifier, the activation state and the
//! variant discriminator shared by the in-memory model and the persisted
//! record.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix that marks a client-only tab id which must never reach storage.
pub const EPHEMERAL_TAB_PREFIX: &str = "temp-";

/// Opaque, stable identifier of a tab.
///
/// Persisted tabs use a random UUID string. Ephemeral placeholder tabs carry
/// the [`EPHEMERAL_TAB_PREFIX`] and are ignored by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(String);

impl TabId {
    /// Creates a new random tab ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates a new random ephemeral tab ID.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self(format!("{EPHEMERAL_TAB_PREFIX}{}", Uuid::new_v4()))
    }

    /// Wraps an existing identifier string.
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns true if this id belongs to a client-only placeholder tab.
    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        self.0.starts_with(EPHEMERAL_TAB_PREFIX)
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TabId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Activation state of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabState {
    /// The tab is the one currently shown
    Active,
    /// The tab is open but in the background
    #[default]
    Inactive,
    /// The tab content is loading
    Loading,
    /// The tab content failed to load
    Error,
}

impl TabState {
    /// Returns the state identifier used in the storage column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Loading => "loading",
            Self::Error => "error",
        }
    }

    /// Parses a storage column value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "loading" => Some(Self::Loading),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Returns true for [`TabState::Active`].
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for TabState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminator of the tab variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabType {
    /// Web page
    Web,
    /// Chat session with an agent
    Chat,
    /// Start page with favorites
    NewTab,
    /// Container holding up to two tabs side by side
    SplitView,
    /// Agent creation wizard
    CreateNewAgent,
    /// Agent definition editor
    EditAgentDefinition,
    /// Embedded wiki workspace
    WikiEmbed,
}

impl TabType {
    /// Returns the discriminator used in the storage column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Chat => "chat",
            Self::NewTab => "new_tab",
            Self::SplitView => "split_view",
            Self::CreateNewAgent => "create_new_agent",
            Self::EditAgentDefinition => "edit_agent_definition",
            Self::WikiEmbed => "wiki_embed",
        }
    }

    /// Parses a storage column value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "web" => Some(Self::Web),
            "chat" => Some(Self::Chat),
            "new_tab" => Some(Self::NewTab),
            "split_view" => Some(Self::SplitView),
            "create_new_agent" => Some(Self::CreateNewAgent),
            "edit_agent_definition" => Some(Self::EditAgentDefinition),
            "wiki_embed" => Some(Self::WikiEmbed),
            _ => None,
        }
    }
}

impl fmt::Display for TabType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
