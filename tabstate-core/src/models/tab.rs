//! The tab entity and its variants

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, ValidationError};

use super::content::{
    AgentEditorContent, AgentWizardContent, ChatContent, Favorite, NewTabContent, SplitRatio,
    SplitViewContent, WebContent, WikiEmbedContent,
};
use super::patch::TabPatch;
use super::types::{TabId, TabState, TabType};

/// Title used for freshly opened new-tab pages.
pub const NEW_TAB_TITLE: &str = "New Tab";

/// Variant part of a tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TabKind {
    /// Web page
    Web(WebContent),
    /// Chat session
    Chat(ChatContent),
    /// New-tab page
    NewTab(NewTabContent),
    /// Split-view container
    SplitView(SplitViewContent),
    /// Agent creation wizard
    CreateNewAgent(AgentWizardContent),
    /// Agent definition editor
    EditAgentDefinition(AgentEditorContent),
    /// Embedded wiki workspace
    WikiEmbed(WikiEmbedContent),
}

impl TabKind {
    /// Returns the variant discriminator.
    #[must_use]
    pub const fn tab_type(&self) -> TabType {
        match self {
            Self::Web(_) => TabType::Web,
            Self::Chat(_) => TabType::Chat,
            Self::NewTab(_) => TabType::NewTab,
            Self::SplitView(_) => TabType::SplitView,
            Self::CreateNewAgent(_) => TabType::CreateNewAgent,
            Self::EditAgentDefinition(_) => TabType::EditAgentDefinition,
            Self::WikiEmbed(_) => TabType::WikiEmbed,
        }
    }

    /// Encodes the variant fields as the opaque payload blob.
    pub fn to_payload(&self) -> Result<String, StorageError> {
        let encoded = match self {
            Self::Web(content) => serde_json::to_string(content),
            Self::Chat(content) => serde_json::to_string(content),
            Self::NewTab(content) => serde_json::to_string(content),
            Self::SplitView(content) => serde_json::to_string(content),
            Self::CreateNewAgent(content) => serde_json::to_string(content),
            Self::EditAgentDefinition(content) => serde_json::to_string(content),
            Self::WikiEmbed(content) => serde_json::to_string(content),
        };
        encoded.map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Decodes a payload blob for the given discriminator.
    pub fn from_payload(tab_type: TabType, payload: &str) -> Result<Self, StorageError> {
        fn decode<T: serde::de::DeserializeOwned>(payload: &str) -> Result<T, StorageError> {
            serde_json::from_str(payload).map_err(|e| StorageError::Serialization(e.to_string()))
        }

        Ok(match tab_type {
            TabType::Web => Self::Web(decode(payload)?),
            TabType::Chat => Self::Chat(decode(payload)?),
            TabType::NewTab => Self::NewTab(decode(payload)?),
            TabType::SplitView => {
                let content: SplitViewContent = decode(payload)?;
                SplitViewContent::validate_children(&content.child_tabs)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Self::SplitView(content)
            }
            TabType::CreateNewAgent => Self::CreateNewAgent(decode(payload)?),
            TabType::EditAgentDefinition => Self::EditAgentDefinition(decode(payload)?),
            TabType::WikiEmbed => Self::WikiEmbed(decode(payload)?),
        })
    }

    /// Merges the patch fields this variant understands.
    ///
    /// Fields that belong to other variants are ignored. Validation happens
    /// before anything is written, so a rejected patch leaves `self` untouched.
    /// Returns true if any field changed.
    pub fn apply_patch(&mut self, patch: &TabPatch) -> Result<bool, ValidationError> {
        let mut changed = false;
        match self {
            Self::Web(content) => {
                changed |= assign(&mut content.url, patch.url.as_ref());
                changed |= assign(&mut content.favicon, patch.favicon.as_ref());
            }
            Self::Chat(content) => {
                changed |= assign(&mut content.agent_id, patch.agent_id.as_ref());
                changed |= assign(&mut content.agent_def_id, patch.agent_def_id.as_ref());
            }
            Self::NewTab(content) => {
                changed |= assign(&mut content.favorites, patch.favorites.as_ref());
            }
            Self::SplitView(content) => {
                let ratio = patch.split_ratio.map(SplitRatio::try_new).transpose()?;
                if let Some(children) = &patch.child_tabs {
                    SplitViewContent::validate_children(children)?;
                }
                changed |= assign(&mut content.split_ratio, ratio.as_ref());
                changed |= assign(&mut content.child_tabs, patch.child_tabs.as_ref());
            }
            Self::CreateNewAgent(content) => {
                let def_id = patch.agent_def_id.clone().map(Some);
                changed |= assign(&mut content.agent_def_id, def_id.as_ref());
                changed |= assign(&mut content.step, patch.step.as_ref());
            }
            Self::EditAgentDefinition(content) => {
                changed |= assign(&mut content.agent_def_id, patch.agent_def_id.as_ref());
                changed |= assign(&mut content.step, patch.step.as_ref());
            }
            Self::WikiEmbed(content) => {
                changed |= assign(&mut content.workspace_id, patch.workspace_id.as_ref());
            }
        }
        Ok(changed)
    }
}

fn assign<T: Clone + PartialEq>(slot: &mut T, value: Option<&T>) -> bool {
    match value {
        Some(value) if slot != value => {
            *slot = value.clone();
            true
        }
        _ => false,
    }
}

/// A single addressable unit of UI content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    /// Stable identifier
    pub id: TabId,
    /// Display title
    pub title: String,
    /// Activation state
    pub state: TabState,
    /// Whether the tab is pinned to the front of the tab bar
    #[serde(default)]
    pub is_pinned: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
    /// Variant-specific content
    pub kind: TabKind,
}

impl Tab {
    /// Creates an inactive, unpinned tab with a fresh id.
    #[must_use]
    pub fn new(title: impl Into<String>, kind: TabKind) -> Self {
        let now = Utc::now();
        Self {
            id: TabId::new(),
            title: title.into(),
            state: TabState::Inactive,
            is_pinned: false,
            created_at: now,
            updated_at: now,
            kind,
        }
    }

    /// Creates a web tab.
    #[must_use]
    pub fn web(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(
            title,
            TabKind::Web(WebContent {
                url: url.into(),
                favicon: None,
            }),
        )
    }

    /// Creates a chat tab for an existing agent.
    #[must_use]
    pub fn chat(
        title: impl Into<String>,
        agent_id: impl Into<String>,
        agent_def_id: impl Into<String>,
    ) -> Self {
        Self::new(
            title,
            TabKind::Chat(ChatContent {
                agent_id: agent_id.into(),
                agent_def_id: agent_def_id.into(),
            }),
        )
    }

    /// Creates a new-tab page with the given favorites.
    #[must_use]
    pub fn new_tab(favorites: Vec<Favorite>) -> Self {
        Self::new(NEW_TAB_TITLE, TabKind::NewTab(NewTabContent { favorites }))
    }

    /// Creates the client-only placeholder shown when no tab is open.
    ///
    /// The repository never persists it.
    #[must_use]
    pub fn ephemeral_new_tab() -> Self {
        Self::new_tab(Vec::new())
            .with_id(TabId::ephemeral())
            .with_state(TabState::Active)
    }

    /// Creates a split-view container titled after its children.
    pub fn split_view(child_tabs: Vec<Self>) -> Result<Self, ValidationError> {
        let content = SplitViewContent::new(child_tabs, SplitRatio::default())?;
        Ok(Self::new(content.joined_title(), TabKind::SplitView(content)))
    }

    /// Creates an agent creation wizard tab.
    #[must_use]
    pub fn create_new_agent(title: impl Into<String>) -> Self {
        Self::new(title, TabKind::CreateNewAgent(AgentWizardContent::default()))
    }

    /// Creates an agent definition editor tab.
    #[must_use]
    pub fn edit_agent_definition(
        title: impl Into<String>,
        agent_def_id: impl Into<String>,
    ) -> Self {
        Self::new(
            title,
            TabKind::EditAgentDefinition(AgentEditorContent {
                agent_def_id: agent_def_id.into(),
                step: 0,
            }),
        )
    }

    /// Creates an embedded wiki tab.
    #[must_use]
    pub fn wiki_embed(title: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        Self::new(
            title,
            TabKind::WikiEmbed(WikiEmbedContent {
                workspace_id: workspace_id.into(),
            }),
        )
    }

    /// Replaces the id.
    #[must_use]
    pub fn with_id(mut self, id: TabId) -> Self {
        self.id = id;
        self
    }

    /// Sets the activation state.
    #[must_use]
    pub const fn with_state(mut self, state: TabState) -> Self {
        self.state = state;
        self
    }

    /// Sets the pinned flag.
    #[must_use]
    pub const fn with_pinned(mut self, pinned: bool) -> Self {
        self.is_pinned = pinned;
        self
    }

    /// Sets the favicon of a web tab. Other variants are left unchanged.
    #[must_use]
    pub fn with_favicon(mut self, favicon: impl Into<String>) -> Self {
        if let TabKind::Web(content) = &mut self.kind {
            content.favicon = Some(favicon.into());
        }
        self
    }

    /// Deep copy under a fresh identity.
    ///
    /// Used whenever a tab moves into or out of a split view: the moved tab
    /// is a new tab, so no lingering reference to the old id can reach it.
    /// Timestamps restart and the copy is inactive.
    #[must_use]
    pub fn clone_with_new_id(&self) -> Self {
        let now = Utc::now();
        Self {
            id: TabId::new(),
            title: self.title.clone(),
            state: TabState::Inactive,
            is_pinned: self.is_pinned,
            created_at: now,
            updated_at: now,
            kind: self.kind.clone(),
        }
    }

    /// Returns the variant discriminator.
    #[must_use]
    pub const fn tab_type(&self) -> TabType {
        self.kind.tab_type()
    }

    /// Returns true if this tab is the active one.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Returns true for split-view containers.
    #[must_use]
    pub const fn is_split_view(&self) -> bool {
        matches!(self.kind, TabKind::SplitView(_))
    }

    /// Returns the split-view content, if this is a container.
    #[must_use]
    pub const fn split_view_content(&self) -> Option<&SplitViewContent> {
        match &self.kind {
            TabKind::SplitView(content) => Some(content),
            _ => None,
        }
    }

    /// Returns the embedded workspace id of a wiki tab.
    #[must_use]
    pub fn workspace_id(&self) -> Option<&str> {
        match &self.kind {
            TabKind::WikiEmbed(content) => Some(content.workspace_id.as_str()),
            _ => None,
        }
    }

    /// Whether closing this tab deletes it instead of moving it to history.
    ///
    /// New-tab pages and empty split views are trivially recreated, so they
    /// are never kept.
    #[must_use]
    pub fn is_hard_deleted_on_close(&self) -> bool {
        match &self.kind {
            TabKind::NewTab(_) => true,
            TabKind::SplitView(content) => content.is_empty(),
            _ => false,
        }
    }

    /// Applies shared and variant fields from a patch.
    ///
    /// Returns true if anything changed. `updated_at` is left to the caller.
    pub fn apply_patch(&mut self, patch: &TabPatch) -> Result<bool, ValidationError> {
        let mut changed = self.kind.apply_patch(patch)?;
        changed |= assign(&mut self.title, patch.title.as_ref());
        changed |= assign(&mut self.state, patch.state.as_ref());
        changed |= assign(&mut self.is_pinned, patch.is_pinned.as_ref());
        Ok(changed)
    }
}
