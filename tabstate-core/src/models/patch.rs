//! Partial tab updates

use serde::{Deserialize, Serialize};

use super::content::Favorite;
use super::tab::Tab;
use super::types::TabState;

/// A set of fields to merge into an open tab.
///
/// Shared fields (`title`, `state`, `is_pinned`) apply to every tab. The
/// remaining fields only apply to the variants that carry them and are
/// silently ignored elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabPatch {
    /// New title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New activation state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<TabState>,
    /// New pinned flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_pinned: Option<bool>,
    /// Web: URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Web: favicon (`Some(None)` clears it)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<Option<String>>,
    /// Chat: agent instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Chat, wizard, editor: agent definition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_def_id: Option<String>,
    /// NewTab: favorites
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorites: Option<Vec<Favorite>>,
    /// SplitView: embedded tabs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_tabs: Option<Vec<Tab>>,
    /// SplitView: ratio, validated against the allowed range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_ratio: Option<i64>,
    /// Wizard, editor: step index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<u32>,
    /// WikiEmbed: workspace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
}

impl TabPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the activation state
    #[must_use]
    pub const fn with_state(mut self, state: TabState) -> Self {
        self.state = Some(state);
        self
    }

    /// Sets the pinned flag
    #[must_use]
    pub const fn with_pinned(mut self, pinned: bool) -> Self {
        self.is_pinned = Some(pinned);
        self
    }

    /// Sets the URL
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets or clears the favicon
    #[must_use]
    pub fn with_favicon(mut self, favicon: Option<String>) -> Self {
        self.favicon = Some(favicon);
        self
    }

    /// Sets the agent instance id
    #[must_use]
    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Sets the agent definition id
    #[must_use]
    pub fn with_agent_def_id(mut self, agent_def_id: impl Into<String>) -> Self {
        self.agent_def_id = Some(agent_def_id.into());
        self
    }

    /// Sets the favorites list
    #[must_use]
    pub fn with_favorites(mut self, favorites: Vec<Favorite>) -> Self {
        self.favorites = Some(favorites);
        self
    }

    /// Sets the embedded child tabs
    #[must_use]
    pub fn with_child_tabs(mut self, child_tabs: Vec<Tab>) -> Self {
        self.child_tabs = Some(child_tabs);
        self
    }

    /// Sets the split ratio
    #[must_use]
    pub const fn with_split_ratio(mut self, ratio: i64) -> Self {
        self.split_ratio = Some(ratio);
        self
    }

    /// Sets the wizard step
    #[must_use]
    pub const fn with_step(mut self, step: u32) -> Self {
        self.step = Some(step);
        self
    }

    /// Sets the workspace id
    #[must_use]
    pub fn with_workspace_id(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }

    /// Returns true if the patch changes the pinned flag.
    #[must_use]
    pub const fn touches_pin(&self) -> bool {
        self.is_pinned.is_some()
    }

    /// Returns true if the patch activates the tab.
    #[must_use]
    pub fn activates(&self) -> bool {
        self.state.is_some_and(TabState::is_active)
    }
}
