//! Variant-specific tab content
//!
//! Every tab variant keeps the fields that are not common to all tabs in
//! its own struct. These structs are what ends up in the persisted payload
//! blob.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::tab::Tab;

/// Smallest allowed split ratio (percent of the first pane).
pub const MIN_SPLIT_RATIO: u8 = 20;

/// Largest allowed split ratio (percent of the first pane).
pub const MAX_SPLIT_RATIO: u8 = 80;

/// Ratio given to newly created split views.
pub const DEFAULT_SPLIT_RATIO: u8 = 50;

/// Title of a split view with no children.
pub const EMPTY_SPLIT_VIEW_TITLE: &str = "Split View";

/// Maximum number of tabs a split view can hold.
pub const MAX_SPLIT_CHILDREN: usize = 2;

/// Width of the first split-view pane as an integer percentage.
///
/// A `SplitRatio` is always within [`MIN_SPLIT_RATIO`]..=[`MAX_SPLIT_RATIO`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct SplitRatio(u8);

impl SplitRatio {
    /// Creates a ratio, clamping the value into the allowed range.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        let clamped = value.clamp(i64::from(MIN_SPLIT_RATIO), i64::from(MAX_SPLIT_RATIO));
        Self(clamped as u8)
    }

    /// Creates a ratio, rejecting values outside the allowed range.
    pub fn try_new(value: i64) -> Result<Self, ValidationError> {
        if (i64::from(MIN_SPLIT_RATIO)..=i64::from(MAX_SPLIT_RATIO)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::SplitRatioOutOfRange(value))
        }
    }

    /// Returns the percentage value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl Default for SplitRatio {
    fn default() -> Self {
        Self(DEFAULT_SPLIT_RATIO)
    }
}

impl TryFrom<i64> for SplitRatio {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<SplitRatio> for i64 {
    fn from(ratio: SplitRatio) -> Self {
        Self::from(ratio.0)
    }
}

/// Web page tab content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebContent {
    /// Page URL
    pub url: String,
    /// Favicon URL, if known
    #[serde(default)]
    pub favicon: Option<String>,
}

/// Chat tab content. Both ids are owned by the agent collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatContent {
    /// Agent instance the chat talks to
    pub agent_id: String,
    /// Definition the agent was created from
    pub agent_def_id: String,
}

/// Shortcut shown on the new-tab page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    /// Favorite identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Target URL
    pub url: String,
    /// Favicon URL, if known
    #[serde(default)]
    pub favicon: Option<String>,
}

impl Favorite {
    /// Creates a favorite without a favicon.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            favicon: None,
        }
    }
}

/// New-tab page content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTabContent {
    /// Ordered shortcuts
    #[serde(default)]
    pub favorites: Vec<Favorite>,
}

/// Split-view container content.
///
/// Child tabs are embedded by value. They are never open rows of their own
/// while they live here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitViewContent {
    /// Zero, one or two embedded tabs
    #[serde(default)]
    pub child_tabs: Vec<Tab>,
    /// Width of the first pane
    #[serde(default)]
    pub split_ratio: SplitRatio,
}

impl SplitViewContent {
    /// Creates a container for the given children.
    pub fn new(child_tabs: Vec<Tab>, split_ratio: SplitRatio) -> Result<Self, ValidationError> {
        Self::validate_children(&child_tabs)?;
        Ok(Self {
            child_tabs,
            split_ratio,
        })
    }

    /// Checks the child count and rejects nested split views.
    pub fn validate_children(child_tabs: &[Tab]) -> Result<(), ValidationError> {
        if child_tabs.len() > MAX_SPLIT_CHILDREN {
            return Err(ValidationError::TooManyChildTabs(child_tabs.len()));
        }
        if child_tabs.iter().any(Tab::is_split_view) {
            return Err(ValidationError::NestedSplitView);
        }
        Ok(())
    }

    /// Returns true if a child with this id is embedded.
    #[must_use]
    pub fn contains(&self, id: &super::TabId) -> bool {
        self.child_tabs.iter().any(|child| &child.id == id)
    }

    /// Returns true if no child is embedded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.child_tabs.is_empty()
    }

    /// Container title: the children's titles joined with `" | "`.
    #[must_use]
    pub fn joined_title(&self) -> String {
        Self::title_for(&self.child_tabs)
    }

    /// Title a container holding `children` gets. Falls back to
    /// [`EMPTY_SPLIT_VIEW_TITLE`] when there are none.
    #[must_use]
    pub fn title_for(children: &[Tab]) -> String {
        if children.is_empty() {
            return EMPTY_SPLIT_VIEW_TITLE.to_string();
        }
        children
            .iter()
            .map(|child| child.title.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Agent creation wizard content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentWizardContent {
    /// Draft definition id, once the wizard saved one
    #[serde(default)]
    pub agent_def_id: Option<String>,
    /// Current wizard step index
    #[serde(default)]
    pub step: u32,
}

/// Agent definition editor content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentEditorContent {
    /// Definition being edited
    pub agent_def_id: String,
    /// Current editor step index
    #[serde(default)]
    pub step: u32,
}

/// Embedded wiki workspace content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiEmbedContent {
    /// Workspace shown by the embedded view collaborator
    pub workspace_id: String,
}
