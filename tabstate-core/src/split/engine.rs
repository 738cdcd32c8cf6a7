//! Split-view composition
//!
//! Every operation is built from repository primitives. Tabs moving into or
//! out of a container are copied with [`Tab::clone_with_new_id`], so a child
//! never shares an id with an open tab.

use std::sync::Arc;

use crate::config::SplitViewSettings;
use crate::error::{TabResult, ValidationError};
use crate::models::{
    SplitRatio, SplitViewContent, Tab, TabId, TabKind, TabPatch, TabState, MAX_SPLIT_CHILDREN,
};
use crate::repository::{TabRepository, TabSnapshot};

use super::debounce::{RatioCommit, SplitRatioDebouncer};

/// Builds and edits split-view containers.
#[derive(Debug)]
pub struct SplitViewEngine {
    repository: Arc<TabRepository>,
    default_ratio: SplitRatio,
    debouncer: SplitRatioDebouncer,
}

impl SplitViewEngine {
    /// Creates an engine with the default timings (300 ms quiet window,
    /// 1000 ms hard cap) and a 50% default ratio.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn new(repository: Arc<TabRepository>) -> Self {
        Self::with_settings(repository, &SplitViewSettings::default())
    }

    /// Creates an engine from the `[split_view]` settings.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn with_settings(repository: Arc<TabRepository>, settings: &SplitViewSettings) -> Self {
        let debouncer = SplitRatioDebouncer::spawn(
            Arc::clone(&repository),
            settings.debounce(),
            settings.max_wait(),
        );
        Self {
            repository,
            default_ratio: SplitRatio::clamped(settings.default_ratio),
            debouncer,
        }
    }

    /// The repository this engine writes to.
    #[must_use]
    pub fn repository(&self) -> &Arc<TabRepository> {
        &self.repository
    }

    /// Outcomes of debounced ratio writes.
    #[must_use]
    pub fn ratio_commits(&self) -> tokio::sync::watch::Receiver<Option<RatioCommit>> {
        self.debouncer.commits()
    }

    /// Merges two open tabs into a new ACTIVE split view.
    ///
    /// The container takes the active tab's position; both originals are
    /// closed. Returns `None` (and changes nothing) if either tab is missing,
    /// both ids are the same, or either is already a split view.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    #[tracing::instrument(name = "split.create", skip_all, fields(tab_id = %active_id, target_id = %target_id))]
    pub async fn create_split_view_from_two_tabs(
        &self,
        active_id: &TabId,
        target_id: &TabId,
    ) -> TabResult<Option<Tab>> {
        if active_id == target_id {
            tracing::debug!("Cannot split a tab with itself");
            return Ok(None);
        }
        let snapshot = self.repository.snapshot();
        let (Some(active), Some(target)) = (
            mergeable(&snapshot, active_id),
            mergeable(&snapshot, target_id),
        ) else {
            return Ok(None);
        };
        let position = snapshot.position_of(active_id);

        let children = vec![active.clone_with_new_id(), target.clone_with_new_id()];
        let container = self.container(children, false)?;
        let container = self.repository.add_tab(container, position).await?;

        self.repository.close_tab(active_id).await?;
        self.repository.close_tab(target_id).await?;
        self.repository.set_active_tab(&container.id).await?;
        tracing::info!(split_view_id = %container.id, "Created split view");
        Ok(self.repository.get_open_tab(&container.id))
    }

    /// Wraps one open tab in a new ACTIVE split view at its position.
    ///
    /// The container keeps the tab's pinned flag.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    #[tracing::instrument(name = "split.create", skip_all, fields(tab_id = %tab_id))]
    pub async fn convert_to_split_view(&self, tab_id: &TabId) -> TabResult<Option<Tab>> {
        let snapshot = self.repository.snapshot();
        let Some(tab) = mergeable(&snapshot, tab_id) else {
            return Ok(None);
        };
        let position = snapshot.position_of(tab_id);

        let container = self.container(vec![tab.clone_with_new_id()], tab.is_pinned)?;
        let container = self.repository.add_tab(container, position).await?;
        self.repository.close_tab(tab_id).await?;
        self.repository.set_active_tab(&container.id).await?;
        Ok(self.repository.get_open_tab(&container.id))
    }

    /// Moves an open tab into a split view.
    ///
    /// With two children already present the second one is replaced;
    /// otherwise the tab is appended. The source tab is closed afterwards,
    /// and if it was the ACTIVE tab the container becomes active.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the source tab is itself a split view,
    /// or a storage error.
    #[tracing::instrument(name = "split.add_child", skip_all, fields(split_view_id = %split_view_id, tab_id = %tab_id))]
    pub async fn add_tab_to_split_view(
        &self,
        split_view_id: &TabId,
        tab_id: &TabId,
    ) -> TabResult<Option<Tab>> {
        let snapshot = self.repository.snapshot();
        let Some(content) = snapshot
            .get(split_view_id)
            .and_then(Tab::split_view_content)
        else {
            tracing::debug!("Target is not an open split view");
            return Ok(None);
        };
        if content.contains(tab_id) {
            return Ok(None);
        }
        let Some(source) = snapshot.get(tab_id) else {
            tracing::warn!("Source tab is not open, ignoring");
            return Ok(None);
        };
        if source.is_split_view() {
            return Err(ValidationError::NestedSplitView.into());
        }

        let mut children = content.child_tabs.clone();
        let child = source.clone_with_new_id();
        if children.len() >= MAX_SPLIT_CHILDREN {
            children[MAX_SPLIT_CHILDREN - 1] = child;
        } else {
            children.push(child);
        }
        let title = SplitViewContent::title_for(&children);
        let source_was_active = source.is_active();

        let patch = TabPatch::new()
            .with_child_tabs(children)
            .with_title(title);
        let updated = self.repository.update_tab(split_view_id, &patch).await?;
        if updated.is_none() {
            return Ok(None);
        }
        self.repository.close_tab(tab_id).await?;
        if source_was_active {
            self.repository.set_active_tab(split_view_id).await?;
        }
        Ok(self.repository.get_open_tab(split_view_id))
    }

    /// Takes a child out of its split view and reopens it as a standalone
    /// INACTIVE tab (fresh id) right after the container.
    ///
    /// Returns the new standalone tab, or `None` if no open split view holds
    /// `tab_id`. The container stays where it is and keeps its state.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    #[tracing::instrument(name = "split.remove_child", skip_all, fields(tab_id = %tab_id))]
    pub async fn remove_from_split_view(&self, tab_id: &TabId) -> TabResult<Option<Tab>> {
        let Some(container) = self.repository.find_split_view_containing(tab_id) else {
            tracing::debug!("No split view holds this tab");
            return Ok(None);
        };
        let Some(content) = container.split_view_content() else {
            return Ok(None);
        };

        let mut children = content.child_tabs.clone();
        let Some(index) = children.iter().position(|child| &child.id == tab_id) else {
            return Ok(None);
        };
        let removed = children.remove(index);
        let title = SplitViewContent::title_for(&children);

        let patch = TabPatch::new()
            .with_child_tabs(children)
            .with_title(title);
        if self
            .repository
            .update_tab(&container.id, &patch)
            .await?
            .is_none()
        {
            return Ok(None);
        }

        let standalone = removed.clone_with_new_id().with_state(TabState::Inactive);
        let position = self
            .repository
            .snapshot()
            .position_of(&container.id)
            .map(|p| p + 1);
        let standalone = self.repository.add_tab(standalone, position).await?;
        tracing::info!(
            split_view_id = %container.id,
            new_tab_id = %standalone.id,
            "Removed tab from split view"
        );
        Ok(Some(standalone))
    }

    /// Clamps a ratio and queues it for the ACTIVE split view.
    ///
    /// Returns the clamped ratio and the container it applies to, or `None`
    /// if the active tab is not a split view. The write itself is debounced;
    /// callers reflect the value locally in the meantime.
    pub fn update_split_ratio(&self, ratio: i64) -> Option<(TabId, SplitRatio)> {
        let ratio = SplitRatio::clamped(ratio);
        let snapshot = self.repository.snapshot();
        let active = snapshot.active_tab().filter(|tab| tab.is_split_view())?;
        self.debouncer.schedule(active.id.clone(), ratio);
        Some((active.id.clone(), ratio))
    }

    /// Writes a ratio to a split view immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn persist_split_ratio(
        &self,
        split_view_id: &TabId,
        ratio: i64,
    ) -> TabResult<Option<Tab>> {
        persist_ratio(&self.repository, split_view_id, SplitRatio::clamped(ratio)).await
    }

    fn container(&self, children: Vec<Tab>, pinned: bool) -> TabResult<Tab> {
        let title = SplitViewContent::title_for(&children);
        let content = SplitViewContent::new(children, self.default_ratio)?;
        Ok(Tab::new(title, TabKind::SplitView(content))
            .with_state(TabState::Active)
            .with_pinned(pinned))
    }
}

/// An open tab that may become a split-view child.
fn mergeable<'a>(snapshot: &'a TabSnapshot, id: &TabId) -> Option<&'a Tab> {
    match snapshot.get(id) {
        Some(tab) if tab.is_split_view() => {
            tracing::debug!(tab_id = %id, "Split views cannot be nested");
            None
        }
        Some(tab) => Some(tab),
        None => {
            tracing::warn!(tab_id = %id, "Tab is not open, ignoring");
            None
        }
    }
}

/// Writes a clamped ratio to a split view, if it is still open.
#[tracing::instrument(name = "split.ratio", skip_all, fields(split_view_id = %split_view_id, ratio = ratio.value()))]
pub(super) async fn persist_ratio(
    repository: &TabRepository,
    split_view_id: &TabId,
    ratio: SplitRatio,
) -> TabResult<Option<Tab>> {
    let is_split_view = repository
        .get_open_tab(split_view_id)
        .is_some_and(|tab| tab.is_split_view());
    if !is_split_view {
        tracing::debug!("Split view closed before its ratio was written");
        return Ok(None);
    }
    let patch = TabPatch::new().with_split_ratio(i64::from(ratio.value()));
    repository.update_tab(split_view_id, &patch).await
}
