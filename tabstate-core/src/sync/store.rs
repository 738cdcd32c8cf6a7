//! Subscriber-side tab store

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::Stream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::TabResult;
use crate::models::{SplitRatio, Tab, TabId, TabPatch};
use crate::repository::{
    CloseDirection, CloseOutcome, MAX_CLOSED_TABS, TabRepository, TabSnapshot,
};
use crate::split::{RatioCommit, SplitViewEngine};

use super::state::ClientState;

/// A reactive view of the repository.
///
/// Reads come from the local [`ClientState`]; writes go to the repository
/// (or split-view engine) and the resulting snapshot replaces the local
/// view. A background listener applies snapshots produced by any other
/// writer and is stopped when the store is dropped.
#[derive(Debug)]
pub struct TabStore {
    repository: Arc<TabRepository>,
    engine: Arc<SplitViewEngine>,
    state: Arc<RwLock<ClientState>>,
    changes_tx: Arc<watch::Sender<u64>>,
    listener: JoinHandle<()>,
}

impl TabStore {
    /// Attaches a store to the engine's repository.
    ///
    /// Subscribes first, then seeds the state with a full fetch, so no
    /// write can fall between the two.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn attach(engine: Arc<SplitViewEngine>) -> Self {
        let repository = Arc::clone(engine.repository());
        let snapshots = repository.subscribe();
        let history = repository.subscribe_history();
        let commits = engine.ratio_commits();

        let mut seed = ClientState::default();
        seed.apply_snapshot(&repository.snapshot());
        seed.set_closed_tabs(repository.get_closed_tabs(MAX_CLOSED_TABS));
        tracing::debug!(
            revision = seed.revision(),
            open = seed.tabs().len(),
            "Tab store attached"
        );

        let state = Arc::new(RwLock::new(seed));
        let changes_tx = Arc::new(watch::Sender::new(0));
        let listener = tokio::spawn(listen(
            snapshots,
            history,
            commits,
            Arc::clone(&state),
            Arc::clone(&changes_tx),
        ));

        Self {
            repository,
            engine,
            state,
            changes_tx,
            listener,
        }
    }

    /// Open tabs ordered by position.
    #[must_use]
    pub fn tabs(&self) -> Vec<Tab> {
        self.read().tabs().as_ref().clone()
    }

    /// Open tabs, or a single ephemeral new-tab page when none are open.
    ///
    /// The placeholder is never persisted; operations on its id are no-ops.
    #[must_use]
    pub fn visible_tabs(&self) -> Vec<Tab> {
        let tabs = self.tabs();
        if tabs.is_empty() {
            vec![Tab::ephemeral_new_tab()]
        } else {
            tabs
        }
    }

    /// Id of the ACTIVE tab.
    #[must_use]
    pub fn active_tab_id(&self) -> Option<TabId> {
        self.read().active_tab_id().cloned()
    }

    /// Closed tabs, most recent first.
    #[must_use]
    pub fn closed_tabs(&self) -> Vec<Tab> {
        self.read().closed_tabs().to_vec()
    }

    /// Revision of the last applied snapshot.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.read().revision()
    }

    /// Ratio to display for a split view, preferring an unconfirmed local
    /// value over the committed one.
    #[must_use]
    pub fn effective_split_ratio(&self, split_view_id: &TabId) -> Option<SplitRatio> {
        self.read().effective_split_ratio(split_view_id)
    }

    /// A copy of the whole local state.
    #[must_use]
    pub fn state(&self) -> ClientState {
        self.read().clone()
    }

    /// Notifies on every local state change. Each item is a change counter.
    pub fn subscribe(&self) -> impl Stream<Item = u64> + Send + 'static {
        let rx = self.changes_tx.subscribe();
        futures::stream::unfold(rx, |mut rx| async move {
            rx.changed().await.ok()?;
            let counter = *rx.borrow_and_update();
            Some((counter, rx))
        })
    }

    /// See [`TabRepository::add_tab`].
    pub async fn add_tab(&self, tab: Tab, position: Option<usize>) -> TabResult<Tab> {
        let tab = self.repository.add_tab(tab, position).await?;
        self.sync_now();
        Ok(tab)
    }

    /// See [`TabRepository::update_tab`].
    pub async fn update_tab(&self, id: &TabId, patch: &TabPatch) -> TabResult<Option<Tab>> {
        let tab = self.repository.update_tab(id, patch).await?;
        self.sync_now();
        Ok(tab)
    }

    /// See [`TabRepository::set_active_tab`].
    pub async fn set_active_tab(&self, id: &TabId) -> TabResult<()> {
        self.repository.set_active_tab(id).await?;
        self.sync_now();
        Ok(())
    }

    /// See [`TabRepository::pin_tab`].
    pub async fn pin_tab(&self, id: &TabId, pinned: bool) -> TabResult<()> {
        self.repository.pin_tab(id, pinned).await?;
        self.sync_now();
        Ok(())
    }

    /// See [`TabRepository::close_tab`]. Refreshes the closed-tab list.
    pub async fn close_tab(&self, id: &TabId) -> TabResult<CloseOutcome> {
        let outcome = self.repository.close_tab(id).await?;
        self.sync_now();
        self.refresh_closed_tabs();
        Ok(outcome)
    }

    /// See [`TabRepository::close_tabs`]. Refreshes the closed-tab list.
    pub async fn close_tabs(&self, direction: CloseDirection, from_id: &TabId) -> TabResult<usize> {
        let closed = self.repository.close_tabs(direction, from_id).await?;
        self.sync_now();
        self.refresh_closed_tabs();
        Ok(closed)
    }

    /// See [`TabRepository::restore_closed_tab`]. Refreshes the closed-tab
    /// list.
    pub async fn restore_closed_tab(&self) -> TabResult<Option<Tab>> {
        let restored = self.repository.restore_closed_tab().await?;
        self.sync_now();
        self.refresh_closed_tabs();
        Ok(restored)
    }

    /// See [`SplitViewEngine::create_split_view_from_two_tabs`].
    pub async fn create_split_view_from_two_tabs(
        &self,
        active_id: &TabId,
        target_id: &TabId,
    ) -> TabResult<Option<Tab>> {
        let split = self
            .engine
            .create_split_view_from_two_tabs(active_id, target_id)
            .await?;
        self.sync_now();
        self.refresh_closed_tabs();
        Ok(split)
    }

    /// See [`SplitViewEngine::convert_to_split_view`].
    pub async fn convert_to_split_view(&self, tab_id: &TabId) -> TabResult<Option<Tab>> {
        let split = self.engine.convert_to_split_view(tab_id).await?;
        self.sync_now();
        self.refresh_closed_tabs();
        Ok(split)
    }

    /// See [`SplitViewEngine::add_tab_to_split_view`].
    pub async fn add_tab_to_split_view(
        &self,
        split_view_id: &TabId,
        tab_id: &TabId,
    ) -> TabResult<Option<Tab>> {
        let split = self
            .engine
            .add_tab_to_split_view(split_view_id, tab_id)
            .await?;
        self.sync_now();
        self.refresh_closed_tabs();
        Ok(split)
    }

    /// See [`SplitViewEngine::remove_from_split_view`].
    pub async fn remove_from_split_view(&self, tab_id: &TabId) -> TabResult<Option<Tab>> {
        let tab = self.engine.remove_from_split_view(tab_id).await?;
        self.sync_now();
        Ok(tab)
    }

    /// Shows a new ratio for the active split view at once and schedules
    /// its debounced write.
    ///
    /// Returns the clamped ratio, or `None` if the active tab is not a split
    /// view.
    pub fn update_split_ratio(&self, ratio: i64) -> Option<SplitRatio> {
        let (split_view_id, ratio) = self.engine.update_split_ratio(ratio)?;
        self.write().set_pending_ratio(split_view_id, ratio);
        self.notify();
        Some(ratio)
    }

    /// Applies the repository's current snapshot without waiting for the
    /// listener.
    fn sync_now(&self) {
        let snapshot = self.repository.snapshot();
        if self.write().apply_snapshot(&snapshot) {
            self.notify();
        }
    }

    fn refresh_closed_tabs(&self) {
        let closed = self.repository.get_closed_tabs(MAX_CLOSED_TABS);
        if self.write().set_closed_tabs(closed) {
            self.notify();
        }
    }

    fn notify(&self) {
        self.changes_tx.send_modify(|counter| *counter += 1);
    }

    fn read(&self) -> RwLockReadGuard<'_, ClientState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ClientState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TabStore {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Applies every published snapshot, history change and ratio commit until
/// a channel closes.
async fn listen(
    mut snapshots: watch::Receiver<TabSnapshot>,
    mut history: watch::Receiver<Arc<Vec<Tab>>>,
    mut commits: watch::Receiver<Option<RatioCommit>>,
    state: Arc<RwLock<ClientState>>,
    changes_tx: Arc<watch::Sender<u64>>,
) {
    loop {
        let changed = tokio::select! {
            result = snapshots.changed() => {
                if result.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                state
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .apply_snapshot(&snapshot)
            }
            result = history.changed() => {
                if result.is_err() {
                    break;
                }
                let closed: Vec<Tab> = history
                    .borrow_and_update()
                    .iter()
                    .take(MAX_CLOSED_TABS)
                    .cloned()
                    .collect();
                state
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .set_closed_tabs(closed)
            }
            result = commits.changed() => {
                if result.is_err() {
                    break;
                }
                let commit = commits.borrow_and_update().clone();
                commit.is_some_and(|commit| {
                    state
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .record_commit(&commit)
                })
            }
        };
        if changed {
            changes_tx.send_modify(|counter| *counter += 1);
        }
    }
    tracing::debug!("Tab store listener stopped");
}
