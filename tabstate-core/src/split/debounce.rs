//! Debounced split-ratio persistence
//!
//! Dragging a divider produces a burst of ratio updates. Only the last value
//! of each burst is written: the worker waits for a quiet window, but never
//! longer than a hard cap after the first value of the burst.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::models::{SplitRatio, TabId};
use crate::repository::TabRepository;

use super::engine::persist_ratio;

/// A ratio waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRatioWrite {
    /// Split view the ratio belongs to
    pub split_view_id: TabId,
    /// Clamped ratio
    pub ratio: SplitRatio,
}

/// Result of one debounced write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatioCommit {
    /// Split view the ratio was written to
    pub split_view_id: TabId,
    /// Ratio that was written
    pub ratio: SplitRatio,
    /// Repository revision that contains the write; `None` if it failed or
    /// the split view was gone
    pub revision: Option<u64>,
}

/// Coalesces ratio updates into one write per burst.
#[derive(Debug)]
pub struct SplitRatioDebouncer {
    pending_tx: watch::Sender<Option<PendingRatioWrite>>,
    commits_tx: Arc<watch::Sender<Option<RatioCommit>>>,
}

impl SplitRatioDebouncer {
    /// Spawns the persistence worker.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn spawn(repository: Arc<TabRepository>, quiet: Duration, max_wait: Duration) -> Self {
        let (pending_tx, pending_rx) = watch::channel(None);
        let commits_tx = Arc::new(watch::Sender::new(None));

        let commits = Arc::clone(&commits_tx);
        tokio::spawn(debounce_worker(
            pending_rx,
            quiet,
            max_wait,
            move |write: PendingRatioWrite| {
                let repository = Arc::clone(&repository);
                let commits = Arc::clone(&commits);
                async move {
                    let revision =
                        match persist_ratio(&repository, &write.split_view_id, write.ratio).await {
                            Ok(Some(_)) => Some(repository.snapshot().revision),
                            Ok(None) => None,
                            Err(e) => {
                                tracing::error!(
                                    split_view_id = %write.split_view_id,
                                    error = %e,
                                    "Failed to persist split ratio"
                                );
                                None
                            }
                        };
                    commits.send_replace(Some(RatioCommit {
                        split_view_id: write.split_view_id,
                        ratio: write.ratio,
                        revision,
                    }));
                }
            },
        ));

        Self {
            pending_tx,
            commits_tx,
        }
    }

    /// Queues a ratio; it replaces any value not yet written.
    pub fn schedule(&self, split_view_id: TabId, ratio: SplitRatio) {
        self.pending_tx.send_replace(Some(PendingRatioWrite {
            split_view_id,
            ratio,
        }));
    }

    /// Receives the outcome of every debounced write.
    #[must_use]
    pub fn commits(&self) -> watch::Receiver<Option<RatioCommit>> {
        self.commits_tx.subscribe()
    }
}

/// Waits for changes, then for `quiet` without further changes (at most
/// `max_wait` in total), then saves the latest value. A value still pending
/// when the sender goes away is saved before the worker exits.
async fn debounce_worker<T, F, Fut>(
    mut rx: watch::Receiver<Option<T>>,
    quiet: Duration,
    max_wait: Duration,
    save_fn: F,
) where
    T: Clone + Send + Sync + 'static,
    F: Fn(T) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    loop {
        if rx.changed().await.is_err() {
            break;
        }

        let deadline = Instant::now() + max_wait;
        let mut closed = false;
        loop {
            tokio::select! {
                result = rx.changed() => {
                    if result.is_err() {
                        closed = true;
                        break;
                    }
                }
                () = tokio::time::sleep(quiet) => break,
                () = tokio::time::sleep_until(deadline) => break,
            }
        }

        let latest = rx.borrow_and_update().clone();
        if let Some(value) = latest {
            save_fn(value).await;
        }
        if closed {
            break;
        }
    }
}
