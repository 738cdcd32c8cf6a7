//! Snapshot synchronization
//!
//! The repository publishes a [`TabSnapshot`](crate::repository::TabSnapshot)
//! after every committed write. A [`TabStore`] subscribes, seeds itself with
//! one full fetch and then replaces its view with every snapshot it
//! receives. The split ratio is the only field a store changes locally
//! ahead of the repository.

mod state;
mod store;

pub use state::{ClientState, PendingRatio};
pub use store::TabStore;
