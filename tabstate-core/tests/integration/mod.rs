//! Shared fixtures for the integration tests

mod chat;
mod repository;
mod split_view;
mod sqlite;

use std::sync::Arc;

use tabstate_core::{MemoryStorage, Tab, TabRepository, TabState};

/// A repository over a fresh in-memory table.
pub async fn memory_repository() -> (Arc<MemoryStorage>, Arc<TabRepository>) {
    let storage = Arc::new(MemoryStorage::new());
    let repository = TabRepository::open(storage.clone())
        .await
        .expect("open repository");
    (storage, Arc::new(repository))
}

/// An inactive web tab titled `title`.
pub fn web(title: &str) -> Tab {
    Tab::web(title, format!("https://{title}.test"))
}

/// An ACTIVE web tab titled `title`.
pub fn active_web(title: &str) -> Tab {
    web(title).with_state(TabState::Active)
}

/// Titles of the open tabs in position order.
pub fn open_titles(repository: &TabRepository) -> Vec<String> {
    repository
        .get_all_open_tabs()
        .into_iter()
        .map(|tab| tab.title)
        .collect()
}
