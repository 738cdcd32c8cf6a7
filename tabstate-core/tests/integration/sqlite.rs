//! Persistence across restarts with the SQLite backend

use std::sync::Arc;

use tabstate_core::config::{StorageBackend, StorageSettings};
use tabstate_core::models::TabRecord;
use tabstate_core::storage::TabStorage;
use tabstate_core::{
    ConfigManager, EngineSettings, SplitViewEngine, SqliteStorage, Tab, TabRepository, TabState,
};
use tempfile::TempDir;

use super::{active_web, web};

async fn open(dir: &TempDir) -> Arc<TabRepository> {
    let storage = SqliteStorage::open(dir.path().join("tabs.db")).unwrap();
    Arc::new(TabRepository::open(Arc::new(storage)).await.unwrap())
}

#[tokio::test]
async fn tabs_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    let (split_id, closed_id) = {
        let repository = open(&dir).await;
        let a = repository.add_tab(active_web("A"), None).await.unwrap();
        let b = repository.add_tab(web("B"), None).await.unwrap();
        let c = repository
            .add_tab(Tab::wiki_embed("Notes", "ws-1").with_pinned(true), None)
            .await
            .unwrap();
        let engine = SplitViewEngine::new(Arc::clone(&repository));
        let split = engine
            .create_split_view_from_two_tabs(&a.id, &b.id)
            .await
            .unwrap()
            .unwrap();
        repository.close_tab(&c.id).await.unwrap();
        (split.id, c.id)
    };

    let repository = open(&dir).await;
    let open_tabs = repository.get_all_open_tabs();
    assert_eq!(open_tabs.len(), 1);
    assert_eq!(open_tabs[0].id, split_id);
    assert_eq!(open_tabs[0].state, TabState::Active);
    assert_eq!(
        open_tabs[0].split_view_content().unwrap().child_tabs.len(),
        2
    );

    let closed: Vec<_> = repository
        .get_closed_tabs(10)
        .into_iter()
        .map(|tab| tab.id)
        .collect();
    assert_eq!(closed.first(), Some(&closed_id));
    assert_eq!(closed.len(), 3);
}

#[tokio::test]
async fn startup_repairs_conflicting_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tabs.db");
    {
        let storage = SqliteStorage::open(&path).unwrap();
        let older = active_web("older");
        let mut newer = active_web("newer");
        newer.updated_at = older.updated_at + chrono::Duration::seconds(5);
        for (tab, position) in [(&older, 4), (&newer, 9)] {
            let record = TabRecord::encode(tab, true, position, None).unwrap();
            storage.insert(&record).await.unwrap();
        }
    }

    let storage = Arc::new(SqliteStorage::open(&path).unwrap());
    let repository = TabRepository::open(storage.clone()).await.unwrap();
    let tabs = repository.get_all_open_tabs();
    let titles: Vec<_> = tabs.iter().map(|tab| tab.title.as_str()).collect();
    assert_eq!(titles, vec!["older", "newer"]);
    assert_eq!(
        repository.snapshot().active_tab().map(|tab| tab.title.clone()),
        Some("newer".to_string())
    );

    // Repairs were written back
    let stored = storage
        .find(&tabstate_core::RecordQuery::open_tabs())
        .await
        .unwrap();
    let positions: Vec<_> = stored.iter().map(|record| record.position).collect();
    assert_eq!(positions, vec![0, 1]);
    assert_eq!(
        stored.iter().filter(|record| record.state == TabState::Active).count(),
        1
    );
}

#[tokio::test]
async fn repository_opens_from_saved_settings() {
    let dir = TempDir::new().unwrap();
    let manager = ConfigManager::with_config_dir(dir.path().join("config"));
    let mut settings = EngineSettings::default();
    settings.storage = StorageSettings {
        backend: StorageBackend::Sqlite,
        path: Some(dir.path().join("data").join("tabs.db")),
    };
    settings.history.max_closed_tabs = 2;
    manager.save_settings(&settings).unwrap();

    let loaded = manager.load_settings().unwrap();
    let repository = TabRepository::from_settings(&loaded).await.unwrap();
    for title in ["A", "B", "C"] {
        let tab = repository.add_tab(web(title), None).await.unwrap();
        repository.close_tab(&tab.id).await.unwrap();
    }

    assert_eq!(repository.get_closed_tabs(10).len(), 2);
    assert!(dir.path().join("data").join("tabs.db").exists());
}

#[tokio::test]
async fn unreadable_rows_are_skipped_on_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tabs.db");
    let (good, bad) = {
        let repository = open(&dir).await;
        let good = repository.add_tab(active_web("good"), None).await.unwrap();
        let bad = repository.add_tab(web("bad"), None).await.unwrap();
        (good, bad)
    };
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute(
            "UPDATE tabs SET state = 'bogus' WHERE id = ?1",
            [bad.id.as_str()],
        )
        .unwrap();
    }

    let repository = open(&dir).await;

    let open_ids: Vec<_> = repository
        .get_all_open_tabs()
        .into_iter()
        .map(|tab| tab.id)
        .collect();
    assert_eq!(open_ids, vec![good.id.clone()]);
    assert_eq!(repository.get_active_tab_id(), Some(good.id));
}
