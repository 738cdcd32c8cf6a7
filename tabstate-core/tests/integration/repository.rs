//! Repository behaviour through the public API

use tabstate_core::models::WebContent;
use tabstate_core::{
    CloseDirection, CloseOutcome, MAX_CLOSED_TABS, Tab, TabError, TabId, TabKind, TabPatch,
    TabState,
};

use super::{active_web, memory_repository, open_titles, web};

#[tokio::test]
async fn history_keeps_only_the_most_recent_closes() {
    let (storage, repository) = memory_repository().await;
    let mut ids = Vec::new();
    for i in 0..12 {
        let tab = repository.add_tab(web(&format!("t{i}")), None).await.unwrap();
        ids.push(tab.id);
    }
    for id in &ids {
        assert_eq!(repository.close_tab(id).await.unwrap(), CloseOutcome::SoftClosed);
    }

    let closed = repository.get_closed_tabs(usize::MAX);
    assert_eq!(closed.len(), MAX_CLOSED_TABS);
    let titles: Vec<_> = closed.iter().map(|tab| tab.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["t11", "t10", "t9", "t8", "t7", "t6", "t5", "t4", "t3", "t2"]
    );

    // Evicted rows are gone from storage too
    assert_eq!(storage.dump().len(), MAX_CLOSED_TABS);
    assert!(storage.dump().iter().all(|record| !record.opened));
}

#[tokio::test]
async fn close_others_spares_pinned_tabs() {
    let (_, repository) = memory_repository().await;
    let a = repository.add_tab(web("A").with_pinned(true), None).await.unwrap();
    repository.add_tab(web("B"), None).await.unwrap();
    let c = repository.add_tab(active_web("C"), None).await.unwrap();
    repository.add_tab(web("D"), None).await.unwrap();

    let closed = repository.close_tabs(CloseDirection::Other, &c.id).await.unwrap();

    assert_eq!(closed, 2);
    assert_eq!(open_titles(&repository), vec!["A", "C"]);
    assert_eq!(repository.get_active_tab_id(), Some(c.id));
    assert!(repository.get_open_tab(&a.id).unwrap().is_pinned);
}

#[tokio::test]
async fn close_above_and_below_use_position_order() {
    let (_, repository) = memory_repository().await;
    for title in ["A", "B", "C", "D", "E"] {
        repository.add_tab(web(title), None).await.unwrap();
    }
    let c = repository.get_all_open_tabs()[2].clone();

    assert_eq!(repository.close_tabs(CloseDirection::Above, &c.id).await.unwrap(), 2);
    assert_eq!(open_titles(&repository), vec!["C", "D", "E"]);

    assert_eq!(repository.close_tabs(CloseDirection::Below, &c.id).await.unwrap(), 2);
    assert_eq!(open_titles(&repository), vec!["C"]);
}

#[tokio::test]
async fn restored_web_tab_keeps_its_content_and_becomes_active() {
    let (_, repository) = memory_repository().await;
    repository.add_tab(active_web("other"), None).await.unwrap();
    let docs = repository
        .add_tab(
            Tab::web("Docs", "https://docs.rs/tokio").with_favicon("https://docs.rs/favicon.ico"),
            None,
        )
        .await
        .unwrap();

    repository.close_tab(&docs.id).await.unwrap();
    let restored = repository.restore_closed_tab().await.unwrap().unwrap();

    assert_eq!(restored.id, docs.id);
    assert_eq!(
        restored.kind,
        TabKind::Web(WebContent {
            url: "https://docs.rs/tokio".to_string(),
            favicon: Some("https://docs.rs/favicon.ico".to_string()),
        })
    );
    assert_eq!(restored.state, TabState::Active);
    assert_eq!(repository.get_active_tab_id(), Some(docs.id));
    assert!(repository.get_closed_tabs(10).is_empty());
}

#[tokio::test]
async fn ephemeral_ids_are_silent_no_ops() {
    let (storage, repository) = memory_repository().await;
    let before = storage.stats();

    let placeholder = Tab::ephemeral_new_tab();
    let returned = repository.add_tab(placeholder.clone(), None).await.unwrap();
    assert_eq!(returned, placeholder);

    let patch = TabPatch::new().with_title("renamed");
    assert_eq!(repository.update_tab(&placeholder.id, &patch).await.unwrap(), None);
    assert_eq!(
        repository.close_tab(&placeholder.id).await.unwrap(),
        CloseOutcome::NotOpen
    );
    repository.set_active_tab(&placeholder.id).await.unwrap();
    repository.pin_tab(&placeholder.id, true).await.unwrap();

    assert_eq!(storage.stats(), before);
    assert!(repository.get_all_open_tabs().is_empty());
    assert_eq!(repository.snapshot().revision, 0);
}

#[tokio::test]
async fn unknown_ids_are_ignored() {
    let (_, repository) = memory_repository().await;
    repository.add_tab(active_web("A"), None).await.unwrap();
    let revision = repository.snapshot().revision;
    let missing = TabId::new();

    repository.set_active_tab(&missing).await.unwrap();
    assert_eq!(repository.close_tab(&missing).await.unwrap(), CloseOutcome::NotOpen);
    assert_eq!(
        repository
            .close_tabs(CloseDirection::Other, &missing)
            .await
            .unwrap(),
        0
    );
    assert_eq!(repository.snapshot().revision, revision);
}

#[tokio::test]
async fn failed_write_rolls_back_storage_and_state() {
    let (storage, repository) = memory_repository().await;
    let a = repository.add_tab(active_web("A"), None).await.unwrap();
    let b = repository.add_tab(web("B"), None).await.unwrap();
    let snapshot = repository.snapshot();
    let rows = storage.dump();

    // Activating B rewrites two rows; the second write fails
    storage.fail_write_after(1);
    let err = repository.set_active_tab(&b.id).await.unwrap_err();
    assert!(matches!(err, TabError::Storage(_)));

    assert_eq!(repository.snapshot(), snapshot);
    assert_eq!(repository.get_active_tab_id(), Some(a.id.clone()));
    assert_eq!(storage.dump(), rows);

    repository.set_active_tab(&b.id).await.unwrap();
    assert_eq!(repository.get_active_tab_id(), Some(b.id));
}

#[tokio::test]
async fn closing_active_tab_activates_the_previous_one() {
    let (_, repository) = memory_repository().await;
    let a = repository.add_tab(web("A"), None).await.unwrap();
    let b = repository.add_tab(active_web("B"), None).await.unwrap();
    repository.add_tab(web("C"), None).await.unwrap();

    repository.close_tab(&b.id).await.unwrap();
    assert_eq!(repository.get_active_tab_id(), Some(a.id.clone()));

    // With nothing before it, the first remaining tab takes over
    repository.close_tab(&a.id).await.unwrap();
    assert_eq!(
        repository.snapshot().active_tab().map(|tab| tab.title.clone()),
        Some("C".to_string())
    );
}

#[tokio::test]
async fn snapshots_reach_every_subscriber() {
    let (_, repository) = memory_repository().await;
    let mut first = repository.subscribe();
    let mut second = repository.subscribe();

    repository.add_tab(web("A"), None).await.unwrap();

    first.changed().await.unwrap();
    second.changed().await.unwrap();
    assert_eq!(first.borrow().revision, 1);
    assert_eq!(second.borrow().tabs.len(), 1);
}
