//! Split-view composition and ratio persistence

use std::sync::Arc;
use std::time::Duration;

use tabstate_core::{SplitViewEngine, Tab, TabError, TabPatch, TabState, ValidationError};

use super::{active_web, memory_repository, open_titles, web};

#[tokio::test]
async fn split_round_trip_restores_standalone_content() {
    let (_, repository) = memory_repository().await;
    let a = repository.add_tab(active_web("A"), None).await.unwrap();
    let b = repository.add_tab(web("B"), None).await.unwrap();
    let engine = SplitViewEngine::new(Arc::clone(&repository));

    let split = engine
        .create_split_view_from_two_tabs(&a.id, &b.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(split.title, "A | B");
    assert_eq!(open_titles(&repository), vec!["A | B"]);
    assert_eq!(repository.get_active_tab_id(), Some(split.id.clone()));

    let children = split.split_view_content().unwrap().child_tabs.clone();
    assert_eq!(children.len(), 2);
    assert!(children.iter().all(|child| child.id != a.id && child.id != b.id));

    let standalone = engine
        .remove_from_split_view(&children[1].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(standalone.kind, b.kind);
    assert_ne!(standalone.id, b.id);
    assert_ne!(standalone.id, children[1].id);
    assert_eq!(standalone.state, TabState::Inactive);

    let container = repository.get_open_tab(&split.id).unwrap();
    let content = container.split_view_content().unwrap();
    assert_eq!(content.child_tabs.len(), 1);
    assert_eq!(content.child_tabs[0].kind, a.kind);
    assert_eq!(container.title, "A");
    assert_eq!(open_titles(&repository), vec!["A", "B"]);
    assert_eq!(repository.get_active_tab_id(), Some(split.id));
}

#[tokio::test]
async fn merged_originals_can_be_restored_from_history() {
    let (_, repository) = memory_repository().await;
    let a = repository.add_tab(active_web("A"), None).await.unwrap();
    let b = repository.add_tab(web("B"), None).await.unwrap();
    let engine = SplitViewEngine::new(Arc::clone(&repository));
    engine
        .create_split_view_from_two_tabs(&a.id, &b.id)
        .await
        .unwrap();

    let closed: Vec<_> = repository
        .get_closed_tabs(10)
        .into_iter()
        .map(|tab| tab.id)
        .collect();
    assert_eq!(closed, vec![b.id, a.id]);
}

#[tokio::test]
async fn split_views_cannot_be_nested() {
    let (_, repository) = memory_repository().await;
    let a = repository.add_tab(active_web("A"), None).await.unwrap();
    let b = repository.add_tab(web("B"), None).await.unwrap();
    let c = repository.add_tab(web("C"), None).await.unwrap();
    let engine = SplitViewEngine::new(Arc::clone(&repository));

    let outer = engine.convert_to_split_view(&c.id).await.unwrap().unwrap();
    let inner = engine
        .create_split_view_from_two_tabs(&a.id, &b.id)
        .await
        .unwrap()
        .unwrap();

    let err = engine
        .add_tab_to_split_view(&outer.id, &inner.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TabError::Validation(ValidationError::NestedSplitView)
    ));
    assert!(
        engine
            .create_split_view_from_two_tabs(&outer.id, &inner.id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn ratio_is_clamped() {
    let (_, repository) = memory_repository().await;
    let a = repository.add_tab(active_web("A"), None).await.unwrap();
    let engine = SplitViewEngine::new(Arc::clone(&repository));
    let split = engine.convert_to_split_view(&a.id).await.unwrap().unwrap();

    assert_eq!(engine.update_split_ratio(5).map(|(_, r)| r.value()), Some(20));
    assert_eq!(engine.update_split_ratio(95).map(|(_, r)| r.value()), Some(80));

    let stored = engine.persist_split_ratio(&split.id, 5).await.unwrap().unwrap();
    assert_eq!(stored.split_view_content().unwrap().split_ratio.value(), 20);
    let stored = engine.persist_split_ratio(&split.id, 95).await.unwrap().unwrap();
    assert_eq!(stored.split_view_content().unwrap().split_ratio.value(), 80);
}

#[tokio::test(start_paused = true)]
async fn ratio_burst_is_written_once() {
    let (storage, repository) = memory_repository().await;
    let a = repository.add_tab(active_web("A"), None).await.unwrap();
    let b = repository.add_tab(web("B"), None).await.unwrap();
    let engine = SplitViewEngine::new(Arc::clone(&repository));
    let split = engine
        .create_split_view_from_two_tabs(&a.id, &b.id)
        .await
        .unwrap()
        .unwrap();
    let updates_before = storage.stats().updates;

    for _ in 0..5 {
        let scheduled = engine.update_split_ratio(55);
        assert_eq!(scheduled.map(|(_, r)| r.value()), Some(55));
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    // Nothing is written inside the quiet window
    assert_eq!(storage.stats().updates, updates_before);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(storage.stats().updates - updates_before, 1);
    let committed = repository.get_open_tab(&split.id).unwrap();
    assert_eq!(committed.split_view_content().unwrap().split_ratio.value(), 55);

    let commit = engine.ratio_commits().borrow().clone().unwrap();
    assert_eq!(commit.split_view_id, split.id);
    assert_eq!(commit.revision, Some(repository.snapshot().revision));
}

#[tokio::test]
async fn split_view_embedding_itself_is_rejected() {
    let (storage, repository) = memory_repository().await;
    let a = web("A");
    let writes = storage.stats().writes();

    let own_id = Tab::split_view(vec![a.clone()]).unwrap().with_id(a.id.clone());
    let err = repository.add_tab(own_id, None).await.unwrap_err();

    assert!(matches!(
        err,
        TabError::Validation(ValidationError::EmbeddedTabConflict(ref id)) if *id == a.id
    ));
    assert!(repository.get_all_open_tabs().is_empty());
    assert_eq!(storage.stats().writes(), writes);

    // Same through a patch on an open container
    let split = repository
        .add_tab(Tab::split_view(vec![web("B")]).unwrap(), None)
        .await
        .unwrap();
    let patch = TabPatch::new().with_child_tabs(vec![web("C").with_id(split.id.clone())]);
    let err = repository.update_tab(&split.id, &patch).await.unwrap_err();
    assert!(matches!(
        err,
        TabError::Validation(ValidationError::EmbeddedTabConflict(ref id)) if *id == split.id
    ));
    assert_eq!(repository.get_open_tab(&split.id), Some(split));
}

#[tokio::test]
async fn restoring_split_view_reidentifies_children_opened_meanwhile() {
    let (_, repository) = memory_repository().await;
    let a = repository.add_tab(active_web("A"), None).await.unwrap();
    let engine = SplitViewEngine::new(Arc::clone(&repository));
    let split = engine.convert_to_split_view(&a.id).await.unwrap().unwrap();
    let child = split.split_view_content().unwrap().child_tabs[0].clone();

    repository.close_tab(&split.id).await.unwrap();
    let reopened_child = repository.add_tab(child.clone(), None).await.unwrap();
    assert_eq!(reopened_child.id, child.id);

    let restored = repository.restore_closed_tab().await.unwrap().unwrap();

    assert_eq!(restored.id, split.id);
    let embedded = &restored.split_view_content().unwrap().child_tabs[0];
    assert_ne!(embedded.id, child.id);
    assert_eq!(embedded.kind, child.kind);
    assert!(repository.get_open_tab(&child.id).is_some());
    assert_eq!(repository.get_open_tab(&split.id), Some(restored));
    assert_eq!(repository.get_active_tab_id(), Some(split.id));
}
