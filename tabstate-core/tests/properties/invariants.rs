//! Table invariants over arbitrary operation sequences
//!
//! **Properties:** single ACTIVE tab, dense pinned-first positions, bounded
//! history, split children never open on their own, storage mirrors the
//! published snapshot.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use tabstate_core::{
    CloseDirection, MAX_CLOSED_TABS, MemoryStorage, RecordQuery, SplitViewEngine, Tab, TabId,
    TabRepository, TabState,
};
use tabstate_core::storage::TabStorage;

// ============================================================================
// Test Strategies
// ============================================================================

/// One step against the repository. Indices are taken modulo the number of
/// open tabs at the time the step runs.
#[derive(Debug, Clone)]
enum TabOp {
    Add {
        new_tab_page: bool,
        active: bool,
        pinned: bool,
        position: Option<usize>,
    },
    Close(usize),
    CloseMany(CloseDirection, usize),
    Activate(usize),
    Pin(usize, bool),
    Restore,
    Split(usize, usize),
    Convert(usize),
    MoveIntoSplit(usize, usize),
    RemoveChild(usize),
    Ratio(usize, i64),
}

fn direction_strategy() -> impl Strategy<Value = CloseDirection> {
    prop_oneof![
        Just(CloseDirection::Above),
        Just(CloseDirection::Below),
        Just(CloseDirection::Other),
    ]
}

fn op_strategy() -> impl Strategy<Value = TabOp> {
    prop_oneof![
        4 => (any::<bool>(), any::<bool>(), any::<bool>(), proptest::option::of(0usize..8))
            .prop_map(|(new_tab_page, active, pinned, position)| TabOp::Add {
                new_tab_page,
                active,
                pinned,
                position,
            }),
        2 => (0usize..8).prop_map(TabOp::Close),
        1 => (direction_strategy(), 0usize..8).prop_map(|(d, i)| TabOp::CloseMany(d, i)),
        2 => (0usize..8).prop_map(TabOp::Activate),
        1 => (0usize..8, any::<bool>()).prop_map(|(i, p)| TabOp::Pin(i, p)),
        1 => Just(TabOp::Restore),
        1 => (0usize..8, 0usize..8).prop_map(|(a, b)| TabOp::Split(a, b)),
        1 => (0usize..8).prop_map(TabOp::Convert),
        1 => (0usize..8, 0usize..8).prop_map(|(a, b)| TabOp::MoveIntoSplit(a, b)),
        1 => (0usize..8).prop_map(TabOp::RemoveChild),
        1 => (0usize..8, -20i64..120).prop_map(|(i, r)| TabOp::Ratio(i, r)),
    ]
}

fn ops_strategy(max_ops: usize) -> impl Strategy<Value = Vec<TabOp>> {
    proptest::collection::vec(op_strategy(), 1..=max_ops)
}

// ============================================================================
// Harness
// ============================================================================

fn pick(tabs: &[Tab], index: usize) -> Option<TabId> {
    if tabs.is_empty() {
        None
    } else {
        Some(tabs[index % tabs.len()].id.clone())
    }
}

fn pick_split(tabs: &[Tab], index: usize) -> Option<TabId> {
    let splits: Vec<_> = tabs.iter().filter(|tab| tab.is_split_view()).cloned().collect();
    pick(&splits, index)
}

async fn apply(engine: &SplitViewEngine, repository: &TabRepository, op: &TabOp) {
    let tabs = repository.get_all_open_tabs();
    match op {
        TabOp::Add {
            new_tab_page,
            active,
            pinned,
            position,
        } => {
            let tab = if *new_tab_page {
                Tab::new_tab(Vec::new())
            } else {
                Tab::web("page", "https://page.test")
            };
            let state = if *active { TabState::Active } else { TabState::Inactive };
            let tab = tab.with_state(state).with_pinned(*pinned);
            repository.add_tab(tab, *position).await.unwrap();
        }
        TabOp::Close(i) => {
            if let Some(id) = pick(&tabs, *i) {
                repository.close_tab(&id).await.unwrap();
            }
        }
        TabOp::CloseMany(direction, i) => {
            if let Some(id) = pick(&tabs, *i) {
                repository.close_tabs(*direction, &id).await.unwrap();
            }
        }
        TabOp::Activate(i) => {
            if let Some(id) = pick(&tabs, *i) {
                repository.set_active_tab(&id).await.unwrap();
            }
        }
        TabOp::Pin(i, pinned) => {
            if let Some(id) = pick(&tabs, *i) {
                repository.pin_tab(&id, *pinned).await.unwrap();
            }
        }
        TabOp::Restore => {
            repository.restore_closed_tab().await.unwrap();
        }
        TabOp::Split(a, b) => {
            if let (Some(a), Some(b)) = (pick(&tabs, *a), pick(&tabs, *b)) {
                engine.create_split_view_from_two_tabs(&a, &b).await.unwrap();
            }
        }
        TabOp::Convert(i) => {
            if let Some(id) = pick(&tabs, *i) {
                engine.convert_to_split_view(&id).await.unwrap();
            }
        }
        TabOp::MoveIntoSplit(s, i) => {
            if let (Some(split), Some(id)) = (pick_split(&tabs, *s), pick(&tabs, *i)) {
                // Moving a split view into another one is rejected, which is fine
                let _ = engine.add_tab_to_split_view(&split, &id).await;
            }
        }
        TabOp::RemoveChild(s) => {
            if let Some(split) = pick_split(&tabs, *s) {
                let child = tabs
                    .iter()
                    .find(|tab| tab.id == split)
                    .and_then(Tab::split_view_content)
                    .and_then(|content| content.child_tabs.first())
                    .map(|child| child.id.clone());
                if let Some(child) = child {
                    engine.remove_from_split_view(&child).await.unwrap();
                }
            }
        }
        TabOp::Ratio(s, ratio) => {
            if let Some(split) = pick_split(&tabs, *s) {
                engine.persist_split_ratio(&split, *ratio).await.unwrap();
            }
        }
    }
}

async fn check_invariants(storage: &MemoryStorage, repository: &TabRepository) {
    let snapshot = repository.snapshot();
    let tabs = snapshot.tabs.as_ref();

    let active = tabs.iter().filter(|tab| tab.is_active()).count();
    assert!(active <= 1, "{active} active tabs");

    let first_unpinned = tabs.iter().position(|tab| !tab.is_pinned).unwrap_or(tabs.len());
    assert!(
        tabs[first_unpinned..].iter().all(|tab| !tab.is_pinned),
        "pinned tab after an unpinned one"
    );

    let open_ids: HashSet<_> = tabs.iter().map(|tab| tab.id.clone()).collect();
    for tab in tabs {
        if let Some(content) = tab.split_view_content() {
            assert!(content.child_tabs.len() <= 2);
            let ratio = content.split_ratio.value();
            assert!((20..=80).contains(&ratio), "ratio {ratio}");
            for child in &content.child_tabs {
                assert!(!open_ids.contains(&child.id), "child is also open");
                assert!(!child.is_split_view());
            }
        }
    }

    let closed = repository.get_closed_tabs(usize::MAX);
    assert!(closed.len() <= MAX_CLOSED_TABS);

    // Storage holds exactly the published rows, densely positioned
    let stored = storage.find(&RecordQuery::open_tabs()).await.unwrap();
    let stored_ids: Vec<_> = stored.iter().map(|record| record.id.clone()).collect();
    let snapshot_ids: Vec<_> = tabs.iter().map(|tab| tab.id.clone()).collect();
    assert_eq!(stored_ids, snapshot_ids);
    for (index, record) in stored.iter().enumerate() {
        assert_eq!(record.position, index as i64);
    }
    let stored_closed = storage.find(&RecordQuery::closed_tabs()).await.unwrap();
    assert_eq!(stored_closed.len(), closed.len());
    assert!(stored_closed.iter().all(|record| record.closed_at.is_some()));
}

fn run(ops: &[TabOp]) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create runtime");
    rt.block_on(async {
        let storage = Arc::new(MemoryStorage::new());
        let repository = Arc::new(TabRepository::open(storage.clone()).await.unwrap());
        let engine = SplitViewEngine::new(Arc::clone(&repository));
        for op in ops {
            apply(&engine, &repository, op).await;
            check_invariants(&storage, &repository).await;
        }

        // A fresh repository over the same rows sees the same state
        let reopened = TabRepository::open(storage.clone()).await.unwrap();
        assert_eq!(reopened.get_all_open_tabs(), repository.get_all_open_tabs());
    });
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn invariants_hold_after_every_operation(ops in ops_strategy(40)) {
        run(&ops);
    }

    #[test]
    fn adding_tabs_keeps_pinned_block_in_insertion_order(
        pins in proptest::collection::vec(any::<bool>(), 1..12)
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to create runtime");
        rt.block_on(async {
            let repository = TabRepository::open(Arc::new(MemoryStorage::new())).await.unwrap();
            let mut added = Vec::new();
            for (i, pinned) in pins.iter().enumerate() {
                let tab = Tab::web(format!("t{i}"), "https://t.test").with_pinned(*pinned);
                added.push(repository.add_tab(tab, None).await.unwrap());
            }

            let expected: Vec<_> = added
                .iter()
                .filter(|tab| tab.is_pinned)
                .chain(added.iter().filter(|tab| !tab.is_pinned))
                .map(|tab| tab.id.clone())
                .collect();
            let actual: Vec<_> = repository
                .get_all_open_tabs()
                .into_iter()
                .map(|tab| tab.id)
                .collect();
            assert_eq!(actual, expected);
        });
    }

    #[test]
    fn single_active_after_any_activation_sequence(
        count in 1usize..8,
        picks in proptest::collection::vec(0usize..8, 1..20)
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to create runtime");
        rt.block_on(async {
            let repository = TabRepository::open(Arc::new(MemoryStorage::new())).await.unwrap();
            for _ in 0..count {
                repository
                    .add_tab(Tab::web("t", "https://t.test").with_state(TabState::Active), None)
                    .await
                    .unwrap();
            }
            let tabs = repository.get_all_open_tabs();
            for pick_index in picks {
                let id = tabs[pick_index % tabs.len()].id.clone();
                repository.set_active_tab(&id).await.unwrap();
                assert_eq!(repository.get_active_tab_id(), Some(id));
                let active = repository
                    .get_all_open_tabs()
                    .iter()
                    .filter(|tab| tab.is_active())
                    .count();
                assert_eq!(active, 1);
            }
        });
    }
}
