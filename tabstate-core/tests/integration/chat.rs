//! Collaborator-backed tabs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tabstate_core::{
    AgentError, AgentInstance, AgentProvider, ChatTabLauncher, Tab, TabError, TabKind,
    should_clear_embed_bounds,
};

use super::{active_web, memory_repository};

/// Hands out numbered agents, or fails every call when `offline`.
#[derive(Default)]
struct CountingAgents {
    created: AtomicUsize,
    offline: bool,
}

#[async_trait]
impl AgentProvider for CountingAgents {
    async fn create_agent(&self, agent_def_id: &str) -> Result<AgentInstance, AgentError> {
        if self.offline {
            return Err(AgentError::Unavailable("connection refused".to_string()));
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(AgentInstance {
            id: format!("agent-{n}"),
            name: format!("Agent {n}"),
            agent_def_id: agent_def_id.to_string(),
        })
    }
}

#[tokio::test]
async fn chat_tabs_get_their_own_agent() {
    let (_, repository) = memory_repository().await;
    let agents = Arc::new(CountingAgents::default());
    let launcher = ChatTabLauncher::new(Arc::clone(&repository), agents.clone());

    let first = launcher.open_chat_tab("writer", None).await.unwrap();
    let second = launcher.open_chat_tab("writer", Some(0)).await.unwrap();

    assert_eq!(agents.created.load(Ordering::SeqCst), 2);
    let titles: Vec<_> = repository
        .get_all_open_tabs()
        .into_iter()
        .map(|tab| tab.title)
        .collect();
    assert_eq!(titles, vec!["Agent 2", "Agent 1"]);
    assert_eq!(repository.get_active_tab_id(), Some(second.id));
    assert!(matches!(first.kind, TabKind::Chat(ref chat) if chat.agent_id == "agent-1"));
}

#[tokio::test]
async fn offline_agent_service_aborts_the_tab() {
    let (storage, repository) = memory_repository().await;
    repository.add_tab(active_web("A"), None).await.unwrap();
    let writes = storage.stats().writes();
    let agents = Arc::new(CountingAgents {
        offline: true,
        ..CountingAgents::default()
    });
    let launcher = ChatTabLauncher::new(Arc::clone(&repository), agents);

    let err = launcher.open_chat_tab("writer", None).await.unwrap_err();

    match err {
        TabError::Agent { agent_def_id, reason } => {
            assert_eq!(agent_def_id, "writer");
            assert!(reason.contains("connection refused"));
        }
        other => panic!("expected agent error, got {other:?}"),
    }
    assert_eq!(storage.stats().writes(), writes);
    assert_eq!(repository.get_all_open_tabs().len(), 1);
}

#[tokio::test]
async fn switching_between_tabs_of_one_workspace_keeps_embed_bounds() {
    let (_, repository) = memory_repository().await;
    let first = repository
        .add_tab(Tab::wiki_embed("Notes", "ws-1"), None)
        .await
        .unwrap();
    let second = repository
        .add_tab(Tab::wiki_embed("Notes (copy)", "ws-1"), None)
        .await
        .unwrap();
    let other = repository
        .add_tab(Tab::wiki_embed("Specs", "ws-2"), None)
        .await
        .unwrap();

    assert!(!should_clear_embed_bounds(Some(&first), &second));
    assert!(should_clear_embed_bounds(Some(&second), &other));
    assert!(should_clear_embed_bounds(None, &first));
}
