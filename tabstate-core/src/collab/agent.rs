//! Agent-backed chat tabs

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{TabError, TabResult};
use crate::models::{Tab, TabState};
use crate::repository::TabRepository;

/// An agent created by the collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInstance {
    /// Agent id stored in the chat tab
    pub id: String,
    /// Display name, used as the tab title
    pub name: String,
    /// Definition the agent was created from
    pub agent_def_id: String,
}

/// Failures reported by an [`AgentProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    /// No definition with this id exists.
    #[error("agent definition not found: {0}")]
    DefinitionNotFound(String),

    /// The agent service could not be reached or refused the request.
    #[error("agent service unavailable: {0}")]
    Unavailable(String),
}

/// Creates agents for chat tabs.
#[async_trait]
pub trait AgentProvider: Send + Sync {
    /// Creates an agent from a definition.
    async fn create_agent(&self, agent_def_id: &str) -> Result<AgentInstance, AgentError>;
}

/// Opens chat tabs, creating their agent first.
pub struct ChatTabLauncher {
    repository: Arc<TabRepository>,
    agents: Arc<dyn AgentProvider>,
}

impl fmt::Debug for ChatTabLauncher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatTabLauncher")
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}

impl ChatTabLauncher {
    /// Creates a launcher.
    #[must_use]
    pub fn new(repository: Arc<TabRepository>, agents: Arc<dyn AgentProvider>) -> Self {
        Self { repository, agents }
    }

    /// Creates an agent for `agent_def_id` and opens an ACTIVE chat tab
    /// titled after it.
    ///
    /// # Errors
    ///
    /// Returns [`TabError::Agent`] if the agent cannot be created; no tab is
    /// written in that case. Storage errors are passed through.
    #[tracing::instrument(name = "chat.open", skip_all, fields(agent_def_id = %agent_def_id))]
    pub async fn open_chat_tab(&self, agent_def_id: &str, position: Option<usize>) -> TabResult<Tab> {
        let agent = self
            .agents
            .create_agent(agent_def_id)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Agent creation failed");
                TabError::Agent {
                    agent_def_id: agent_def_id.to_string(),
                    reason: e.to_string(),
                }
            })?;

        let tab = Tab::chat(agent.name, agent.id, agent.agent_def_id).with_state(TabState::Active);
        self.repository.add_tab(tab, position).await
    }
}
