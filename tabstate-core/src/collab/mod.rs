//! Collaborators outside the tab table
//!
//! - `agent` - agent creation for chat tabs (`AgentProvider`, `ChatTabLauncher`)
//! - `embed` - when the embedded wiki view keeps its bounds

mod agent;
mod embed;

pub use agent::{AgentError, AgentInstance, AgentProvider, ChatTabLauncher};
pub use embed::should_clear_embed_bounds;
