//! Tab data model
//!
//! - `types` - identifiers and enums (`TabId`, `TabState`, `TabType`)
//! - `content` - variant-specific fields and the clamped `SplitRatio`
//! - `tab` - the `Tab` entity and its `TabKind` variants
//! - `patch` - partial updates (`TabPatch`)
//! - `record` - the persisted row shape (`TabRecord`)

mod content;
mod patch;
mod record;
mod tab;
mod types;

pub use content::{
    AgentEditorContent, AgentWizardContent, ChatContent, DEFAULT_SPLIT_RATIO, EMPTY_SPLIT_VIEW_TITLE,
    Favorite,
    MAX_SPLIT_CHILDREN, MAX_SPLIT_RATIO, MIN_SPLIT_RATIO, NewTabContent, SplitRatio,
    SplitViewContent, WebContent, WikiEmbedContent,
};
pub use patch::TabPatch;
pub use record::TabRecord;
pub use tab::{NEW_TAB_TITLE, Tab, TabKind};
pub use types::{EPHEMERAL_TAB_PREFIX, TabId, TabState, TabType};
