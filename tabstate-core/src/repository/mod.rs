//! Tab repository
//!
//! - `manager` - `TabRepository`, the single writer of the tab table
//! - `snapshot` - `TabSnapshot`, what subscribers receive after each write
//! - `table` - the in-memory working copy and its invariants
//! - `changeset` - row diffs applied with compensation

mod changeset;
mod manager;
mod snapshot;
mod table;

pub use manager::{CloseDirection, CloseOutcome, MAX_CLOSED_TABS, TabRepository};
pub use snapshot::TabSnapshot;
