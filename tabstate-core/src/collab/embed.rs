//! Embedded wiki view bounds

use crate::models::Tab;

/// Whether the embedded view must drop its bounds when switching tabs.
///
/// Moving between two tabs that embed the same workspace keeps the view in
/// place; every other switch clears it.
#[must_use]
pub fn should_clear_embed_bounds(from: Option<&Tab>, to: &Tab) -> bool {
    match (from.and_then(Tab::workspace_id), to.workspace_id()) {
        (Some(previous), Some(next)) => previous != next,
        _ => true,
    }
}
