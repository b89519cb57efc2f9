//! Completion detection and the state changes a completed level triggers.

use serde::Serialize;

use crate::catalog::LevelCatalog;
use crate::config::RulesConfig;
use crate::progress::ConnectionProgress;
use crate::state::GameState;
use crate::store::{PersistFailure, ProgressStore, persist};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Complete,
    Incomplete,
}

/// `Complete` exactly when every category has at least as many
/// connections as it requires. An empty manifest is trivially complete.
#[must_use]
pub fn check_completion(progress: &ConnectionProgress) -> CompletionStatus {
    if progress.all_satisfied() {
        CompletionStatus::Complete
    } else {
        CompletionStatus::Incomplete
    }
}

/// What completing a level did to the player's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionReport {
    pub level_id: String,
    pub bonus: u32,
    pub score: u32,
    /// `false` when the level had already been completed before.
    pub first_completion: bool,
    pub next_level: Option<String>,
    /// `true` when the successor was locked until now.
    pub unlocked_next: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_failure: Option<PersistFailure>,
}

/// Record a completion: mark the level completed, award the bonus, make
/// sure the level itself and its successor are unlocked, and persist.
///
/// Membership updates are idempotent. The bonus is awarded on every call,
/// so replaying a completed level scores again. A failed write leaves the
/// in-memory state updated and is returned in the report.
pub fn complete_level<S: ProgressStore>(
    state: &mut GameState,
    level_id: &str,
    catalog: &LevelCatalog,
    config: &RulesConfig,
    store: &S,
) -> CompletionReport {
    let first_completion = state.mark_completed(level_id);
    state.unlock(level_id);
    state.award(config.completion_bonus);

    let next_level = catalog.next_level(level_id).map(str::to_string);
    let unlocked_next = next_level
        .as_deref()
        .is_some_and(|next| state.unlock(next));

    let persist_failure = persist(store, &config.save_key, state).err();

    log::info!(
        "level {level_id} complete: +{} (score {}), next {}",
        config.completion_bonus,
        state.score,
        next_level.as_deref().unwrap_or("none")
    );

    CompletionReport {
        level_id: level_id.to_string(),
        bonus: config.completion_bonus,
        score: state.score,
        first_completion,
        next_level,
        unlocked_next,
        persist_failure,
    }
}
