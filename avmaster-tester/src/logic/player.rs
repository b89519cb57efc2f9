use anyhow::{Context, Result};
use avmaster_game::{CompletionStatus, ConnectionOutcome, GameSession, ProgressStore};
use serde::Serialize;

use super::planner::{place_all, plan_links};
use super::policy::{CableChoice, PlayerPolicy};

/// Give up on a link after this many tries; the last try is always the
/// intended cable.
const MAX_TRIES_PER_LINK: u32 = 12;

/// Outcome of one scripted attempt at a level.
#[derive(Debug, Clone, Serialize)]
pub struct LevelRun {
    pub level_id: String,
    pub completed: bool,
    pub placed: usize,
    pub planned_links: usize,
    pub connections: usize,
    pub rejected: u32,
    pub score_after: u32,
    /// Successor, if it is unlocked once the run ends.
    pub next_unlocked: Option<String>,
    pub clock: String,
    pub violations: Vec<String>,
}

/// Enter `level_id`, place the whole toolbar, and work through the planned
/// links with `policy`. Every rejected attempt is checked to have left
/// progress untouched.
pub fn play_level<S: ProgressStore>(
    session: &mut GameSession<'_, S>,
    level_id: &str,
    policy: &mut dyn PlayerPolicy,
) -> Result<LevelRun> {
    session
        .select_level(level_id)
        .with_context(|| format!("entering {level_id}"))?;
    let level = session
        .current_level()
        .with_context(|| format!("{level_id} did not load"))?;
    let (placed, mut completed) = place_all(session)?;
    let links = plan_links(
        session
            .attempt()
            .with_context(|| format!("{level_id} unloaded during placement"))?,
    );

    let mut violations = Vec::new();
    for link in &links {
        for attempt_no in 1..=MAX_TRIES_PER_LINK {
            let choice = if attempt_no == MAX_TRIES_PER_LINK {
                CableChoice::intended(link)
            } else {
                policy.choose(level, link)
            };
            let (from, to) = if choice.reversed {
                (link.to, link.from)
            } else {
                (link.from, link.to)
            };
            let before = session.progress().cloned();
            session.tick(1);
            match session.attempt_connection(from, to, choice.cable)? {
                ConnectionOutcome::Rejected(_) => {
                    if session.progress().cloned() != before {
                        violations.push(format!(
                            "{level_id}: rejected {} attempt changed progress",
                            choice.cable
                        ));
                    }
                    if choice.is_intended(link) {
                        violations.push(format!(
                            "{level_id}: planned {} link over {} was rejected",
                            link.category.label(),
                            link.cable
                        ));
                        break;
                    }
                }
                ConnectionOutcome::Connected { completion, .. } => {
                    completed |= completion.is_some();
                    if !choice.is_intended(link) {
                        violations.push(format!(
                            "{level_id}: mistaken {} attempt was accepted",
                            choice.cable
                        ));
                    }
                    break;
                }
            }
        }
    }

    let attempt = session
        .attempt()
        .with_context(|| format!("{level_id} unloaded during play"))?;
    let status_complete = session.completion_status() == Some(CompletionStatus::Complete);
    if completed != status_complete {
        violations.push(format!(
            "{level_id}: completion signal ({completed}) disagrees with status ({status_complete})"
        ));
    }
    if completed && !session.state().is_completed(level_id) {
        violations.push(format!("{level_id}: completed but not recorded"));
    }

    let state = session.state();
    let next_unlocked = session
        .catalog()
        .next_level(level_id)
        .filter(|next| state.is_unlocked(next))
        .map(str::to_string);

    Ok(LevelRun {
        level_id: level_id.to_string(),
        completed,
        placed: placed.len(),
        planned_links: links.len(),
        connections: attempt.connections().len(),
        rejected: attempt.rejected_count(),
        score_after: state.score,
        next_unlocked,
        clock: session.clock_display(),
        violations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::policy::PlayerStrategy;
    use avmaster_game::{MemoryProgressStore, RulesConfig, catalog};

    fn session() -> GameSession<'static, MemoryProgressStore> {
        GameSession::new(catalog(), RulesConfig::default(), MemoryProgressStore::new())
    }

    #[test]
    fn perfect_player_clears_audio_one() {
        let mut session = session();
        let mut policy = PlayerStrategy::Perfect.create_policy(0, 0.0);
        let run = play_level(&mut session, "audio-1", policy.as_mut()).unwrap();
        assert!(run.completed, "{:?}", run.violations);
        assert_eq!(run.connections, 9);
        assert_eq!(run.rejected, 0);
        assert_eq!(run.score_after, 100);
        assert_eq!(run.next_unlocked.as_deref(), Some("audio-2"));
        assert!(run.violations.is_empty());
    }

    #[test]
    fn clumsy_player_still_finishes() {
        let mut session = session();
        let mut policy = PlayerStrategy::Clumsy.create_policy(99, 0.6);
        let run = play_level(&mut session, "audio-1", policy.as_mut()).unwrap();
        assert!(run.completed);
        assert!(run.violations.is_empty(), "{:?}", run.violations);
        assert_eq!(run.connections, 9);
        assert_eq!(
            session.attempt().map(|attempt| attempt.rejected_count()),
            Some(run.rejected)
        );
    }

    #[test]
    fn blocked_level_never_completes() {
        let session = session();
        let mut state = session.state().clone();
        state.unlock("video-2");
        let mut session = GameSession::with_state(
            catalog(),
            RulesConfig::default(),
            session.store().clone(),
            state,
        );
        let mut policy = PlayerStrategy::Perfect.create_policy(0, 0.0);
        let run = play_level(&mut session, "video-2", policy.as_mut()).unwrap();
        assert!(!run.completed);
        assert!(run.next_unlocked.is_none());
        assert!(run.violations.is_empty(), "{:?}", run.violations);
    }

    #[test]
    fn locked_level_is_an_error() {
        let mut session = session();
        let mut policy = PlayerStrategy::Perfect.create_policy(0, 0.0);
        assert!(play_level(&mut session, "lighting-1", policy.as_mut()).is_err());
    }
}
