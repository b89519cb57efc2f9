use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use avmaster_game::{
    CompletionStatus, GameSession, GameState, LevelCatalog, MemoryProgressStore, ProgressStore,
    RulesConfig, SessionEvent,
};

use crate::logic::audit::{LevelAudit, audit_levels};
use crate::logic::planner::{place_all, plan_links};
use crate::logic::player::{LevelRun, play_level};
use crate::logic::policy::PlayerStrategy;
use crate::logic::seeds::derive_level_seed;
use crate::store::JsonFileStore;

/// What a plan exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// Load every selected level and check its starting position.
    Smoke,
    /// Static reachability plus a dry run of the link planner.
    CatalogAudit,
    /// Play the selected levels in order from a fresh save.
    Campaign,
    /// Win a level, buy a hint, then reload the save and compare.
    Persistence,
}

/// Declarative plan for one scripted run.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub kind: RunKind,
    pub strategy: PlayerStrategy,
    pub expectations: Vec<RunExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(kind: RunKind, strategy: PlayerStrategy) -> Self {
        Self {
            kind,
            strategy,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<RunExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a plan completes.
type RunExpectationFn = Arc<dyn Fn(&RunSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct RunExpectation(RunExpectationFn);

impl std::fmt::Debug for RunExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunExpectation").finish()
    }
}

impl RunExpectation {
    pub fn evaluate(&self, summary: &RunSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for RunExpectation
where
    F: Fn(&RunSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Everything a run produced. Driver errors land in `violations`.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub seed: u64,
    pub kind: RunKind,
    pub strategy: PlayerStrategy,
    pub audits: Vec<LevelAudit>,
    pub runs: Vec<LevelRun>,
    pub final_state: Option<GameState>,
    pub notes: Vec<String>,
    pub violations: Vec<String>,
}

impl RunSummary {
    fn new(seed: u64, plan: &SimulationPlan) -> Self {
        Self {
            seed,
            kind: plan.kind,
            strategy: plan.strategy,
            audits: Vec::new(),
            runs: Vec::new(),
            final_state: None,
            notes: Vec::new(),
            violations: Vec::new(),
        }
    }

    #[must_use]
    pub fn audit(&self, level_id: &str) -> Option<&LevelAudit> {
        self.audits.iter().find(|audit| audit.level_id == level_id)
    }

    #[must_use]
    pub fn total_rejected(&self) -> u32 {
        self.runs.iter().map(|run| run.rejected).sum()
    }
}

/// Headless runner for scripted sessions against the level catalog.
#[derive(Debug, Clone)]
pub struct GameTester {
    catalog: &'static LevelCatalog,
    rules: RulesConfig,
    levels: Vec<String>,
    mistake_rate: f64,
    save_file: Option<PathBuf>,
    verbose: bool,
}

impl GameTester {
    #[must_use]
    pub const fn new(
        catalog: &'static LevelCatalog,
        rules: RulesConfig,
        levels: Vec<String>,
        verbose: bool,
    ) -> Self {
        Self {
            catalog,
            rules,
            levels,
            mistake_rate: 0.35,
            save_file: None,
            verbose,
        }
    }

    #[must_use]
    pub const fn with_mistake_rate(mut self, mistake_rate: f64) -> Self {
        self.mistake_rate = mistake_rate;
        self
    }

    #[must_use]
    pub fn with_save_file(mut self, save_file: Option<PathBuf>) -> Self {
        self.save_file = save_file;
        self
    }

    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> RunSummary {
        let mut summary = RunSummary::new(seed, plan);
        summary.audits = audit_levels(self.catalog, &self.levels);
        if self.verbose {
            log::info!(
                "starting {:?} run | seed:{seed} player:{} levels:{}",
                plan.kind,
                plan.strategy,
                self.levels.len()
            );
        }

        let outcome = match plan.kind {
            RunKind::Smoke => self.run_smoke(&mut summary),
            RunKind::CatalogAudit => self.run_audit(&mut summary),
            RunKind::Campaign => self.run_campaign(plan, &mut summary),
            RunKind::Persistence => match &self.save_file {
                Some(path) => self.run_persistence(JsonFileStore::new(path.clone()), &mut summary),
                None => self.run_persistence(MemoryProgressStore::new(), &mut summary),
            },
        };
        if let Err(err) = outcome {
            summary.violations.push(format!("run aborted: {err:#}"));
        }

        for run in &summary.runs {
            summary.violations.extend(run.violations.iter().cloned());
        }
        summary
    }

    fn session(&self) -> GameSession<'static, MemoryProgressStore> {
        GameSession::new(self.catalog, self.rules.clone(), MemoryProgressStore::new())
    }

    fn run_smoke(&self, summary: &mut RunSummary) -> Result<()> {
        let mut session = self.session();
        let starting_score = session.state().score;
        for level_id in &self.levels {
            let attempt = session.load_level(level_id)?;
            let level = attempt.level();
            let progress = attempt.progress();

            if progress.iter().any(|(_, entry)| entry.current != 0) {
                summary
                    .violations
                    .push(format!("{level_id}: progress does not start at zero"));
            }
            let on_toolbar: u32 = attempt.toolbar().iter().map(|item| item.remaining).sum();
            if on_toolbar != level.toolbar_total() {
                summary.violations.push(format!(
                    "{level_id}: toolbar offers {on_toolbar} of {}",
                    level.toolbar_total()
                ));
            }
            let required = progress.total_required();
            if level.requires_connections()
                && session.completion_status() != Some(CompletionStatus::Incomplete)
            {
                summary
                    .violations
                    .push(format!("{level_id}: complete before anything was connected"));
            }
            if session.hint()?.is_empty() {
                summary.violations.push(format!("{level_id}: empty hint"));
            }
            summary.notes.push(format!(
                "{level_id}: {required} connections, {} toolbar items",
                level.toolbar_total()
            ));
        }
        if session.state().score != starting_score {
            summary
                .violations
                .push("free hints changed the score".to_string());
        }

        if session.load_level("missing-0").is_ok() || session.attempt().is_some() {
            summary
                .violations
                .push("unknown level id left a level loaded".to_string());
        }
        Ok(())
    }

    fn run_audit(&self, summary: &mut RunSummary) -> Result<()> {
        let mut session = self.session();
        for audit in &summary.audits {
            if !audit.reachable() {
                for blocked in &audit.blocked {
                    summary.notes.push(format!(
                        "{} blocked on {} x{}: {}",
                        audit.level_id,
                        blocked.category.label(),
                        blocked.required,
                        blocked.reason
                    ));
                }
                continue;
            }
            session.load_level(&audit.level_id)?;
            place_all(&mut session)?;
            let attempt = session
                .attempt()
                .with_context(|| format!("{} unloaded during placement", audit.level_id))?;
            let planned = plan_links(attempt).len();
            if u32::try_from(planned).ok() != Some(audit.required_total) {
                summary.violations.push(format!(
                    "{}: planner found {planned} links for {} required",
                    audit.level_id, audit.required_total
                ));
            }
        }
        Ok(())
    }

    fn run_campaign(&self, plan: &SimulationPlan, summary: &mut RunSummary) -> Result<()> {
        let mut session = self.session();
        for level_id in &self.levels {
            session = open_level(session, level_id, &mut summary.notes);
            let level_seed = derive_level_seed(summary.seed, level_id)?;
            let mut policy = plan.strategy.create_policy(level_seed, self.mistake_rate);
            let run = play_level(&mut session, level_id, policy.as_mut())?;

            let completions = session
                .drain_events()
                .iter()
                .filter(|event| matches!(event, SessionEvent::LevelCompleted(_)))
                .count();
            if completions != usize::from(run.completed) {
                summary.violations.push(format!(
                    "{level_id}: {completions} completion events for one attempt"
                ));
            }
            if self.verbose {
                log_run(&run, policy.name());
            }
            summary.runs.push(run);
        }
        summary.final_state = Some(session.into_state());
        Ok(())
    }

    fn run_persistence<S>(&self, store: S, summary: &mut RunSummary) -> Result<()>
    where
        S: ProgressStore + Clone,
    {
        store
            .clear(&self.rules.save_key)
            .map_err(|err| anyhow!("could not clear previous save: {err}"))?;
        let Some(level_id) = summary
            .audits
            .iter()
            .find(|audit| audit.reachable())
            .map(|audit| audit.level_id.clone())
        else {
            summary
                .notes
                .push("no reachable level selected; nothing to save".to_string());
            return Ok(());
        };

        let session = GameSession::new(self.catalog, self.rules.clone(), store.clone());
        let mut session = open_level(session, &level_id, &mut summary.notes);
        let mut policy = PlayerStrategy::Perfect.create_policy(summary.seed, 0.0);
        let run = play_level(&mut session, &level_id, policy.as_mut())?;
        session.detailed_hint()?;
        for event in session.drain_events() {
            if let SessionEvent::ProgressNotSaved(failure) = event {
                summary.violations.push(failure.to_string());
            }
        }
        summary.runs.push(run);
        let saved = session.into_state();

        let reloaded = GameSession::new(self.catalog, self.rules.clone(), store).into_state();
        let expected = GameState {
            time: 0,
            ..saved.clone()
        };
        if reloaded != expected {
            summary.violations.push(format!(
                "reloaded progress differs: saved {saved:?}, loaded {reloaded:?}"
            ));
        }
        summary.notes.push(format!(
            "saved score {} with {} completed level(s)",
            reloaded.score,
            reloaded.completed_levels.len()
        ));
        summary.final_state = Some(reloaded);
        Ok(())
    }
}

/// Make `level_id` playable, unlocking it by hand when an earlier blocked
/// level kept the campaign from reaching it.
fn open_level<'c, S>(
    session: GameSession<'c, S>,
    level_id: &str,
    notes: &mut Vec<String>,
) -> GameSession<'c, S>
where
    S: ProgressStore + Clone,
{
    if session.state().is_accessible(level_id) {
        return session;
    }
    let catalog = session.catalog();
    let config = session.config().clone();
    let store = session.store().clone();
    let mut state = session.into_state();
    state.unlock(level_id);
    notes.push(format!("unlocked {level_id} by hand"));
    GameSession::with_state(catalog, config, store, state)
}

fn log_run(run: &LevelRun, player: &str) {
    log::info!(
        "{} [{player}] completed:{} links:{}/{} rejected:{} score:{} clock:{}",
        run.level_id,
        run.completed,
        run.connections,
        run.planned_links,
        run.rejected,
        run.score_after,
        run.clock
    );
}
