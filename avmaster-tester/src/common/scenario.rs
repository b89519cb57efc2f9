use anyhow::{Result, ensure};

use super::split_csv;
use crate::logic::{PlayerStrategy, RunKind, RunSummary, SimulationPlan};

#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

fn smoke_expectation(summary: &RunSummary) -> Result<()> {
    ensure!(
        summary.notes.len() == summary.audits.len(),
        "loaded {} of {} selected levels",
        summary.notes.len(),
        summary.audits.len()
    );
    Ok(())
}

fn audit_expectation(summary: &RunSummary) -> Result<()> {
    ensure!(!summary.audits.is_empty(), "no levels audited");
    for audit in &summary.audits {
        ensure!(
            audit.toolbar_total > 0,
            "{} has nothing on its toolbar",
            audit.level_id
        );
    }
    Ok(())
}

fn campaign_expectation(summary: &RunSummary) -> Result<()> {
    ensure!(
        summary.runs.len() == summary.audits.len(),
        "played {} of {} selected levels",
        summary.runs.len(),
        summary.audits.len()
    );
    for run in &summary.runs {
        let Some(audit) = summary.audit(&run.level_id) else {
            anyhow::bail!("{} was played without an audit", run.level_id);
        };
        if audit.reachable() {
            ensure!(run.completed, "{} is reachable but did not complete", run.level_id);
        } else {
            ensure!(!run.completed, "{} is blocked but completed", run.level_id);
            ensure!(
                run.next_unlocked.is_none(),
                "blocked {} unlocked its successor",
                run.level_id
            );
        }
    }
    let Some(state) = &summary.final_state else {
        anyhow::bail!("campaign left no final state");
    };
    for run in summary.runs.iter().filter(|run| run.completed) {
        ensure!(
            state.is_completed(&run.level_id),
            "{} missing from completed levels",
            run.level_id
        );
    }
    Ok(())
}

fn persistence_expectation(summary: &RunSummary) -> Result<()> {
    if !summary.audits.iter().any(|audit| audit.reachable()) {
        return Ok(());
    }
    let Some(state) = &summary.final_state else {
        anyhow::bail!("nothing was reloaded");
    };
    ensure!(state.time == 0, "clock survived a reload ({}s)", state.time);
    ensure!(
        summary.runs.iter().all(|run| run.completed),
        "the saved level did not complete"
    );
    Ok(())
}

fn smoke_scenario() -> TestScenario {
    TestScenario::simulation(
        "Smoke Test",
        SimulationPlan::new(RunKind::Smoke, PlayerStrategy::Perfect)
            .with_expectation(smoke_expectation),
    )
}

fn catalog_audit_scenario() -> TestScenario {
    TestScenario::simulation(
        "Catalog Audit",
        SimulationPlan::new(RunKind::CatalogAudit, PlayerStrategy::Perfect)
            .with_expectation(audit_expectation),
    )
}

fn campaign_scenario(name: &str, strategy: PlayerStrategy) -> TestScenario {
    TestScenario::simulation(
        name,
        SimulationPlan::new(RunKind::Campaign, strategy).with_expectation(campaign_expectation),
    )
}

fn persistence_scenario() -> TestScenario {
    TestScenario::simulation(
        "Persistence Round Trip",
        SimulationPlan::new(RunKind::Persistence, PlayerStrategy::Perfect)
            .with_expectation(persistence_expectation),
    )
}

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    match name.to_lowercase().as_str() {
        "smoke" => Some(smoke_scenario()),
        "catalog-audit" | "audit" => Some(catalog_audit_scenario()),
        "full-campaign" | "campaign" => Some(campaign_scenario(
            "Full Campaign - Perfect Player",
            PlayerStrategy::Perfect,
        )),
        "mistakes" | "clumsy" => Some(campaign_scenario(
            "Full Campaign - Clumsy Player",
            PlayerStrategy::Clumsy,
        )),
        "persistence" => Some(persistence_scenario()),
        _ => None,
    }
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    vec![
        ("smoke", "Smoke Test"),
        ("catalog-audit", "Catalog Audit"),
        ("full-campaign", "Full Campaign - Perfect Player"),
        ("mistakes", "Full Campaign - Clumsy Player"),
        ("persistence", "Persistence Round Trip"),
    ]
}

/// Split `--scenarios`, replacing `all` with every listed scenario.
pub fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for (key, _) in list_scenarios() {
            if !scenarios.iter().any(|s| s == key) {
                scenarios.push(key.to_string());
            }
        }
    }
    scenarios
}
