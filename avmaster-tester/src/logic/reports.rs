use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use super::ScenarioResult;

/// Context printed alongside every report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub generated_at: String,
    /// Hex digest of the level catalog the run used.
    pub catalog_fingerprint: String,
    pub levels: Vec<String>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    meta: &'a ReportMeta,
    results: &'a [ScenarioResult],
}

fn success_rate(results: &[ScenarioResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let passed = results.iter().filter(|r| r.passed).count();
    #[allow(clippy::cast_precision_loss)]
    let rate = (passed as f64 / results.len() as f64) * 100.0;
    rate
}

pub fn generate_console_report(
    writer: &mut dyn Write,
    results: &[ScenarioResult],
    meta: &ReportMeta,
    total_duration: Duration,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(
        writer,
        "{}",
        "📊 Logic Test Results Summary".bright_cyan().bold()
    )?;
    writeln!(writer, "{}", "==============================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(writer, "Catalog: {}", meta.catalog_fingerprint)?;
    writeln!(writer, "Levels: {}", meta.levels.join(", "))?;
    writeln!(writer, "Total scenarios: {total_tests}")?;
    writeln!(writer, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(writer, "Failed: {}", failed_tests.to_string().red())?;
    writeln!(writer, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(writer, "Total time: {total_duration:?}")?;
    writeln!(writer)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(
            writer,
            "{status} {} (seed {})",
            result.scenario_name.bold(),
            result.seed
        )?;
        writeln!(
            writer,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(writer, "   Average time: {:?}", result.average_duration)?;
        for note in &result.notes {
            writeln!(writer, "   ℹ {}", note.dimmed())?;
        }
        if !result.failures.is_empty() {
            writeln!(writer, "   Failures:")?;
            for failure in &result.failures {
                writeln!(writer, "     • {}", failure.red())?;
            }
        }
        writeln!(writer)?;
    }

    let fastest = results.iter().min_by_key(|r| r.average_duration);
    let slowest = results.iter().max_by_key(|r| r.average_duration);
    if let (Some(fastest), Some(slowest)) = (fastest, slowest) {
        writeln!(writer, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(writer, "{}", "=====================".yellow())?;
        writeln!(
            writer,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.average_duration
        )?;
        writeln!(
            writer,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.average_duration
        )?;
    }
    Ok(())
}

pub fn generate_json_report(
    writer: &mut dyn Write,
    results: &[ScenarioResult],
    meta: &ReportMeta,
) -> Result<()> {
    let report = JsonReport { meta, results };
    serde_json::to_writer_pretty(&mut *writer, &report)?;
    writeln!(writer)?;
    Ok(())
}

pub fn generate_markdown_report(
    writer: &mut dyn Write,
    results: &[ScenarioResult],
    meta: &ReportMeta,
) -> Result<()> {
    writeln!(writer, "# AV Master Logic Test Results\n")?;
    writeln!(
        writer,
        "_Generated {} against catalog `{}`._\n",
        meta.generated_at, meta.catalog_fingerprint
    )?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();

    writeln!(writer, "## Summary\n")?;
    writeln!(writer, "- **Total scenarios**: {total_tests}")?;
    writeln!(writer, "- **Passed**: {passed_tests}")?;
    writeln!(writer, "- **Failed**: {}", total_tests - passed_tests)?;
    writeln!(writer, "- **Success rate**: {:.1}%\n", success_rate(results))?;

    writeln!(writer, "## Detailed Results\n")?;
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };
        writeln!(
            writer,
            "### {status} {} (seed {})\n",
            result.scenario_name, result.seed
        )?;
        writeln!(
            writer,
            "- **Iterations**: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(writer, "- **Average time**: {:?}", result.average_duration)?;
        if !result.notes.is_empty() {
            writeln!(writer, "- **Notes**:")?;
            for note in &result.notes {
                writeln!(writer, "  - {note}")?;
            }
        }
        if !result.failures.is_empty() {
            writeln!(writer, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(writer, "  - {failure}")?;
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> ReportMeta {
        ReportMeta {
            generated_at: "2026-01-01T00:00:00Z".to_string(),
            catalog_fingerprint: "00000000deadbeef".to_string(),
            levels: vec!["audio-1".to_string()],
        }
    }

    fn result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "Campaign".to_string(),
            seed: 42,
            passed,
            iterations_run: 1,
            successful_iterations: usize::from(passed),
            failures: if passed {
                Vec::new()
            } else {
                vec!["audio-1: planned xlr-cable link was rejected".to_string()]
            },
            notes: vec!["unlocked video-3 by hand".to_string()],
            average_duration: Duration::from_millis(3),
            performance_data: vec![Duration::from_millis(3)],
        }
    }

    #[test]
    fn json_report_wraps_results_with_meta() {
        let mut buffer = Vec::new();
        generate_json_report(&mut buffer, &[result(true)], &meta()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["meta"]["catalog_fingerprint"], "00000000deadbeef");
        assert_eq!(value["results"][0]["seed"], 42);
    }

    #[test]
    fn markdown_lists_failures_and_notes() {
        let mut buffer = Vec::new();
        generate_markdown_report(&mut buffer, &[result(false)], &meta()).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("### ❌ Campaign (seed 42)"));
        assert!(text.contains("  - unlocked video-3 by hand"));
        assert!(text.contains("- **Success rate**: 0.0%"));
    }

    #[test]
    fn console_report_counts_results() {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        generate_console_report(
            &mut buffer,
            &[result(true), result(false)],
            &meta(),
            Duration::from_millis(10),
        )
        .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("Total scenarios: 2"));
        assert!(text.contains("Success rate: 50.0%"));
        assert!(text.contains("Fastest: Campaign"));
    }
}
