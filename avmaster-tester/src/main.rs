mod common;
mod logic;
mod store;

use anyhow::{Context, Result, ensure};
use avmaster_game::{LevelCatalog, RulesConfig, catalog};
use clap::Parser;
use colored::Colorize;
use std::fs::{self, File};
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use common::scenario::{expand_scenarios, get_scenario, list_scenarios};
use common::{resolve_levels, split_csv};
use logic::reports::ReportMeta;
use logic::{GameTester, LogicTester, ScenarioResult, resolve_seed_inputs};

#[derive(Debug, Parser)]
#[command(name = "avmaster-tester", version)]
#[command(about = "Headless QA for AV Master - catalog audits and scripted level playthroughs")]
struct Args {
    /// Scenarios to run (comma-separated, or `all`)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Levels to cover: ids (audio-1), categories (audio), or `all`
    #[arg(long, default_value = "all")]
    levels: String,

    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 1)]
    iterations: usize,

    /// Chance that the clumsy player botches a connection
    #[arg(long, default_value_t = 0.35)]
    mistake_rate: f64,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON file backing the persistence scenario (overwritten)
    #[arg(long)]
    save_file: Option<PathBuf>,

    /// Rules config overriding the bundled scoring values
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    ensure!(
        (0.0..=1.0).contains(&args.mistake_rate),
        "--mistake-rate must be between 0 and 1, got {}",
        args.mistake_rate
    );
    let catalog = catalog();
    ensure!(!catalog.is_empty(), "level catalog failed to load");
    let rules = load_rules(args.rules.as_deref())?;
    let levels = resolve_levels(catalog, &split_csv(&args.levels))?;
    let seeds = resolve_seed_inputs(&args.seeds)?;

    announce_banner();
    let start_time = Instant::now();
    let game_tester = GameTester::new(catalog, rules, levels, args.verbose)
        .with_mistake_rate(args.mistake_rate)
        .with_save_file(args.save_file.clone());

    let results = run_logic_scenarios(&args, &seeds, game_tester.clone());
    write_reports(&args, &results, &report_meta(catalog, &game_tester), start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:15} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    eprintln!("{}", "🎛️  AV Master Automated Tester".bright_cyan().bold());
    eprintln!("{}", "================================".cyan());
}

fn load_rules(path: Option<&Path>) -> Result<RulesConfig> {
    let Some(path) = path else {
        return Ok(RulesConfig::load_from_static());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read rules from {}", path.display()))?;
    RulesConfig::from_json(&raw).with_context(|| format!("invalid rules in {}", path.display()))
}

fn report_meta(catalog: &LevelCatalog, tester: &GameTester) -> ReportMeta {
    ReportMeta {
        generated_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        catalog_fingerprint: format!("{:016x}", catalog.fingerprint()),
        levels: tester.levels().to_vec(),
    }
}

fn run_logic_scenarios(
    args: &Args,
    seeds: &[u64],
    game_tester: GameTester,
) -> Vec<ScenarioResult> {
    let mut results = Vec::new();
    let logic_tester = LogicTester::new(game_tester);

    for scenario_name in expand_scenarios(&args.scenarios) {
        if let Some(scenario) = get_scenario(&scenario_name) {
            log::debug!("running scenario {scenario_name}");
            results.extend(logic_tester.run_scenario(&scenario, seeds, args.iterations));
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }

    results
}

fn write_reports(
    args: &Args,
    results: &[ScenarioResult],
    meta: &ReportMeta,
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(&mut output_target, results, meta)?,
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# AV Master Logic Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results, meta)?;
            }
        }
        _ => {
            if results.is_empty() {
                writeln!(&mut output_target, "No logic scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    meta,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(
                &mut output_target,
                "🏁 Total time: {:?}",
                start_time.elapsed()
            )?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
