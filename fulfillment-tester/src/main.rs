mod logic;
mod scenario;
mod util;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use fulfillment_game::Difficulty;
use logic::{
    GameTester, LogicTester, PlayabilityAggregate, PlayabilityRecord, ScenarioResult,
    aggregate_playability, resolve_seed_inputs, run_playability_analysis,
};
use scenario::{get_scenario, list_scenarios};
use util::split_csv;

#[derive(Debug, Parser)]
#[command(name = "fulfillment-tester", version)]
#[command(about = "Automated playtesting for the Fulfillment game engine")]
struct Args {
    /// Scenarios to run (comma-separated, or `all`)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated; decimal, 0x-hex, or sweep:N)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Override every scenario's difficulty (easy, normal, hard, expert)
    #[arg(long, value_parser = parse_difficulty)]
    difficulty: Option<Difficulty>,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Round-trip every final state through save files in this directory
    #[arg(long)]
    save_dir: Option<PathBuf>,
}

fn parse_difficulty(value: &str) -> Result<Difficulty, String> {
    value
        .trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|()| format!("unknown difficulty '{value}' (expected easy, normal, hard or expert)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner(&args);

    let start_time = Instant::now();
    let scenarios = expand_scenarios(&args.scenarios);
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let game_tester = GameTester::new(args.verbose).with_save_dir(args.save_dir.clone());

    let results = run_logic_scenarios(&args, &scenarios, &seeds, &game_tester).await?;
    let (records, aggregates) = gather_playability(&args, &game_tester, &seeds).await?;

    write_reports(&args, &results, &records, &aggregates, start_time)?;

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
        writeln!(output_target.writer(), "  {key:25} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner(args: &Args) {
    // Machine-readable reports on stdout must stay clean.
    if args.output.is_none() && args.report != "console" {
        return;
    }
    println!("{}", "🎮 Fulfillment Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s.eq_ignore_ascii_case("all")) {
        scenarios.retain(|s| !s.eq_ignore_ascii_case("all"));
        for (key, _) in list_scenarios() {
            if !scenarios.iter().any(|s| s == key) {
                scenarios.push(key.to_string());
            }
        }
    }
    scenarios
}

async fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
    game_tester: &GameTester,
) -> Result<Vec<ScenarioResult>> {
    let mut handles = Vec::new();
    for scenario_name in scenarios {
        let Some(scenario) = get_scenario(scenario_name, args.difficulty) else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
            continue;
        };
        let tester = LogicTester::new(game_tester.clone());
        let seeds = seeds.to_vec();
        let iterations = args.iterations;
        log::debug!("scheduling {} over {} seeds", scenario.name, seeds.len());
        handles.push(tokio::task::spawn_blocking(move || {
            tester.run_scenario(&scenario, &seeds, iterations)
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        let scenario_results = handle
            .await
            .map_err(|err| anyhow!("scenario worker panicked: {err}"))?;
        results.extend(scenario_results);
    }
    Ok(results)
}

type PlayabilitySummary = (Vec<PlayabilityRecord>, Vec<PlayabilityAggregate>);

async fn gather_playability(
    args: &Args,
    game_tester: &GameTester,
    seeds: &[u64],
) -> Result<PlayabilitySummary> {
    if !matches!(args.report.as_str(), "console" | "csv") {
        return Ok((Vec::new(), Vec::new()));
    }

    let difficulties: Vec<Difficulty> = args
        .difficulty
        .map_or_else(|| Difficulty::ALL.to_vec(), |d| vec![d]);
    let tester = game_tester.clone();
    let seeds = seeds.to_vec();
    let iterations = args.iterations;
    let records = tokio::task::spawn_blocking(move || {
        run_playability_analysis(&tester, &difficulties, &seeds, iterations)
    })
    .await
    .map_err(|err| anyhow!("playability worker panicked: {err}"))??;
    let aggregates = aggregate_playability(&records);
    Ok((records, aggregates))
}

fn write_reports(
    args: &Args,
    results: &[ScenarioResult],
    playability_records: &[PlayabilityRecord],
    playability_aggregates: &[PlayabilityAggregate],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            logic::reports::generate_json_report(&mut output_target, results)?;
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Fulfillment Logic Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        "csv" => {
            logic::reports::generate_csv_report(&mut output_target, playability_records)?;
        }
        _ => {
            let duration = start_time.elapsed();
            if results.is_empty() {
                writeln!(&mut output_target, "No logic scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    playability_aggregates,
                    duration,
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn base_args() -> Args {
        Args {
            scenarios: "smoke".to_string(),
            list_scenarios: false,
            seeds: "1337".to_string(),
            iterations: 1,
            difficulty: None,
            report: "json".to_string(),
            output: None,
            verbose: false,
            save_dir: None,
        }
    }

    fn temp_output(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "fulfillment-main-{label}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    fn sample_result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "Smoke Test".to_string(),
            seed: 1337,
            passed,
            iterations_run: 1,
            successful_iterations: usize::from(passed),
            failures: if passed {
                Vec::new()
            } else {
                vec!["boom".to_string()]
            },
            average_duration: Duration::from_millis(5),
            performance_data: vec![Duration::from_millis(5)],
        }
    }

    #[test]
    fn expand_scenarios_replaces_all_with_catalog() {
        let expanded = expand_scenarios("smoke, all");
        assert_eq!(expanded.first().map(String::as_str), Some("smoke"));
        assert_eq!(expanded.len(), list_scenarios().len());
        assert!(expanded.iter().any(|s| s == "mid-game-save"));
    }

    #[test]
    fn parse_difficulty_accepts_any_case() {
        assert_eq!(parse_difficulty(" HARD "), Ok(Difficulty::Hard));
        assert!(parse_difficulty("nightmare").is_err());
    }

    #[test]
    fn args_parse_from_command_line() {
        let args = Args::try_parse_from([
            "fulfillment-tester",
            "--scenarios",
            "smoke,deterministic",
            "--difficulty",
            "expert",
            "--report",
            "csv",
            "-v",
        ])
        .unwrap();
        assert_eq!(args.difficulty, Some(Difficulty::Expert));
        assert_eq!(args.report, "csv");
        assert!(args.verbose);
        assert!(Args::try_parse_from(["fulfillment-tester", "--report", "xml"]).is_err());
    }

    #[test]
    fn list_scenarios_writes_to_file() {
        let path = temp_output("list");
        let mut args = base_args();
        args.list_scenarios = true;
        args.output = Some(path.clone());
        assert!(maybe_list_scenarios(&args).unwrap());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Available scenarios:"));
        assert!(content.contains("save-round-trip"));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn list_scenarios_is_skipped_without_flag() {
        assert!(!maybe_list_scenarios(&base_args()).unwrap());
    }

    #[test]
    fn write_reports_emits_json_to_file() {
        let path = temp_output("json");
        let mut args = base_args();
        args.output = Some(path.clone());
        write_reports(&args, &[sample_result(false)], &[], &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value[0]["passed"], false);
        assert_eq!(value[0]["failures"][0], "boom");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn write_reports_handles_empty_markdown() {
        let path = temp_output("md");
        let mut args = base_args();
        args.report = "markdown".to_string();
        args.output = Some(path.clone());
        write_reports(&args, &[], &[], &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("_No scenarios executed._"));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn logic_scenarios_run_on_blocking_workers() {
        let mut args = base_args();
        args.scenarios = "smoke,unknown".to_string();
        args.difficulty = Some(Difficulty::Easy);
        let scenarios = expand_scenarios(&args.scenarios);
        let results = run_logic_scenarios(&args, &scenarios, &[1, 2], &GameTester::new(false))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed));
    }

    #[tokio::test]
    async fn playability_only_runs_for_tabular_reports() {
        let args = base_args();
        let (records, aggregates) = gather_playability(&args, &GameTester::new(false), &[1])
            .await
            .unwrap();
        assert!(records.is_empty() && aggregates.is_empty());

        let mut args = base_args();
        args.report = "csv".to_string();
        args.difficulty = Some(Difficulty::Normal);
        let (records, aggregates) = gather_playability(&args, &GameTester::new(false), &[1])
            .await
            .unwrap();
        assert_eq!(records.len(), fulfillment_game::StrategyId::ALL.len());
        assert_eq!(aggregates.len(), records.len());
    }
}
