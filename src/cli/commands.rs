//! CLI command definitions for mavis-bench.
//!
//! `run` executes a benchmark batch, `compile` builds the search client and
//! `strategies` lists the search strategies the client understands.

use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use crate::export::{write_back, write_json, write_report};
use crate::runner::{
    compile_client, BatchOrchestrator, CommandAdapter, ExecutionOutcome, HarnessConfig, OutcomeStatus,
    ProgressEvent, ProgressSink, ServerAdapter, SolverAdapter, Strategy,
};
use crate::tasks::TaskSource;

/// Report name used when no output path and no filter are given.
const DEFAULT_OUTPUT_FILE: &str = "benchmark_results.md";

/// Benchmark harness for the MAvis hospital search client.
#[derive(Parser)]
#[command(name = "mavis-bench")]
#[command(about = "Benchmark the MAvis hospital search client over a batch of levels")]
#[command(version)]
#[command(
    long_about = "mavis-bench runs the MAvis server and search client over a batch of levels, enforces a per-level time budget, parses the client's statistics and writes a Markdown report.\n\nExample usage:\n  mavis-bench run -s greedy -f SA\n  mavis-bench run -s bfs -f MAPF -o results-bfs-MAPF.md\n  mavis-bench run --table tasks.yaml --compile"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "warn", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run a benchmark batch.
    ///
    /// Levels come either from the levels directory, optionally filtered by
    /// file name prefix, or from a task table naming a strategy per row. The
    /// exit status is 0 only if every level was solved.
    #[command(alias = "bench")]
    Run(RunArgs),

    /// Compile the search client with javac.
    Compile(CompileArgs),

    /// List the available search strategies.
    Strategies,
}

/// Arguments for `mavis-bench run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Search strategy (bfs, dfs, astar, wastar, greedy). Defaults to bfs.
    /// A task table names its own strategy per row.
    #[arg(short, long, conflicts_with = "table")]
    pub strategy: Option<Strategy>,

    /// Only run levels whose file name starts with this prefix (e.g. SA, MA, MAPF).
    #[arg(short, long, conflicts_with = "table")]
    pub filter: Option<String>,

    /// Task table (.xlsx, JSON or YAML workbook) naming a level and strategy per row.
    /// Results are written back into it.
    #[arg(long)]
    pub table: Option<PathBuf>,

    /// Timeout per level in seconds. Defaults to 180.
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Markdown report path. Defaults to results-<strategy>-<filter>.md when a
    /// filter is given, benchmark_results.md otherwise.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write the batch as JSON to this path.
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Compile the search client before running.
    #[arg(long)]
    pub compile: bool,

    #[command(flatten)]
    pub harness: HarnessArgs,

    /// Run this command instead of the MAvis server. `{instance}`,
    /// `{strategy}` and `{timeout}` are substituted per level.
    #[arg(long)]
    pub solver_cmd: Option<String>,
}

/// Arguments for `mavis-bench compile`.
#[derive(Parser, Debug)]
pub struct CompileArgs {
    #[command(flatten)]
    pub harness: HarnessArgs,
}

/// Options locating the harness configuration and artifacts.
#[derive(clap::Args, Debug, Default)]
pub struct HarnessArgs {
    /// YAML configuration file.
    #[arg(long, env = "MAVIS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory containing level files.
    #[arg(long)]
    pub levels_dir: Option<PathBuf>,

    /// Path to the competition server jar.
    #[arg(long)]
    pub server_jar: Option<PathBuf>,
}

impl HarnessArgs {
    /// Builds the configuration: defaults, then the config file, then
    /// `MAVIS_*` variables, then these flags.
    fn load_config(&self) -> anyhow::Result<HarnessConfig> {
        let config = match &self.config {
            Some(path) => HarnessConfig::from_yaml_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => HarnessConfig::default(),
        };
        let mut config = config.apply_env()?;

        if let Some(dir) = &self.levels_dir {
            config.levels_dir = dir.clone();
        }
        if let Some(jar) = &self.server_jar {
            config.server_jar = jar.clone();
        }
        Ok(config)
    }
}

/// Parse CLI arguments without running.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<ExitCode> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Run(args) => run_benchmark_command(args).await,
        Commands::Compile(args) => {
            run_compile_command(args).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Strategies => {
            for strategy in Strategy::ALL {
                println!("{:<8} {}", strategy.as_str(), strategy.client_flag());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// Run Command Implementation
// ============================================================================

async fn run_benchmark_command(args: RunArgs) -> anyhow::Result<ExitCode> {
    let mut config = args.harness.load_config()?;
    if let Some(strategy) = args.strategy {
        config.default_strategy = strategy;
    }
    if let Some(secs) = args.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    config.validate()?;

    let source = match &args.table {
        Some(table) => TaskSource::structured_table(&config, table),
        None => TaskSource::directory_scan(&config, args.filter.clone().unwrap_or_default()),
    };
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(config.default_strategy, args.filter.as_deref()));

    print_banner(&config, &source);

    let adapter: Arc<dyn SolverAdapter> = match &args.solver_cmd {
        Some(cmd) => Arc::new(CommandAdapter::parse(cmd)?),
        None => Arc::new(ServerAdapter::from_config(&config)),
    };

    if args.compile {
        println!("Compiling {}/*.java ...", config.client_dir.display());
        compile_client(&config).await?;
        println!("Compilation successful.\n");
    }

    let orchestrator = BatchOrchestrator::new(config, adapter).with_progress(console_progress());
    let tasks = orchestrator.prepare(&source).await?;
    println!("Found {} level(s).\n", tasks.len());

    let batch = orchestrator.execute(&source.describe(), tasks).await;

    write_report(&batch, &output)?;
    if let Some(json_path) = &args.json_output {
        write_json(&batch, json_path)?;
    }
    if let Some(table) = source.table_path() {
        let rows = write_back(&batch, table)?;
        info!(rows, table = %table.display(), "Task table updated");
    }

    let counts = batch.counts();
    println!("\n{}", "=".repeat(60));
    println!("  Results saved to {}", output.display());
    println!("  Score: {}/{} solved", counts.solved, counts.total);
    println!("{}", "=".repeat(60));

    if batch.all_solved() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(
            unsolved = counts.total - counts.solved,
            "Not every level was solved"
        );
        Ok(ExitCode::FAILURE)
    }
}

async fn run_compile_command(args: CompileArgs) -> anyhow::Result<()> {
    let config = args.harness.load_config()?;
    println!("Compiling {}/*.java ...", config.client_dir.display());
    let files = compile_client(&config).await?;
    println!("Compilation successful ({files} file(s)).");
    Ok(())
}

/// CI matrix naming: `results-<strategy>-<filter>.md` when filtered.
fn default_output_path(strategy: Strategy, filter: Option<&str>) -> PathBuf {
    match filter.filter(|f| !f.is_empty()) {
        Some(filter) => PathBuf::from(format!("results-{strategy}-{filter}.md")),
        None => PathBuf::from(DEFAULT_OUTPUT_FILE),
    }
}

fn print_banner(config: &HarnessConfig, source: &TaskSource) {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    println!("{}", "=".repeat(60));
    println!("  MAvis Hospital Benchmark");
    println!("  Strategy : {}", banner_strategy(config, source));
    println!("  Timeout  : {}s per level", config.timeout.as_secs());
    println!("  Source   : {}", source.describe());
    println!("  CWD      : {}", cwd.display());
    println!("{}", "=".repeat(60));
    println!();
}

fn banner_strategy(config: &HarnessConfig, source: &TaskSource) -> String {
    match source.table_path() {
        Some(_) => "per table row".to_string(),
        None => config.default_strategy.to_string(),
    }
}

/// Prints one console line per level, started before the run and completed
/// with its status afterwards.
fn console_progress() -> ProgressSink {
    Arc::new(|event: &ProgressEvent<'_>| match event.outcome {
        None => {
            print!("  {:<40}", event.task.instance_id);
            let _ = std::io::stdout().flush();
        }
        Some(outcome) => println!("  {}", progress_summary(outcome)),
    })
}

fn progress_summary(outcome: &ExecutionOutcome) -> String {
    let time = outcome
        .cpu_time_seconds
        .map(|t| format!("{t:.3}"))
        .unwrap_or_else(|| "-".to_string());

    match outcome.status {
        OutcomeStatus::Solved => format!(
            "Solved  len={:>6}  t={:>8}s",
            outcome
                .solution_length
                .map(|l| l.to_string())
                .unwrap_or_else(|| "-".to_string()),
            time
        ),
        OutcomeStatus::NoSolution => format!("No solution  t={time:>8}s"),
        OutcomeStatus::ProcessError => match outcome.exit_code {
            Some(code) => format!("Error (exit {code})"),
            None => "Error (killed by signal)".to_string(),
        },
        OutcomeStatus::Timeout => format!(
            "⏱️  Timeout (>{:.0}s)",
            outcome.wall_time_seconds.unwrap_or_default()
        ),
        OutcomeStatus::InternalException => format!(
            "Exception: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        ),
        OutcomeStatus::Skipped => "Skipped (level file not found)".to_string(),
    }
}
