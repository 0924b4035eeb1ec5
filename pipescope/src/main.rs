//! pipescope - execution analytics for an AI pipeline
//!
//! Fetches the last N hours of pipeline executions from the live store
//! (or synthetic data in demo mode) and reports aggregate metrics.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Store: $XDG_DATA_HOME/pipescope/pipeline_logs.db
//! - Logs: $XDG_STATE_HOME/pipescope/pipescope.log
//! - Config: $XDG_CONFIG_HOME/pipescope/config.toml

mod report;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use pipescope_core::alerts::{self, AlertThresholds};
use pipescope_core::metrics::{self, Aggregator};
use pipescope_core::sink::{self, JsonLinesSink, MetricsSink, TracingSink};
use pipescope_core::{
    Config, FetchOutcome, MockGenerator, PipelineLogs, SqliteStore, TimeWindow,
};

use crate::report::{RecentReport, SummaryReport};

#[derive(Parser)]
#[command(name = "pipescope")]
#[command(about = "Execution analytics for an AI pipeline")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/pipescope/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show KPIs, complexity breakdown, time series and alerts
    Summary(SummaryArgs),
    /// Show the most recent executions
    Recent(RecentArgs),
    /// Populate the live store with synthetic executions
    Seed(SeedArgs),
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Options shared by the commands that fetch records
#[derive(Args)]
struct FetchArgs {
    /// Hours of history to fetch
    #[arg(long, default_value_t = 24, allow_negative_numbers = true)]
    hours: i64,

    /// Serve synthetic data instead of reading the live store
    #[arg(long)]
    demo: bool,

    /// Seed for reproducible synthetic data
    #[arg(long)]
    seed: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Args)]
struct SummaryArgs {
    #[command(flatten)]
    fetch: FetchArgs,

    /// Append the summary as a JSON line to this file
    #[arg(long)]
    sink: Option<PathBuf>,
}

#[derive(Args)]
struct RecentArgs {
    #[command(flatten)]
    fetch: FetchArgs,

    /// Number of executions to show
    #[arg(short, long, default_value_t = 10)]
    limit: usize,
}

#[derive(Args)]
struct SeedArgs {
    /// Hours of history to generate, ending now
    #[arg(long, default_value_t = 24, allow_negative_numbers = true)]
    hours: i64,

    /// Mean executions per hour
    #[arg(long, default_value_t = 20.0)]
    rate: f64,

    /// Seed for reproducible data
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::load().context("failed to load configuration")?,
    };

    let _log_guard =
        pipescope_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("pipescope starting");

    match cli.command {
        Command::Summary(args) => run_summary(config, args),
        Command::Recent(args) => run_recent(config, args),
        Command::Seed(args) => run_seed(&config, args),
    }
}

/// Apply command-line overrides and fetch records behind a spinner
fn fetch(mut config: Config, args: &FetchArgs) -> Result<(Config, FetchOutcome)> {
    if args.demo {
        config.source.demo_mode = true;
    }
    if args.seed.is_some() {
        config.generator.seed = args.seed;
    }

    let logs = PipelineLogs::new(&config);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .context("invalid progress template")?,
    );
    pb.set_message(format!("Fetching last {}h of executions...", args.hours));
    pb.enable_steady_tick(Duration::from_millis(80));

    let outcome = logs.fetch_records(args.hours);

    pb.finish_and_clear();

    tracing::info!(
        hours = args.hours,
        records = outcome.records.len(),
        source = outcome.status.source.as_str(),
        fallback = outcome.status.is_fallback(),
        "Fetched records"
    );

    Ok((config, outcome))
}

fn run_summary(config: Config, args: SummaryArgs) -> Result<()> {
    let (config, outcome) = fetch(config, &args.fetch)?;

    let summary = Aggregator::from_config(&config.metrics)
        .with_window(outcome.status.window)
        .aggregate(&outcome.records);
    let alerts = alerts::evaluate(&summary, &AlertThresholds::from(&config.alerts));

    let jsonl = match &args.sink {
        Some(path) => Some(
            JsonLinesSink::open(path)
                .with_context(|| format!("failed to open sink {}", path.display()))?,
        ),
        None => None,
    };
    let mut sinks: Vec<&dyn MetricsSink> = vec![&TracingSink];
    if let Some(jsonl) = &jsonl {
        sinks.push(jsonl);
    }
    let stats = sink::publish_all(&sinks, &summary, &outcome.status);
    if stats.failed > 0 {
        eprintln!("Warning: {} sink(s) failed; see log for details", stats.failed);
    }

    let report = SummaryReport {
        hours: args.fetch.hours,
        status: &outcome.status,
        summary: &summary,
        alerts: &alerts,
    };

    match args.fetch.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize summary")?
        ),
        OutputFormat::Text => report.print_text(),
    }

    Ok(())
}

fn run_recent(config: Config, args: RecentArgs) -> Result<()> {
    let (_config, outcome) = fetch(config, &args.fetch)?;

    let report = RecentReport {
        hours: args.fetch.hours,
        status: &outcome.status,
        records: metrics::recent(&outcome.records, args.limit),
    };

    match args.fetch.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize executions")?
        ),
        OutputFormat::Text => report.print_text(),
    }

    Ok(())
}

fn run_seed(config: &Config, args: SeedArgs) -> Result<()> {
    if !args.rate.is_finite() || args.rate <= 0.0 {
        anyhow::bail!("--rate must be a positive number");
    }

    let window = TimeWindow::last_hours(Utc::now(), args.hours)
        .context("--hours must be a positive number of hours")?;

    let path = config.source.resolved_database_path();
    let store = SqliteStore::create(&path, &config.source.table, config.source.timeout())
        .with_context(|| format!("failed to create store at {}", path.display()))?;

    let records = MockGenerator::new(args.seed).generate(window.start, window.end, args.rate);

    let inserted = store
        .insert_records(&records)
        .context("failed to write records")?;
    let total = store.count().context("failed to count records")?;

    println!("Store: {}", path.display());
    println!(
        "Inserted {} execution(s) covering the last {}h ({} total in {})",
        inserted,
        args.hours,
        total,
        store.table()
    );

    tracing::info!(
        path = %path.display(),
        inserted,
        total,
        "Seeded live store"
    );

    Ok(())
}
