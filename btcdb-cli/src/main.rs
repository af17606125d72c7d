//! btcdb CLI: daily update and table maintenance commands.
//!
//! Commands:
//! - `update`: fetch today's row, reconcile it into the table, then prune old logs
//! - `init`: create an empty table file
//! - `status`: row count, date range, sidecar hash and the last rows
//! - `export`: write the table as CSV
//! - `clean-logs`: prune dated log files past the retention window

mod export;
mod housekeeping;
mod logging;

use anyhow::{Context, Result};
use btcdb_core::data::{CoinGeckoSource, TableStore, YahooChartSource};
use btcdb_core::domain::{ObservationRow, Table};
use btcdb_runner::{
    Clock, PipelineConfig, PipelineRunner, RowBuilder, RunOutcome, ThreadSleeper, TracingSink,
    ZonedClock,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "btcdb", about = "Daily Bitcoin and market-index observation table")]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Table file. Overrides `store.path` from the config.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append today's observation row, with retry, then prune old logs.
    Update,
    /// Create an empty table file.
    Init,
    /// Show row count, date range and the most recent rows.
    Status {
        /// Number of trailing rows to print.
        #[arg(long, default_value_t = 5)]
        tail: usize,
    },
    /// Write the table as CSV.
    Export {
        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,
    },
    /// Remove dated log files older than the retention window.
    CleanLogs {
        /// Only list what would be removed.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = PipelineConfig::load_or_default(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.store.path = db;
    }
    let clock = ZonedClock::new(config.timezone()?);
    let today = clock.today();

    let to_file = matches!(cli.command, Commands::Update | Commands::CleanLogs { .. });
    if let Some(path) = logging::init(&config.logging, today, to_file)? {
        tracing::debug!(path = %path.display(), "logging to file");
    }

    let store = TableStore::new(&config.store.path);

    match cli.command {
        Commands::Update => run_update(&config, &store, &clock),
        Commands::Init => run_init(&store).map(|_| ExitCode::SUCCESS),
        Commands::Status { tail } => run_status(&store, tail).map(|_| ExitCode::SUCCESS),
        Commands::Export { out } => run_export(&store, &out).map(|_| ExitCode::SUCCESS),
        Commands::CleanLogs { dry_run } => {
            run_clean_logs(&config, today, dry_run).map(|_| ExitCode::SUCCESS)
        }
    }
}

fn run_update(config: &PipelineConfig, store: &TableStore, clock: &ZonedClock) -> Result<ExitCode> {
    let timeout = config.request_timeout();
    let crypto = CoinGeckoSource::new(
        &config.sources.coingecko_url,
        &config.sources.coin_id,
        &config.sources.vs_currency,
        timeout,
    )?;
    let instruments = YahooChartSource::new(&config.sources.yahoo_url, timeout)?;
    let sleeper = ThreadSleeper;
    let sink = TracingSink;

    let builder = RowBuilder::new(&crypto, &instruments, clock, &sleeper)
        .with_tickers(config.tickers()?)
        .with_pacing(config.instrument_delay());
    let report = PipelineRunner::new(store, builder, &sleeper, &sink, config.retry_policy()).run();

    // Housekeeping runs regardless of the pipeline outcome.
    if let Err(e) = run_clean_logs(config, clock.today(), false) {
        tracing::error!(error = %e, "log cleanup failed");
    }

    match report.outcome {
        RunOutcome::Completed { attempt, rows } => {
            println!(
                "Updated {} on attempt {attempt}: {rows} rows",
                store.path().display()
            );
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Exhausted { attempts } => {
            eprintln!("Update failed after {attempts} attempt(s); table left unchanged.");
            for a in &report.attempts {
                if let (Some(stage), Some(err)) = (a.failed_in, a.error.as_deref()) {
                    eprintln!("  attempt {}: {stage:?}: {err}", a.attempt);
                }
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_init(store: &TableStore) -> Result<()> {
    store
        .init_empty()
        .with_context(|| format!("initializing {}", store.path().display()))?;
    println!("Created empty table: {}", store.path().display());
    Ok(())
}

fn run_status(store: &TableStore, tail: usize) -> Result<()> {
    let table = store
        .load()
        .with_context(|| format!("loading {}", store.path().display()))?;

    println!("Table: {}", store.path().display());
    println!("Rows:  {}", table.len());
    match (table.first_date(), table.last_date()) {
        (Some(first), Some(last)) => println!("Range: {first} to {last}"),
        _ => println!("Range: (empty)"),
    }
    if let Some(meta) = store.meta() {
        println!("Hash:  {}", meta.data_hash);
        println!("Saved: {}", meta.written_at.format("%Y-%m-%d %H:%M:%S"));
    }

    if tail > 0 && !table.is_empty() {
        println!();
        print_rows(&table, tail);
    }
    Ok(())
}

fn print_rows(table: &Table, tail: usize) {
    let header: Vec<&str> = table
        .rows()
        .first()
        .map(|r| r.values().iter().map(|(name, _)| *name).collect())
        .unwrap_or_default();

    print!("{:<10}", "date");
    for name in &header {
        print!(" {:>20}", name);
    }
    println!();

    for row in table.tail(tail) {
        print_row(row);
    }
}

fn print_row(row: &ObservationRow) {
    print!("{:<10}", row.date.to_string());
    for (_, value) in row.values() {
        match value {
            Some(v) => print!(" {:>20.2}", v),
            None => print!(" {:>20}", "-"),
        }
    }
    println!();
}

fn run_export(store: &TableStore, out: &Path) -> Result<()> {
    let table = store
        .load()
        .with_context(|| format!("loading {}", store.path().display()))?;
    export::write_csv(&table, out)?;
    println!("Exported {} rows to {}", table.len(), out.display());
    Ok(())
}

fn run_clean_logs(config: &PipelineConfig, today: chrono::NaiveDate, dry_run: bool) -> Result<()> {
    let summary = housekeeping::clean_old_logs(
        &config.logging.dir,
        &config.logging.file_prefix,
        config.logging.retention_days,
        today,
        dry_run,
    )
    .with_context(|| format!("scanning {}", config.logging.dir.display()))?;

    let verb = if dry_run { "Would remove" } else { "Removed" };
    for path in &summary.removed {
        println!("{verb}: {}", path.display());
    }
    println!(
        "Scanned {} log file(s), {} {}, {} skipped.",
        summary.scanned,
        summary.removed.len(),
        if dry_run { "to remove" } else { "removed" },
        summary.skipped
    );
    Ok(())
}
