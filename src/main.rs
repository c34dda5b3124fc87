//! Workforce usage analytics ETL.
//!
//! Pulls roster, activity, and message extracts from the HR SQL Server,
//! derives coverage/activity/activation/retention/message metrics, and
//! writes them to a local DuckDB file read by the dashboards.

mod settings;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Days, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use duckdb_client::{DuckDbStore, WriteMode};
use pipeline::{Pipeline, PipelineOptions, UsagePipeline};
use sqlserver_client::SqlServerSource;
use telemetry::init_tracing;

use settings::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "usage-analytics", version, about = "Workforce usage analytics ETL")]
struct Cli {
    /// Configuration file (TOML). Defaults to config/default.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the pipeline for a target date.
    Run(RunArgs),
    /// Run the pipeline over the full history (same as `run --full-refresh`).
    RunFull {
        /// Target date (YYYY-MM-DD); defaults to yesterday.
        #[arg(long)]
        target_date: Option<NaiveDate>,
    },
    /// Create every derived table in the analytical store.
    InitSchema {
        /// Store file; defaults to the configured path.
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Target date (YYYY-MM-DD); defaults to yesterday.
    #[arg(long)]
    target_date: Option<NaiveDate>,

    /// Ignore the lookback window and pull the whole history.
    #[arg(long)]
    full_refresh: bool,

    /// Days before the target date to pull on incremental runs.
    #[arg(long)]
    lookback_days: Option<u32>,

    /// Merge into existing tables by key instead of replacing them.
    #[arg(long)]
    merge: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match settings::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {:#}", e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("logging setup failed: {}", e);
        return ExitCode::from(2);
    }
    info!("Starting usage analytics v{}", env!("CARGO_PKG_VERSION"));

    let outcome = match cli.command {
        Command::Run(args) => run(config, args).await,
        Command::RunFull { target_date } => {
            let args = RunArgs {
                target_date,
                full_refresh: true,
                lookback_days: None,
                merge: false,
            };
            run(config, args).await
        }
        Command::InitSchema { path } => init_schema(config, path),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig, args: RunArgs) -> Result<()> {
    let target_date = match args.target_date {
        Some(date) => date,
        None => yesterday()?,
    };
    let write_mode = if args.merge {
        WriteMode::Upsert
    } else {
        config.etl.write_mode
    };
    let options = PipelineOptions::new(target_date, config.etl.retention_baseline)
        .full_refresh(args.full_refresh)
        .lookback_days(args.lookback_days.unwrap_or(config.etl.lookback_days))
        .write_mode(write_mode);

    let source = Arc::new(
        SqlServerSource::new(config.source).context("Failed to configure source database")?,
    );
    let store = Arc::new(DuckDbStore::open(&config.store).context("Failed to open DuckDB store")?);

    let pipeline = UsagePipeline::new(source, store, options);
    let report = pipeline.run().await?;

    for table in &report.output {
        info!(table = %table.table, rows = table.rows_written, mode = %table.mode, "Table loaded");
    }
    info!(
        target_date = %target_date,
        elapsed_ms = report.elapsed.as_millis() as u64,
        rows_written = report.metrics.rows_written,
        "Pipeline finished"
    );
    Ok(())
}

fn init_schema(mut config: AppConfig, path: Option<PathBuf>) -> Result<()> {
    if let Some(path) = path {
        config.store.path = path;
    }
    let store = DuckDbStore::open(&config.store).context("Failed to open DuckDB store")?;
    duckdb_client::init_schema(&store).context("Failed to initialize schema")?;
    info!(path = store.db_path(), "Schema ready");
    Ok(())
}

fn yesterday() -> Result<NaiveDate> {
    Local::now()
        .date_naive()
        .checked_sub_days(Days::new(1))
        .context("Cannot compute yesterday's date")
}
