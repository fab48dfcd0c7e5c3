//! NCOA pipeline runner

use anyhow::Result;
use clap::Parser;
use ncoa_common::logging::{init_logging, LogConfig, LogLevel};
use ncoa_common::NcoaError;
use ncoa_pipeline::config::VerifyMode;
use ncoa_pipeline::{
    db, ExtractOptions, Extractor, LiveNcoa, NcoaJob, NcoaVerifier, PipelineConfig, Reconciler,
    SimulatedNcoa, Storage,
};
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ncoa")]
#[command(author, version, about = "NCOA address verification pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Run the full verification pipeline once
    Run {
        /// Cap the number of extracted rows (overrides NCOA_QUERY_LIMIT)
        #[arg(long)]
        limit: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::from_env()
        .unwrap_or_default()
        .with_level(log_level);
    init_logging(&log_config)?;

    match cli.command {
        Command::Run { limit } => run(limit).await?,
    }

    Ok(())
}

async fn run(limit: Option<i64>) -> Result<()> {
    let config = PipelineConfig::load()?;

    let pool = db::create_pool(&config.database).await?;
    sqlx::migrate!("../ncoa-pipeline/migrations").run(&pool).await?;

    let storage = Storage::new(&config.storage);

    let verifier: Box<dyn NcoaVerifier> = match config.ncoa.verify_mode {
        VerifyMode::Simulated => Box::new(SimulatedNcoa::from_fixture(&config.ncoa.fixture_path)?),
        VerifyMode::Live => {
            // Presence of both values is checked by config validation.
            let api_url = config.ncoa.api_url.clone().unwrap_or_default();
            let api_key = config.ncoa.api_key.clone().unwrap_or_default();
            Box::new(LiveNcoa::new(api_url, api_key))
        },
    };

    let extractor = Extractor::new(
        pool.clone(),
        config.ncoa.source_table.clone(),
        config.ncoa.state_code.clone(),
    );
    let reconciler = Reconciler::new(pool, config.ncoa.status_table.clone());

    let job = NcoaJob::new();
    let opts = ExtractOptions {
        limit: limit.or(config.ncoa.query_limit),
    };

    let deadline = Duration::from_secs(config.job.timeout_secs);
    let summary = tokio::time::timeout(
        deadline,
        ncoa_pipeline::run_job(&job, &extractor, &storage, verifier.as_ref(), &reconciler, opts),
    )
    .await
    .map_err(|_| NcoaError::DeadlineExceeded(config.job.timeout_secs))??;

    info!(
        job_id = %summary.job_id,
        extracted = summary.extracted_rows,
        verified = summary.verified_rows,
        request_key = %summary.request_key,
        response_key = %summary.response_key,
        reconciled = summary.reconcile.rows_affected,
        "Pipeline run finished"
    );

    Ok(())
}
