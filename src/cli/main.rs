//! Batch background removal CLI
//!
//! `bgremove-batch run` processes every image under the configured bucket
//! prefix. Credentials come from the environment (or a `.env` file).

use super::progress::CliBatchProgress;
use crate::{
    batch::BatchDriver,
    config::BatchConfig,
    tracing_config::{spans, TracingConfig, TracingFormat},
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::time::Instant;
use tracing::{debug, info, Instrument};

/// Resumable batch background removal for bucket images
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgremove-batch")]
pub struct Cli {
    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console, global = true)]
    pub log_format: CliLogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Process every image under the configured bucket prefix
    Run,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliLogFormat {
    /// Colored human-readable output
    Console,
    /// Plain output without colors, for CI logs
    Compact,
    /// JSON lines
    #[cfg(feature = "tracing-json")]
    Json,
}

impl From<CliLogFormat> for TracingFormat {
    fn from(format: CliLogFormat) -> Self {
        match format {
            CliLogFormat::Console => TracingFormat::Console,
            CliLogFormat::Compact => TracingFormat::Compact,
            #[cfg(feature = "tracing-json")]
            CliLogFormat::Json => TracingFormat::Json,
        }
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format.into()).context("Failed to initialize tracing")?;

    match cli.command {
        Command::Run => run_batch().await,
    }
}

/// Initialize tracing based on verbosity level; `RUST_LOG` takes precedence
fn init_tracing(verbose_count: u8, format: TracingFormat) -> Result<()> {
    let mut config = TracingConfig::new()
        .with_verbosity(verbose_count)
        .with_format(format);

    if let Ok(filter) = std::env::var("RUST_LOG") {
        if !filter.trim().is_empty() {
            config = config.with_env_filter(filter);
        }
    }

    config.init().context("Failed to initialize tracing subscriber")?;
    debug!(verbosity = verbose_count, "Tracing initialized");

    Ok(())
}

async fn run_batch() -> Result<()> {
    let config = BatchConfig::from_env().context("Failed to load configuration")?;
    let driver = BatchDriver::from_config(&config).context("Failed to set up batch")?;

    info!("Starting batch background removal");
    info!(
        "Source: s3://{}/{} via {}",
        config.bucket, config.folder_prefix, config.storage_endpoint
    );
    info!("Output: {}", config.output_root.display());

    let start_time = Instant::now();
    let progress = CliBatchProgress::new();
    let summary = driver
        .run_with_progress(&progress)
        .instrument(spans::batch_run(&config.bucket, &config.folder_prefix))
        .await
        .context("Batch run failed")?;

    info!(
        "🏁 Finished {} image(s) in {:.2}s",
        summary.found,
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}
