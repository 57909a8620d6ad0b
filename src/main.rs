//! stardust CLI: batch ETL from raw song-play JSON to a star-schema warehouse.

use std::path::PathBuf;

use clap::Parser;
use snafu::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stardust::error::{ConfigSnafu, EtlError};
use stardust::{pipeline, Config, EtlSession};

/// Batch ETL: song-play event logs to a star-schema Parquet warehouse.
#[derive(Parser, Debug)]
#[command(name = "stardust")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Dry run - validate configuration without processing.
    #[arg(long)]
    dry_run: bool,
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), EtlError> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("stardust starting");

    let config = Config::from_file(&args.config).context(ConfigSnafu)?;

    if args.dry_run {
        info!("Dry run mode - validating configuration");
        info!("Song data: {}", config.input.song_data);
        info!("Log data: {}", config.input.log_data);
        info!("Output: {}", config.output.path);
        info!("Compression: {}", config.output.compression.as_str());
        info!("Configuration is valid");
        return Ok(());
    }

    let session = EtlSession::new(&config).await?;
    let stats = pipeline::run(&session, &config).await?;

    info!("Pipeline completed successfully");
    info!("  songs rows written: {}", stats.songs);
    info!("  artists rows written: {}", stats.artists);
    info!("  users rows written: {}", stats.users);
    info!("  time rows written: {}", stats.time);
    info!("  songplays rows written: {}", stats.songplays);

    Ok(())
}
