//! vidops CLI
//!
//! Drives the video operation engine against the ffmpeg and ffprobe
//! executables.
//!
//! # Usage
//!
//! ```bash
//! vidops info -i clip.mp4 --format json
//! vidops compare -i a.mp4 -i b.mp4
//! vidops concat -i a.mp4 -i b.mp4 -o joined.mp4
//! vidops merge -i a.mp4 -i b.mp4 -o merged.mp4 --width 1280 --height 720 --fps 30
//! vidops thumbnail -i clip.mp4 -o thumb.png --position 00:00:02.5 --precise
//! vidops edit -i clip.mp4 -o trimmed.mp4 --start 1 --end 4 --volume 0.5
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use vidops::app::Engine;
use vidops::cli::{commands, Cli};
use vidops::config::EngineConfig;
use vidops::utils::logging::{init_logging, LogFormat};

/// Main entry point for the vidops CLI application
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        EngineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;

    init_logging(&config.log_level, LogFormat::from_json_flag(config.json_logs))?;

    info!("Starting vidops");
    debug!("Effective configuration: {:?}", config);

    let engine = Engine::with_ffmpeg(config);
    commands::dispatch(&engine, cli.command).await?;

    info!("vidops completed successfully");
    Ok(())
}
