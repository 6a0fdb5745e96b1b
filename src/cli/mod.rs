//! CLI module for vidops
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::EngineConfig;

pub mod args;
pub mod commands;

/// vidops - Validated video operations over ffmpeg
///
/// Every command builds a request, validates it against the input metadata
/// and runs it through the engine.
#[derive(Parser, Debug)]
#[command(name = "vidops")]
#[command(about = "vidops - Inspect, compare, concatenate, merge and edit videos")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file (default: ./vidops.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// ffmpeg executable
    #[arg(long, global = true)]
    pub ffmpeg_path: Option<String>,

    /// ffprobe executable
    #[arg(long, global = true)]
    pub ffprobe_path: Option<String>,

    /// Maximum number of operations running at once
    #[arg(long, global = true)]
    pub max_concurrent: Option<usize>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Command-line flags take precedence over file and environment
    pub fn apply_overrides(&self, config: &mut EngineConfig) {
        if let Some(level) = &self.log_level {
            config.log_level = level.to_lowercase();
        }
        if self.json_logs {
            config.json_logs = true;
        }
        if let Some(path) = &self.ffmpeg_path {
            config.ffmpeg_path = path.clone();
        }
        if let Some(path) = &self.ffprobe_path {
            config.ffprobe_path = path.clone();
        }
        if let Some(limit) = self.max_concurrent {
            config.max_concurrent_operations = limit;
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show stream metadata of a video
    Info(args::InfoArgs),
    /// Check whether videos can be joined without re-encoding
    Compare(args::CompareArgs),
    /// Join compatible videos back to back with stream copy
    Concat(args::ConcatArgs),
    /// Join videos by re-encoding them to a common frame
    Merge(args::MergeArgs),
    /// Reduce audio noise
    Denoise(args::DenoiseArgs),
    /// Extract a still frame
    Thumbnail(args::ThumbnailArgs),
    /// Trim, rotate or change volume, or open the interactive editor
    Edit(args::EditArgs),
}
