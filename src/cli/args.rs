//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Args, ValueEnum};

/// Output format for metadata
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

/// Arguments for the info command
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the compare command
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Input video file paths, in order (repeat -i)
    #[arg(short, long, required = true)]
    pub input: Vec<PathBuf>,

    /// Output the verdict as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the concat command
#[derive(Args, Debug)]
pub struct ConcatArgs {
    /// Input video file paths, in order (repeat -i)
    #[arg(short, long, required = true)]
    pub input: Vec<PathBuf>,

    /// Output file path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Re-encode to this width (requires --height)
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Re-encode to this height (requires --width)
    #[arg(long, requires = "width")]
    pub height: Option<u32>,
}

/// Arguments for the merge command
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Input video file paths, in order (repeat -i)
    #[arg(short, long, required = true)]
    pub input: Vec<PathBuf>,

    /// Output file path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Target width (default: widest input)
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Target height (default: tallest input)
    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    /// Output frame rate (24, 25, 30, 50, 60)
    #[arg(long, default_value = "30")]
    pub fps: String,

    /// Video encoder (libx264, h264, hevc)
    #[arg(long, default_value = "libx264")]
    pub codec: String,
}

/// Arguments for the denoise command
#[derive(Args, Debug)]
pub struct DenoiseArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file path
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Arguments for the thumbnail command
#[derive(Args, Debug)]
pub struct ThumbnailArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output image path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Position (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long, default_value = "1")]
    pub position: String,

    /// Thumbnail width (default: keep aspect ratio)
    #[arg(long)]
    pub width: Option<u32>,

    /// Thumbnail height (default: keep aspect ratio)
    #[arg(long)]
    pub height: Option<u32>,

    /// Decode up to the exact frame instead of the nearest keyframe
    #[arg(long)]
    pub precise: bool,
}

/// Arguments for the edit command
#[derive(Args, Debug)]
pub struct EditArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Trim start (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long)]
    pub start: Option<String>,

    /// Trim end (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long)]
    pub end: Option<String>,

    /// Display rotation in degrees (multiple of 90)
    #[arg(long, allow_hyphen_values = true)]
    pub rotate: Option<i32>,

    /// Volume multiplier (0.0 mutes, 1.0 keeps, up to 2.0)
    #[arg(long, default_value = "1.0")]
    pub volume: f32,

    /// Open the configured interactive editor instead (Ctrl-C cancels)
    #[arg(long, conflicts_with_all = ["start", "end", "rotate"])]
    pub interactive: bool,
}
