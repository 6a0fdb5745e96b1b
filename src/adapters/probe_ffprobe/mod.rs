//! FFprobe adapter for media file probing
//!
//! Runs `ffprobe -print_format json -show_format -show_streams` and maps the
//! first video and audio streams into [`MediaMetadata`].

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::MetadataProbePort;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    pix_fmt: Option<String>,
    sample_rate: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<SideData>,
}

#[derive(Debug, Deserialize)]
struct SideData {
    side_data_type: Option<String>,
    rotation: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    size: Option<String>,
    format_name: Option<String>,
}

impl ProbeStream {
    fn is(&self, codec_type: &str) -> bool {
        self.codec_type.as_deref() == Some(codec_type)
    }

    /// Display matrix rotation is counter-clockwise; the legacy `rotate` tag is clockwise
    fn rotation(&self) -> Result<Rotation, DomainError> {
        let matrix = self
            .side_data_list
            .iter()
            .find(|side| side.side_data_type.as_deref() == Some("Display Matrix"))
            .and_then(|side| side.rotation);

        match matrix {
            Some(degrees) => Rotation::from_degrees(-degrees),
            None => match self.tags.get("rotate").and_then(|v| v.trim().parse::<i32>().ok()) {
                Some(degrees) => Rotation::from_degrees(degrees),
                None => Ok(Rotation::Deg0),
            },
        }
    }
}

/// Seconds as printed by ffprobe to whole milliseconds
fn seconds_to_millis(value: Option<&str>) -> Option<u64> {
    let seconds: f64 = value?.trim().parse().ok()?;
    if seconds.is_finite() && seconds >= 0.0 {
        Some((seconds * 1000.0).round() as u64)
    } else {
        None
    }
}

/// Map ffprobe JSON output into metadata
pub fn parse_probe_json(json: &str) -> Result<MediaMetadata, DomainError> {
    let output: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| DomainError::UnreadableAsset(format!("Invalid ffprobe output: {}", e)))?;

    let video = output
        .streams
        .iter()
        .find(|stream| stream.is("video"))
        .ok_or_else(|| DomainError::UnsupportedFormat("No video stream found".to_string()))?;
    let audio = output.streams.iter().find(|stream| stream.is("audio"));

    let format = output.format.as_ref();
    let duration_ms = format
        .and_then(|f| seconds_to_millis(f.duration.as_deref()))
        .or_else(|| seconds_to_millis(video.duration.as_deref()))
        .unwrap_or(0);

    // A rotation that is not a right angle is reported but not representable
    let rotation = video.rotation().map_err(|e| {
        DomainError::UnsupportedFormat(format!("Unsupported rotation: {}", e.message()))
    })?;

    let mut metadata = MediaMetadata::new(
        duration_ms,
        video.width.unwrap_or(0),
        video.height.unwrap_or(0),
        rotation,
        video.codec_name.clone().unwrap_or_default(),
        audio.and_then(|a| a.codec_name.clone()),
    )?;

    metadata.pixel_format = video.pix_fmt.clone();
    metadata.audio_sample_rate = audio
        .and_then(|a| a.sample_rate.as_deref())
        .and_then(|rate| rate.parse().ok());
    metadata.size_bytes = format
        .and_then(|f| f.size.as_deref())
        .and_then(|size| size.parse().ok());
    metadata.container = format.and_then(|f| f.format_name.clone());

    Ok(metadata)
}

/// FFprobe-based probe adapter
pub struct FfprobeAdapter {
    ffprobe_path: String,
}

impl FfprobeAdapter {
    pub fn new(ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

impl MetadataProbePort for FfprobeAdapter {
    fn probe(&self, path: &Path) -> Result<MediaMetadata, DomainError> {
        let mut cmd = Command::new(&self.ffprobe_path);
        cmd.args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path);

        debug!("Executing ffprobe command: {:?}", cmd);

        let output = cmd.output().map_err(|e| {
            DomainError::NativeOperationFailed(format!("Failed to execute ffprobe: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DomainError::UnreadableAsset(format!(
                "ffprobe could not read {}: {}",
                path.display(),
                stderr.trim()
            )));
        }

        parse_probe_json(&String::from_utf8_lossy(&output.stdout))
    }
}
