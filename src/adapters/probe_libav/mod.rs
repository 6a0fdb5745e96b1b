// Probe LibAV adapter - In-process media analysis through libav

use std::path::Path;

use ffmpeg_next as ffmpeg;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::MetadataProbePort;

/// LibAV-based metadata probe.
///
/// Rotation is read from the legacy `rotate` stream tag only.
#[derive(Debug, Default)]
pub struct LibavProbeAdapter;

impl LibavProbeAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataProbePort for LibavProbeAdapter {
    fn probe(&self, path: &Path) -> Result<MediaMetadata, DomainError> {
        ffmpeg::init().map_err(|e| {
            DomainError::NativeOperationFailed(format!("Failed to initialize FFmpeg: {}", e))
        })?;

        let ictx = ffmpeg::format::input(&path).map_err(|e| {
            DomainError::UnreadableAsset(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let video = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| DomainError::UnsupportedFormat("No video stream found".to_string()))?;

        let decoder = ffmpeg::codec::context::Context::from_parameters(video.parameters())
            .and_then(|ctx| ctx.decoder().video())
            .map_err(|e| DomainError::UnsupportedFormat(format!("Cannot decode video stream: {}", e)))?;

        let rotation = match video.metadata().get("rotate") {
            Some(tag) => tag
                .trim()
                .parse::<i32>()
                .ok()
                .map(Rotation::from_degrees)
                .transpose()?
                .unwrap_or_default(),
            None => Rotation::Deg0,
        };

        let audio = ictx.streams().best(ffmpeg::media::Type::Audio);
        let audio_codec = audio
            .as_ref()
            .map(|stream| stream.parameters().id().name().to_string());
        let audio_sample_rate = audio.as_ref().and_then(|stream| {
            ffmpeg::codec::context::Context::from_parameters(stream.parameters())
                .and_then(|ctx| ctx.decoder().audio())
                .ok()
                .map(|decoder| decoder.rate())
        });

        let duration_ms = if ictx.duration() > 0 {
            (ictx.duration() as f64 * 1000.0 / ffmpeg::ffi::AV_TIME_BASE as f64).round() as u64
        } else {
            0
        };

        let mut metadata = MediaMetadata::new(
            duration_ms,
            decoder.width(),
            decoder.height(),
            rotation,
            video.parameters().id().name(),
            audio_codec,
        )?;

        metadata.pixel_format = decoder
            .format()
            .descriptor()
            .map(|descriptor| descriptor.name().to_string());
        metadata.audio_sample_rate = audio_sample_rate;
        metadata.size_bytes = std::fs::metadata(path).ok().map(|m| m.len());
        metadata.container = Some(ictx.format().name().to_string());

        debug!(
            "libav probe of {}: {}x{} {} {}ms",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.video_codec,
            metadata.duration_ms
        );
        Ok(metadata)
    }
}
