// Domain rules - Compatibility and parameter policies

use std::fmt;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Smallest side accepted for a merge target resolution
pub const MIN_MERGE_DIMENSION: u32 = 128;

/// Accepted volume multiplier range for edits
pub const VOLUME_RANGE: (f32, f32) = (0.0, 2.0);

/// Attribute that prevents two assets from being combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchedAttribute {
    VideoCodec,
    AudioCodec,
    Width,
    Height,
    Rotation,
}

impl fmt::Display for MismatchedAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MismatchedAttribute::VideoCodec => "video codec",
            MismatchedAttribute::AudioCodec => "audio codec",
            MismatchedAttribute::Width => "width",
            MismatchedAttribute::Height => "height",
            MismatchedAttribute::Rotation => "rotation",
        };
        f.write_str(name)
    }
}

/// First difference found between the reference asset and another one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incompatibility {
    /// Position of the offending asset in the input order
    pub index: usize,
    pub attribute: MismatchedAttribute,
    pub expected: String,
    pub found: String,
}

impl fmt::Display for Incompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "asset #{} differs in {}: expected {}, found {}",
            self.index, self.attribute, self.expected, self.found
        )
    }
}

/// Decides whether assets can be concatenated or merged without re-encoding
pub struct CompatibilityChecker;

impl CompatibilityChecker {
    /// Check an ordered set of metadata; an empty set is an error, not a vacuous true
    pub fn check(metadatas: &[MediaMetadata]) -> Result<bool, DomainError> {
        if metadatas.is_empty() {
            return Err(DomainError::EmptyAssetSet(
                "Compatibility check needs at least one asset".to_string(),
            ));
        }
        Ok(Self::explain(metadatas).is_none())
    }

    /// Describe the first incompatibility, comparing every asset to the first one
    pub fn explain(metadatas: &[MediaMetadata]) -> Option<Incompatibility> {
        let (reference, rest) = metadatas.split_first()?;

        rest.iter().enumerate().find_map(|(offset, other)| {
            Self::first_mismatch(reference, other).map(|(attribute, expected, found)| {
                Incompatibility {
                    index: offset + 1,
                    attribute,
                    expected,
                    found,
                }
            })
        })
    }

    fn first_mismatch(
        reference: &MediaMetadata,
        other: &MediaMetadata,
    ) -> Option<(MismatchedAttribute, String, String)> {
        if reference.video_codec != other.video_codec {
            return Some((
                MismatchedAttribute::VideoCodec,
                reference.video_codec.clone(),
                other.video_codec.clone(),
            ));
        }
        if reference.audio_codec != other.audio_codec {
            return Some((
                MismatchedAttribute::AudioCodec,
                Self::describe_audio(&reference.audio_codec),
                Self::describe_audio(&other.audio_codec),
            ));
        }
        if reference.width != other.width {
            return Some((
                MismatchedAttribute::Width,
                reference.width.to_string(),
                other.width.to_string(),
            ));
        }
        if reference.height != other.height {
            return Some((
                MismatchedAttribute::Height,
                reference.height.to_string(),
                other.height.to_string(),
            ));
        }
        if reference.rotation != other.rotation {
            return Some((
                MismatchedAttribute::Rotation,
                reference.rotation.to_string(),
                other.rotation.to_string(),
            ));
        }
        None
    }

    fn describe_audio(codec: &Option<String>) -> String {
        codec.clone().unwrap_or_else(|| "no audio".to_string())
    }
}

/// Business rules for operation parameters
pub struct ParameterRules;

impl ParameterRules {
    /// Requested dimension, when present, must be positive
    pub fn validate_dimension(name: &str, value: Option<u32>) -> Result<(), DomainError> {
        match value {
            Some(0) => Err(DomainError::InvalidParameter(format!(
                "{} must be positive",
                name
            ))),
            _ => Ok(()),
        }
    }

    pub fn validate_merge_resolution(resolution: Option<Resolution>) -> Result<(), DomainError> {
        if let Some(resolution) = resolution {
            if resolution.width < MIN_MERGE_DIMENSION || resolution.height < MIN_MERGE_DIMENSION {
                return Err(DomainError::InvalidParameter(format!(
                    "Merge resolution must be at least {}x{}, got {}",
                    MIN_MERGE_DIMENSION, MIN_MERGE_DIMENSION, resolution
                )));
            }
        }
        Ok(())
    }

    /// Position must fall within [0, duration]
    pub fn validate_position(position_ms: u64, metadata: &MediaMetadata) -> Result<(), DomainError> {
        if position_ms > metadata.duration_ms {
            return Err(DomainError::InvalidParameter(format!(
                "Position {}ms is beyond the asset duration of {}ms",
                position_ms, metadata.duration_ms
            )));
        }
        Ok(())
    }

    pub fn validate_volume(volume: f32) -> Result<(), DomainError> {
        let (min, max) = VOLUME_RANGE;
        if !volume.is_finite() || volume < min || volume > max {
            return Err(DomainError::InvalidParameter(format!(
                "Volume must be between {} and {}, got {}",
                min, max, volume
            )));
        }
        Ok(())
    }

    /// Trim window must be non-empty when both ends are given
    pub fn validate_trim_window(config: &EditConfig) -> Result<(), DomainError> {
        if let (Some(start), Some(end)) = (config.trim_start_ms, config.trim_end_ms) {
            if start >= end {
                return Err(DomainError::InvalidParameter(format!(
                    "Trim start ({}ms) must be before trim end ({}ms)",
                    start, end
                )));
            }
        }
        Ok(())
    }

    /// Trim bounds must lie inside the asset
    pub fn validate_trim_against(config: &EditConfig, metadata: &MediaMetadata) -> Result<(), DomainError> {
        let start = config.trim_start_ms.unwrap_or(0);
        let end = config.trim_end_ms.unwrap_or(metadata.duration_ms);

        if start >= metadata.duration_ms && config.trim_start_ms.is_some() {
            return Err(DomainError::InvalidParameter(format!(
                "Trim start {}ms is beyond the asset duration of {}ms",
                start, metadata.duration_ms
            )));
        }
        if end > metadata.duration_ms {
            return Err(DomainError::InvalidParameter(format!(
                "Trim end {}ms is beyond the asset duration of {}ms",
                end, metadata.duration_ms
            )));
        }
        if start >= end {
            return Err(DomainError::InvalidParameter(format!(
                "Trim window {}ms..{}ms is empty",
                start, end
            )));
        }
        Ok(())
    }
}
