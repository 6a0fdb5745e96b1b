// Domain models - Assets, metadata, operation requests and outcomes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::domain::errors::{DomainError, ErrorKind};

/// Reference to a readable input video, resolved to an absolute path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    path: PathBuf,
}

impl AssetRef {
    /// Resolve a user-supplied path into an asset reference
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(DomainError::UnreadableAsset("Asset path cannot be empty".to_string()));
        }

        let resolved = std::fs::canonicalize(path).map_err(|e| {
            DomainError::UnreadableAsset(format!("Cannot resolve {}: {}", path.display(), e))
        })?;

        if !resolved.is_file() {
            return Err(DomainError::UnreadableAsset(format!(
                "Not a regular file: {}",
                resolved.display()
            )));
        }

        Ok(Self { path: resolved })
    }

    /// Wrap a path that the host has already resolved
    pub fn from_resolved(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Writable destination for an operation's result
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputTarget {
    path: PathBuf,
    extension: Option<String>,
}

impl OutputTarget {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(DomainError::InvalidParameter(
                "Output path cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            path,
            extension: None,
        })
    }

    /// Expect the produced file to carry the given container extension
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        let trimmed = extension.trim_start_matches('.').to_lowercase();
        self.extension = if trimmed.is_empty() { None } else { Some(trimmed) };
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn expected_extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// Path the toolkit writes to, with the expected extension applied
    pub fn resolved_path(&self) -> PathBuf {
        match &self.extension {
            Some(ext) => {
                let current = self
                    .path
                    .extension()
                    .map(|e| e.to_string_lossy().to_lowercase());
                if current.as_deref() == Some(ext.as_str()) {
                    self.path.clone()
                } else {
                    self.path.with_extension(ext)
                }
            }
            None => self.path.clone(),
        }
    }

    /// Asset reference for the produced file
    pub fn as_asset(&self) -> AssetRef {
        AssetRef::from_resolved(self.resolved_path())
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resolved_path().display())
    }
}

/// Open toolkit handle for a single asset
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaHandle {
    pub id: u64,
    pub path: PathBuf,
}

impl MediaHandle {
    pub fn new(id: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }
}

/// Display rotation of a video stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Normalize any multiple of 90 degrees, negative values included
    pub fn from_degrees(degrees: i32) -> Result<Self, DomainError> {
        match degrees.rem_euclid(360) {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            _ => Err(DomainError::InvalidParameter(format!(
                "Rotation must be a multiple of 90 degrees, got {}",
                degrees
            ))),
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// True when width and height swap on display
    pub fn is_transposed(&self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Frame geometry in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Result<Self, DomainError> {
        if width == 0 || height == 0 {
            return Err(DomainError::InvalidParameter(format!(
                "Resolution must be positive, got {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    /// Round both sides down to an even value, as most encoders require
    pub fn to_even(self) -> Self {
        Self {
            width: (self.width - self.width % 2).max(2),
            height: (self.height - self.height % 2).max(2),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Output frame rate for re-encoding operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FrameRate {
    Fps24,
    Fps25,
    #[default]
    Fps30,
    Fps50,
    Fps60,
}

impl FrameRate {
    pub fn value(&self) -> u32 {
        match self {
            FrameRate::Fps24 => 24,
            FrameRate::Fps25 => 25,
            FrameRate::Fps30 => 30,
            FrameRate::Fps50 => 50,
            FrameRate::Fps60 => 60,
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim() {
            "24" => Ok(FrameRate::Fps24),
            "25" => Ok(FrameRate::Fps25),
            "30" => Ok(FrameRate::Fps30),
            "50" => Ok(FrameRate::Fps50),
            "60" => Ok(FrameRate::Fps60),
            other => Err(DomainError::InvalidParameter(format!(
                "Unsupported frame rate: {}. Valid rates: 24, 25, 30, 50, 60",
                other
            ))),
        }
    }
}

/// Encoder used when an operation re-encodes video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VideoCodec {
    #[default]
    Libx264,
    H264,
    Hevc,
}

impl VideoCodec {
    pub fn encoder_name(&self) -> &'static str {
        match self {
            VideoCodec::Libx264 => "libx264",
            VideoCodec::H264 => "h264",
            VideoCodec::Hevc => "hevc",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_lowercase().as_str() {
            "libx264" => Ok(VideoCodec::Libx264),
            "h264" => Ok(VideoCodec::H264),
            "hevc" | "h265" => Ok(VideoCodec::Hevc),
            other => Err(DomainError::InvalidParameter(format!(
                "Unsupported video codec: {}. Valid codecs: libx264, h264, hevc",
                other
            ))),
        }
    }
}

/// Structural metadata of a single asset, valid for the asset state at read time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub duration_ms: u64,
    pub width: u32,
    pub height: u32,
    pub rotation: Rotation,
    pub video_codec: String,
    pub audio_codec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_sample_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

impl MediaMetadata {
    /// Create metadata, rejecting geometry or codecs no toolkit could have produced
    pub fn new(
        duration_ms: u64,
        width: u32,
        height: u32,
        rotation: Rotation,
        video_codec: impl Into<String>,
        audio_codec: Option<String>,
    ) -> Result<Self, DomainError> {
        let video_codec = video_codec.into();
        if video_codec.trim().is_empty() {
            return Err(DomainError::UnsupportedFormat(
                "No recognizable video codec".to_string(),
            ));
        }
        if width == 0 || height == 0 {
            return Err(DomainError::UnsupportedFormat(format!(
                "Video dimensions cannot be zero ({}x{})",
                width, height
            )));
        }

        Ok(Self {
            duration_ms,
            width,
            height,
            rotation,
            video_codec,
            audio_codec: audio_codec.filter(|codec| !codec.trim().is_empty()),
            pixel_format: None,
            audio_sample_rate: None,
            size_bytes: None,
            container: None,
        })
    }

    pub fn resolution(&self) -> Resolution {
        Resolution {
            width: self.width,
            height: self.height,
        }
    }

    /// Geometry as shown to the viewer, after applying rotation
    pub fn display_resolution(&self) -> Resolution {
        if self.rotation.is_transposed() {
            Resolution {
                width: self.height,
                height: self.width,
            }
        } else {
            self.resolution()
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio_codec.is_some()
    }
}

/// Closed set of operations the engine performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Denoise,
    Compare,
    Concat,
    Merge,
    Thumbnail,
    Info,
    Edit,
}

impl OperationKind {
    /// Operations whose result is a new media file
    pub fn produces_asset(&self) -> bool {
        matches!(
            self,
            OperationKind::Denoise
                | OperationKind::Concat
                | OperationKind::Merge
                | OperationKind::Thumbnail
                | OperationKind::Edit
        )
    }

    /// Operations that accept exactly one input asset
    pub fn is_single_asset(&self) -> bool {
        matches!(
            self,
            OperationKind::Denoise
                | OperationKind::Thumbnail
                | OperationKind::Info
                | OperationKind::Edit
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Denoise => "denoise",
            OperationKind::Compare => "compare",
            OperationKind::Concat => "concat",
            OperationKind::Merge => "merge",
            OperationKind::Thumbnail => "thumbnail",
            OperationKind::Info => "info",
            OperationKind::Edit => "edit",
        };
        f.write_str(name)
    }
}

/// Thumbnail extraction settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    pub position_ms: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Decode up to the exact frame instead of seeking to the nearest keyframe
    pub precise: bool,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            position_ms: 1000,
            width: None,
            height: None,
            precise: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConcatConfig {
    pub target_resolution: Option<Resolution>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MergeConfig {
    pub target_resolution: Option<Resolution>,
    pub frame_rate: FrameRate,
    pub video_codec: VideoCodec,
}

/// Headless edit: trim window, rotation override and volume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EditConfig {
    pub trim_start_ms: Option<u64>,
    pub trim_end_ms: Option<u64>,
    pub rotation: Option<Rotation>,
    pub volume: f32,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            trim_start_ms: None,
            trim_end_ms: None,
            rotation: None,
            volume: 1.0,
        }
    }
}

impl EditConfig {
    pub fn trims(&self) -> bool {
        self.trim_start_ms.is_some() || self.trim_end_ms.is_some()
    }
}

/// Validated, kind-specific configuration carried by a request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OperationConfig {
    Denoise,
    Compare,
    Concat(ConcatConfig),
    Merge(MergeConfig),
    Thumbnail(ThumbnailConfig),
    Info,
    Edit(EditConfig),
}

impl OperationConfig {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationConfig::Denoise => OperationKind::Denoise,
            OperationConfig::Compare => OperationKind::Compare,
            OperationConfig::Concat(_) => OperationKind::Concat,
            OperationConfig::Merge(_) => OperationKind::Merge,
            OperationConfig::Thumbnail(_) => OperationKind::Thumbnail,
            OperationConfig::Info => OperationKind::Info,
            OperationConfig::Edit(_) => OperationKind::Edit,
        }
    }
}

/// Immutable, validated description of one operation.
///
/// Only the request builders construct these, so every value observed by the
/// executor has passed validation. The type is deliberately not `Clone`:
/// executing a request consumes it.
#[derive(Debug, PartialEq)]
pub struct OperationRequest {
    config: OperationConfig,
    assets: Vec<AssetRef>,
    output: Option<OutputTarget>,
}

impl OperationRequest {
    pub(crate) fn new(
        config: OperationConfig,
        assets: Vec<AssetRef>,
        output: Option<OutputTarget>,
    ) -> Self {
        Self {
            config,
            assets,
            output,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.config.kind()
    }

    pub fn config(&self) -> &OperationConfig {
        &self.config
    }

    pub fn assets(&self) -> &[AssetRef] {
        &self.assets
    }

    pub fn output(&self) -> Option<&OutputTarget> {
        self.output.as_ref()
    }

    pub(crate) fn into_parts(self) -> (OperationConfig, Vec<AssetRef>, Option<OutputTarget>) {
        (self.config, self.assets, self.output)
    }
}

/// Successful result of an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperationResult {
    Asset(AssetRef),
    Compatibility(bool),
    Metadata(MediaMetadata),
}

/// Single terminal result of an executed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompletionOutcome {
    Success(OperationResult),
    Cancelled,
    Failure { kind: ErrorKind, message: String },
}

impl CompletionOutcome {
    pub fn failure(error: DomainError) -> Self {
        CompletionOutcome::Failure {
            kind: error.kind(),
            message: error.message().to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CompletionOutcome::Success(_))
    }

    /// Convert into a `Result`, with cancellation reported as `None`
    pub fn into_result(self) -> Result<Option<OperationResult>, DomainError> {
        match self {
            CompletionOutcome::Success(result) => Ok(Some(result)),
            CompletionOutcome::Cancelled => Ok(None),
            CompletionOutcome::Failure { kind, message } => {
                Err(DomainError::from_parts(kind, message))
            }
        }
    }
}

impl From<Result<OperationResult, DomainError>> for CompletionOutcome {
    fn from(result: Result<OperationResult, DomainError>) -> Self {
        match result {
            Ok(value) => CompletionOutcome::Success(value),
            Err(error) => CompletionOutcome::failure(error),
        }
    }
}

#[cfg(test)]
mod tests;

/// Identifier the engine assigns to every started request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a started request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Accepted, waiting for a concurrency slot
    Idle,
    Processing,
    Error,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Error | RequestStatus::Completed | RequestStatus::Cancelled
        )
    }
}

impl From<&CompletionOutcome> for RequestStatus {
    fn from(outcome: &CompletionOutcome) -> Self {
        match outcome {
            CompletionOutcome::Success(_) => RequestStatus::Completed,
            CompletionOutcome::Cancelled => RequestStatus::Cancelled,
            CompletionOutcome::Failure { .. } => RequestStatus::Error,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestStatus::Idle => "idle",
            RequestStatus::Processing => "processing",
            RequestStatus::Error => "error",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Status snapshot of one started request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: RequestId,
    pub kind: OperationKind,
    pub status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
