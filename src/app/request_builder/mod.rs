// Request builders - Single validation gate for operation requests

use std::sync::Arc;

use tracing::{debug, warn};

use crate::app::metadata_reader::MetadataReader;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;

/// Common surface of every request builder.
///
/// `build` never mutates the builder: calling it twice with unchanged
/// configuration yields equal requests or the same first error.
pub trait RequestBuilder {
    fn kind(&self) -> OperationKind;

    fn build(&self) -> Result<OperationRequest, DomainError>;
}

/// Inputs shared by all builders
#[derive(Clone)]
struct Inputs {
    reader: Arc<MetadataReader>,
    assets: Vec<AssetRef>,
    output: Option<OutputTarget>,
}

impl Inputs {
    fn new(reader: Arc<MetadataReader>) -> Self {
        Self {
            reader,
            assets: Vec::new(),
            output: None,
        }
    }

    fn require_assets(&self, kind: OperationKind) -> Result<(), DomainError> {
        if self.assets.is_empty() {
            return Err(DomainError::EmptyAssetSet(format!(
                "{} requires at least one asset",
                kind
            )));
        }
        if kind.is_single_asset() && self.assets.len() != 1 {
            return Err(DomainError::InvalidParameter(format!(
                "{} accepts exactly one asset, got {}",
                kind,
                self.assets.len()
            )));
        }
        Ok(())
    }

    /// Output is mandatory and must not overwrite one of the inputs
    fn require_output(&self, kind: OperationKind) -> Result<OutputTarget, DomainError> {
        let output = self.output.clone().ok_or_else(|| {
            DomainError::InvalidParameter(format!("{} requires an output target", kind))
        })?;
        let destination = output.resolved_path();
        if self.assets.iter().any(|asset| asset.path() == destination) {
            return Err(DomainError::InvalidParameter(format!(
                "{} output {} is also one of its inputs",
                kind,
                destination.display()
            )));
        }
        Ok(output)
    }

    /// Read every asset and reject the set if it cannot be combined
    fn require_compatible(&self, kind: OperationKind) -> Result<(), DomainError> {
        let metadatas = self.reader.read_all(&self.assets)?;
        if CompatibilityChecker::check(&metadatas)? {
            return Ok(());
        }

        let reason = CompatibilityChecker::explain(&metadatas)
            .map(|incompatibility| incompatibility.to_string())
            .unwrap_or_else(|| "assets differ".to_string());
        warn!("Rejecting {} of {} assets: {}", kind, self.assets.len(), reason);
        Err(DomainError::IncompatibleAssets(reason))
    }

    fn request(&self, config: OperationConfig, output: Option<OutputTarget>) -> OperationRequest {
        debug!(
            "Built {} request over {} asset(s)",
            config.kind(),
            self.assets.len()
        );
        OperationRequest::new(config, self.assets.clone(), output)
    }
}

/// Setters shared by every builder
macro_rules! input_setters {
    ($builder:ty) => {
        impl $builder {
            /// Append an input asset; order is preserved
            pub fn asset(mut self, asset: AssetRef) -> Self {
                self.inputs.assets.push(asset);
                self
            }

            pub fn assets(mut self, assets: impl IntoIterator<Item = AssetRef>) -> Self {
                self.inputs.assets.extend(assets);
                self
            }

            pub fn output(mut self, output: OutputTarget) -> Self {
                self.inputs.output = Some(output);
                self
            }
        }
    };
}

/// Audio noise reduction of a single asset
#[derive(Clone)]
pub struct DenoiseBuilder {
    inputs: Inputs,
}

impl DenoiseBuilder {
    pub fn new(reader: Arc<MetadataReader>) -> Self {
        Self {
            inputs: Inputs::new(reader),
        }
    }
}

input_setters!(DenoiseBuilder);

impl RequestBuilder for DenoiseBuilder {
    fn kind(&self) -> OperationKind {
        OperationKind::Denoise
    }

    fn build(&self) -> Result<OperationRequest, DomainError> {
        self.inputs.require_assets(self.kind())?;
        let output = self.inputs.require_output(self.kind())?;
        Ok(self.inputs.request(OperationConfig::Denoise, Some(output)))
    }
}

/// Compatibility verdict over an ordered set of assets
#[derive(Clone)]
pub struct CompareBuilder {
    inputs: Inputs,
}

impl CompareBuilder {
    pub fn new(reader: Arc<MetadataReader>) -> Self {
        Self {
            inputs: Inputs::new(reader),
        }
    }
}

input_setters!(CompareBuilder);

impl RequestBuilder for CompareBuilder {
    fn kind(&self) -> OperationKind {
        OperationKind::Compare
    }

    fn build(&self) -> Result<OperationRequest, DomainError> {
        self.inputs.require_assets(self.kind())?;
        Ok(self.inputs.request(OperationConfig::Compare, None))
    }
}

/// Sequential stream-copy append of compatible assets
#[derive(Clone)]
pub struct ConcatBuilder {
    inputs: Inputs,
    target_resolution: Option<Resolution>,
}

impl ConcatBuilder {
    pub fn new(reader: Arc<MetadataReader>) -> Self {
        Self {
            inputs: Inputs::new(reader),
            target_resolution: None,
        }
    }

    pub fn target_resolution(mut self, resolution: Resolution) -> Self {
        self.target_resolution = Some(resolution);
        self
    }
}

input_setters!(ConcatBuilder);

impl RequestBuilder for ConcatBuilder {
    fn kind(&self) -> OperationKind {
        OperationKind::Concat
    }

    fn build(&self) -> Result<OperationRequest, DomainError> {
        self.inputs.require_assets(self.kind())?;
        if let Some(resolution) = self.target_resolution {
            ParameterRules::validate_dimension("Target width", Some(resolution.width))?;
            ParameterRules::validate_dimension("Target height", Some(resolution.height))?;
        }
        let output = self.inputs.require_output(self.kind())?;

        self.inputs.require_compatible(self.kind())?;

        let config = OperationConfig::Concat(ConcatConfig {
            target_resolution: self.target_resolution,
        });
        Ok(self.inputs.request(config, Some(output)))
    }
}

/// Re-encoding merge of compatible assets at a common geometry
#[derive(Clone)]
pub struct MergeBuilder {
    inputs: Inputs,
    config: MergeConfig,
}

impl MergeBuilder {
    pub fn new(reader: Arc<MetadataReader>) -> Self {
        Self {
            inputs: Inputs::new(reader),
            config: MergeConfig::default(),
        }
    }

    pub fn target_resolution(mut self, resolution: Resolution) -> Self {
        self.config.target_resolution = Some(resolution);
        self
    }

    pub fn frame_rate(mut self, frame_rate: FrameRate) -> Self {
        self.config.frame_rate = frame_rate;
        self
    }

    pub fn video_codec(mut self, codec: VideoCodec) -> Self {
        self.config.video_codec = codec;
        self
    }
}

input_setters!(MergeBuilder);

impl RequestBuilder for MergeBuilder {
    fn kind(&self) -> OperationKind {
        OperationKind::Merge
    }

    fn build(&self) -> Result<OperationRequest, DomainError> {
        self.inputs.require_assets(self.kind())?;
        ParameterRules::validate_merge_resolution(self.config.target_resolution)?;
        let output = self.inputs.require_output(self.kind())?;

        self.inputs.require_compatible(self.kind())?;

        Ok(self
            .inputs
            .request(OperationConfig::Merge(self.config), Some(output)))
    }
}

/// Still frame extraction at a position
#[derive(Clone)]
pub struct ThumbnailBuilder {
    inputs: Inputs,
    config: ThumbnailConfig,
}

impl ThumbnailBuilder {
    pub fn new(reader: Arc<MetadataReader>) -> Self {
        Self {
            inputs: Inputs::new(reader),
            config: ThumbnailConfig::default(),
        }
    }

    pub fn position_ms(mut self, position_ms: u64) -> Self {
        self.config.position_ms = position_ms;
        self
    }

    pub fn width(mut self, width: u32) -> Self {
        self.config.width = Some(width);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.config.height = Some(height);
        self
    }

    pub fn precise(mut self, precise: bool) -> Self {
        self.config.precise = precise;
        self
    }
}

input_setters!(ThumbnailBuilder);

impl RequestBuilder for ThumbnailBuilder {
    fn kind(&self) -> OperationKind {
        OperationKind::Thumbnail
    }

    fn build(&self) -> Result<OperationRequest, DomainError> {
        self.inputs.require_assets(self.kind())?;
        ParameterRules::validate_dimension("Thumbnail width", self.config.width)?;
        ParameterRules::validate_dimension("Thumbnail height", self.config.height)?;
        let output = self.inputs.require_output(self.kind())?;

        let metadata = self.inputs.reader.read(&self.inputs.assets[0])?;
        ParameterRules::validate_position(self.config.position_ms, &metadata)?;

        Ok(self
            .inputs
            .request(OperationConfig::Thumbnail(self.config), Some(output)))
    }
}

/// Stream metadata of a single asset
#[derive(Clone)]
pub struct InfoBuilder {
    inputs: Inputs,
}

impl InfoBuilder {
    pub fn new(reader: Arc<MetadataReader>) -> Self {
        Self {
            inputs: Inputs::new(reader),
        }
    }
}

input_setters!(InfoBuilder);

impl RequestBuilder for InfoBuilder {
    fn kind(&self) -> OperationKind {
        OperationKind::Info
    }

    fn build(&self) -> Result<OperationRequest, DomainError> {
        self.inputs.require_assets(self.kind())?;
        Ok(self.inputs.request(OperationConfig::Info, None))
    }
}

/// Headless edit: trim, rotate and adjust volume
#[derive(Clone)]
pub struct EditBuilder {
    inputs: Inputs,
    config: EditConfig,
}

impl EditBuilder {
    pub fn new(reader: Arc<MetadataReader>) -> Self {
        Self {
            inputs: Inputs::new(reader),
            config: EditConfig::default(),
        }
    }

    /// Keep only `[start_ms, end_ms)`
    pub fn trim(mut self, start_ms: u64, end_ms: u64) -> Self {
        self.config.trim_start_ms = Some(start_ms);
        self.config.trim_end_ms = Some(end_ms);
        self
    }

    pub fn trim_start(mut self, start_ms: u64) -> Self {
        self.config.trim_start_ms = Some(start_ms);
        self
    }

    pub fn trim_end(mut self, end_ms: u64) -> Self {
        self.config.trim_end_ms = Some(end_ms);
        self
    }

    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.config.rotation = Some(rotation);
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.config.volume = volume;
        self
    }
}

input_setters!(EditBuilder);

impl RequestBuilder for EditBuilder {
    fn kind(&self) -> OperationKind {
        OperationKind::Edit
    }

    fn build(&self) -> Result<OperationRequest, DomainError> {
        self.inputs.require_assets(self.kind())?;
        ParameterRules::validate_volume(self.config.volume)?;
        ParameterRules::validate_trim_window(&self.config)?;
        let output = self.inputs.require_output(self.kind())?;

        if self.config.trims() {
            let metadata = self.inputs.reader.read(&self.inputs.assets[0])?;
            ParameterRules::validate_trim_against(&self.config, &metadata)?;
        }

        Ok(self
            .inputs
            .request(OperationConfig::Edit(self.config), Some(output)))
    }
}

#[cfg(test)]
mod tests;
