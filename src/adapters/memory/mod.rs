// Memory toolkit adapter - Scripted in-process toolkit for tests and dry runs

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::MediaToolkitPort;

/// What `run_transform` does when invoked
#[derive(Debug, Clone, PartialEq)]
pub enum TransformBehavior {
    /// Register the output as a readable asset
    Produce,
    /// Report success without producing anything
    SkipOutput,
    /// Report a native failure with the given message
    Fail(String),
}

/// What the interactive editor does when launched
#[derive(Debug, Clone, PartialEq)]
pub enum EditorBehavior {
    /// User saves the edit into the output target
    Save,
    /// User closes the editor without saving
    Cancel,
    /// Editor crashes
    Fail(String),
    /// Editor never returns on its own
    Hang,
}

/// Recorded `run_transform` invocation
#[derive(Debug, Clone, PartialEq)]
pub struct TransformCall {
    pub kind: OperationKind,
    pub inputs: Vec<PathBuf>,
    pub config: OperationConfig,
    pub output: PathBuf,
}

#[derive(Default)]
struct MemoryState {
    /// `None` marks an asset that opens but cannot be demuxed
    assets: HashMap<PathBuf, Option<MediaMetadata>>,
    open_handles: HashMap<u64, PathBuf>,
    opens_per_asset: HashMap<PathBuf, usize>,
    max_opens_per_asset: usize,
    running_transforms: usize,
    max_running_transforms: usize,
    transforms: Vec<TransformCall>,
}

/// In-memory toolkit. Assets exist only in its registry; outputs are registered on success.
pub struct MemoryToolkitAdapter {
    state: Mutex<MemoryState>,
    next_handle: AtomicU64,
    transform_behavior: Mutex<TransformBehavior>,
    editor_behavior: Mutex<EditorBehavior>,
    transform_delay: Option<Duration>,
}

impl Default for MemoryToolkitAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryToolkitAdapter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            next_handle: AtomicU64::new(1),
            transform_behavior: Mutex::new(TransformBehavior::Produce),
            editor_behavior: Mutex::new(EditorBehavior::Save),
            transform_delay: None,
        }
    }

    /// Make every transform take at least `delay`
    pub fn with_transform_delay(mut self, delay: Duration) -> Self {
        self.transform_delay = Some(delay);
        self
    }

    pub fn register_asset(&self, path: impl Into<PathBuf>, metadata: MediaMetadata) -> AssetRef {
        let path = path.into();
        self.lock_state().assets.insert(path.clone(), Some(metadata));
        AssetRef::from_resolved(path)
    }

    /// Register an asset that opens but has no recognizable streams
    pub fn register_undecodable(&self, path: impl Into<PathBuf>) -> AssetRef {
        let path = path.into();
        self.lock_state().assets.insert(path.clone(), None);
        AssetRef::from_resolved(path)
    }

    pub fn set_transform_behavior(&self, behavior: TransformBehavior) {
        *lock(&self.transform_behavior) = behavior;
    }

    pub fn set_editor_behavior(&self, behavior: EditorBehavior) {
        *lock(&self.editor_behavior) = behavior;
    }

    pub fn contains(&self, path: impl Into<PathBuf>) -> bool {
        self.lock_state().assets.contains_key(&path.into())
    }

    pub fn metadata_of(&self, path: impl Into<PathBuf>) -> Option<MediaMetadata> {
        self.lock_state().assets.get(&path.into()).cloned().flatten()
    }

    pub fn open_handle_count(&self) -> usize {
        self.lock_state().open_handles.len()
    }

    pub fn max_concurrent_opens_per_asset(&self) -> usize {
        self.lock_state().max_opens_per_asset
    }

    pub fn max_concurrent_transforms(&self) -> usize {
        self.lock_state().max_running_transforms
    }

    pub fn transform_calls(&self) -> Vec<TransformCall> {
        self.lock_state().transforms.clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, MemoryState> {
        lock(&self.state)
    }

    fn handle_path(&self, handle: &MediaHandle) -> Result<PathBuf, DomainError> {
        self.lock_state()
            .open_handles
            .get(&handle.id)
            .cloned()
            .ok_or_else(|| DomainError::UnreadableAsset(format!("Handle {} is not open", handle.id)))
    }

    fn input_metadata(&self, handles: &[MediaHandle]) -> Result<Vec<MediaMetadata>, DomainError> {
        let state = self.lock_state();
        handles
            .iter()
            .map(|handle| {
                let path = state.open_handles.get(&handle.id).ok_or_else(|| {
                    DomainError::UnreadableAsset(format!("Handle {} is not open", handle.id))
                })?;
                state.assets.get(path).cloned().flatten().ok_or_else(|| {
                    DomainError::UnsupportedFormat(format!("{} has no decodable streams", path.display()))
                })
            })
            .collect()
    }

    /// Metadata the produced file would have
    fn derive_output(config: &OperationConfig, inputs: &[MediaMetadata]) -> Option<MediaMetadata> {
        let first = inputs.first()?.clone();
        let total_ms: u64 = inputs.iter().map(|m| m.duration_ms).sum();

        let produced = match config {
            OperationConfig::Denoise | OperationConfig::Compare | OperationConfig::Info => first,
            OperationConfig::Concat(concat) => {
                let mut meta = MediaMetadata {
                    duration_ms: total_ms,
                    ..first
                };
                if let Some(target) = concat.target_resolution {
                    meta.width = target.width;
                    meta.height = target.height;
                }
                meta
            }
            OperationConfig::Merge(merge) => {
                let widest = inputs.iter().map(|m| m.width).max().unwrap_or(first.width);
                let tallest = inputs.iter().map(|m| m.height).max().unwrap_or(first.height);
                let target = merge
                    .target_resolution
                    .unwrap_or(Resolution { width: widest, height: tallest })
                    .to_even();
                MediaMetadata {
                    duration_ms: total_ms,
                    width: target.width,
                    height: target.height,
                    rotation: Rotation::Deg0,
                    video_codec: merge.video_codec.encoder_name().to_string(),
                    audio_codec: inputs.iter().find_map(|m| m.audio_codec.clone()),
                    ..first
                }
            }
            OperationConfig::Thumbnail(thumb) => MediaMetadata {
                duration_ms: 0,
                width: thumb.width.unwrap_or(first.width),
                height: thumb.height.unwrap_or(first.height),
                rotation: Rotation::Deg0,
                video_codec: "png".to_string(),
                audio_codec: None,
                ..first
            },
            OperationConfig::Edit(edit) => {
                let start = edit.trim_start_ms.unwrap_or(0);
                let end = edit.trim_end_ms.unwrap_or(first.duration_ms);
                MediaMetadata {
                    duration_ms: end.saturating_sub(start),
                    rotation: edit.rotation.unwrap_or(first.rotation),
                    audio_codec: if edit.volume == 0.0 { None } else { first.audio_codec.clone() },
                    ..first
                }
            }
        };
        Some(produced)
    }

    fn finish_transform(&self) {
        let mut state = self.lock_state();
        state.running_transforms = state.running_transforms.saturating_sub(1);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl MediaToolkitPort for MemoryToolkitAdapter {
    fn open_asset(&self, asset: &AssetRef) -> Result<MediaHandle, DomainError> {
        let path = asset.path().to_path_buf();
        let mut state = self.lock_state();
        if !state.assets.contains_key(&path) {
            return Err(DomainError::UnreadableAsset(format!(
                "No such asset: {}",
                path.display()
            )));
        }

        let id = self.next_handle.fetch_add(1, Ordering::SeqCst);
        state.open_handles.insert(id, path.clone());
        let opens = {
            let counter = state.opens_per_asset.entry(path.clone()).or_insert(0);
            *counter += 1;
            *counter
        };
        state.max_opens_per_asset = state.max_opens_per_asset.max(opens);

        Ok(MediaHandle::new(id, path))
    }

    fn close_handle(&self, handle: MediaHandle) {
        let mut state = self.lock_state();
        if let Some(path) = state.open_handles.remove(&handle.id) {
            if let Some(counter) = state.opens_per_asset.get_mut(&path) {
                *counter = counter.saturating_sub(1);
            }
        }
    }

    fn read_metadata(&self, handle: &MediaHandle) -> Result<MediaMetadata, DomainError> {
        let path = self.handle_path(handle)?;
        self.lock_state()
            .assets
            .get(&path)
            .cloned()
            .flatten()
            .ok_or_else(|| {
                DomainError::UnsupportedFormat(format!("{} has no decodable streams", path.display()))
            })
    }

    fn discard_output(&self, output: &OutputTarget) -> Result<(), DomainError> {
        self.lock_state().assets.remove(&output.resolved_path());
        Ok(())
    }

    fn run_transform(
        &self,
        kind: OperationKind,
        handles: &[MediaHandle],
        config: &OperationConfig,
        output: &OutputTarget,
    ) -> Result<(), DomainError> {
        let inputs = self.input_metadata(handles)?;
        let output_path = output.resolved_path();

        {
            let mut state = self.lock_state();
            state.running_transforms += 1;
            state.max_running_transforms = state.max_running_transforms.max(state.running_transforms);
            state.transforms.push(TransformCall {
                kind,
                inputs: handles.iter().map(|h| h.path.clone()).collect(),
                config: *config,
                output: output_path.clone(),
            });
        }

        if let Some(delay) = self.transform_delay {
            std::thread::sleep(delay);
        }

        let behavior = lock(&self.transform_behavior).clone();
        debug!("Memory toolkit {} -> {} ({:?})", kind, output_path.display(), behavior);

        let result = match behavior {
            TransformBehavior::Produce => {
                let produced = Self::derive_output(config, &inputs);
                self.lock_state().assets.insert(output_path, produced);
                Ok(())
            }
            TransformBehavior::SkipOutput => Ok(()),
            TransformBehavior::Fail(message) => Err(DomainError::NativeOperationFailed(message)),
        };

        self.finish_transform();
        result
    }

    async fn launch_interactive_editor(
        &self,
        handle: &MediaHandle,
        output: &OutputTarget,
    ) -> Result<Option<MediaHandle>, DomainError> {
        self.discard_output(output)?;
        let behavior = lock(&self.editor_behavior).clone();
        match behavior {
            EditorBehavior::Save => {
                let source = self.read_metadata(handle)?;
                let output_asset = output.as_asset();
                self.lock_state()
                    .assets
                    .insert(output_asset.path().to_path_buf(), Some(source));
                self.open_asset(&output_asset).map(Some)
            }
            EditorBehavior::Cancel => Ok(None),
            EditorBehavior::Fail(message) => Err(DomainError::NativeOperationFailed(message)),
            EditorBehavior::Hang => std::future::pending().await,
        }
    }
}
