// Ports - Interface the engine requires from the native media toolkit

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Port for the native media toolkit.
///
/// `open_asset`, `read_metadata` and `run_transform` may block; the executor
/// never calls them on the caller's context. Implementations must be safe to
/// share across threads.
#[async_trait]
pub trait MediaToolkitPort: Send + Sync {
    /// Open a readable handle for an asset
    fn open_asset(&self, asset: &AssetRef) -> Result<MediaHandle, DomainError>;

    /// Release a handle obtained from `open_asset`
    fn close_handle(&self, handle: MediaHandle);

    /// Read structural metadata through an open handle
    fn read_metadata(&self, handle: &MediaHandle) -> Result<MediaMetadata, DomainError>;

    /// Remove any file an earlier run left at `output`; a missing file is not an error
    fn discard_output(&self, output: &OutputTarget) -> Result<(), DomainError>;

    /// Run a transform to completion, writing into `output`
    fn run_transform(
        &self,
        kind: OperationKind,
        handles: &[MediaHandle],
        config: &OperationConfig,
        output: &OutputTarget,
    ) -> Result<(), DomainError>;

    /// Hand control to an interactive editor; `None` means the user cancelled
    async fn launch_interactive_editor(
        &self,
        handle: &MediaHandle,
        output: &OutputTarget,
    ) -> Result<Option<MediaHandle>, DomainError>;
}

/// Port for extracting metadata directly from a media file.
///
/// Used by toolkits that delegate probing to a separate backend.
pub trait MetadataProbePort: Send + Sync {
    fn probe(&self, path: &Path) -> Result<MediaMetadata, DomainError>;
}

/// Open handle that is closed on every exit path
pub struct HandleGuard {
    toolkit: Arc<dyn MediaToolkitPort>,
    handle: MediaHandle,
}

impl HandleGuard {
    pub fn open(toolkit: Arc<dyn MediaToolkitPort>, asset: &AssetRef) -> Result<Self, DomainError> {
        let handle = toolkit.open_asset(asset)?;
        Ok(Self { toolkit, handle })
    }

    /// Take ownership of a handle that some other call already opened
    pub fn adopt(toolkit: Arc<dyn MediaToolkitPort>, handle: MediaHandle) -> Self {
        Self { toolkit, handle }
    }

    pub fn handle(&self) -> &MediaHandle {
        &self.handle
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        tracing::trace!(
            "Closing handle {} for {}",
            self.handle.id,
            self.handle.path.display()
        );
        self.toolkit.close_handle(self.handle.clone());
    }
}
