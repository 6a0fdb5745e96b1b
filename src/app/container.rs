use std::sync::Arc;

use crate::adapters::FfmpegToolkitAdapter;
use crate::app::edit_session::InteractiveEditSession;
use crate::app::executor::{Completion, RequestExecutor};
use crate::app::metadata_reader::MetadataReader;
use crate::app::request_builder::*;
use crate::app::request_registry::RequestRegistry;
use crate::config::EngineConfig;
use crate::domain::model::{
    CompletionOutcome, OperationRequest, RequestId, RequestRecord, RequestStatus,
};
use crate::ports::MediaToolkitPort;

/// Explicitly constructed owner of the engine components.
///
/// Engines share nothing; several may coexist in one process, each with its
/// own toolkit and concurrency bound.
pub struct Engine {
    config: EngineConfig,
    toolkit: Arc<dyn MediaToolkitPort>,
    reader: Arc<MetadataReader>,
    registry: Arc<RequestRegistry>,
    executor: RequestExecutor,
    session: InteractiveEditSession,
}

impl Engine {
    pub fn new(config: EngineConfig, toolkit: Arc<dyn MediaToolkitPort>) -> Self {
        let reader = Arc::new(MetadataReader::new(Arc::clone(&toolkit)));
        let registry = Arc::new(RequestRegistry::new());
        let executor = RequestExecutor::new(
            Arc::clone(&toolkit),
            Arc::clone(&reader),
            Arc::clone(&registry),
            config.max_concurrent_operations,
        );
        let session = InteractiveEditSession::new(Arc::clone(&toolkit), Arc::clone(&registry));

        Self {
            config,
            toolkit,
            reader,
            registry,
            executor,
            session,
        }
    }

    /// Engine backed by the ffmpeg and ffprobe executables
    pub fn with_ffmpeg(config: EngineConfig) -> Self {
        let toolkit = Arc::new(FfmpegToolkitAdapter::new(&config));
        Self::new(config, toolkit)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn toolkit(&self) -> Arc<dyn MediaToolkitPort> {
        Arc::clone(&self.toolkit)
    }

    pub fn reader(&self) -> Arc<MetadataReader> {
        Arc::clone(&self.reader)
    }

    pub fn denoise_builder(&self) -> DenoiseBuilder {
        DenoiseBuilder::new(self.reader())
    }

    pub fn compare_builder(&self) -> CompareBuilder {
        CompareBuilder::new(self.reader())
    }

    pub fn concat_builder(&self) -> ConcatBuilder {
        ConcatBuilder::new(self.reader())
    }

    pub fn merge_builder(&self) -> MergeBuilder {
        MergeBuilder::new(self.reader())
    }

    pub fn thumbnail_builder(&self) -> ThumbnailBuilder {
        ThumbnailBuilder::new(self.reader())
    }

    pub fn info_builder(&self) -> InfoBuilder {
        InfoBuilder::new(self.reader())
    }

    pub fn edit_builder(&self) -> EditBuilder {
        EditBuilder::new(self.reader())
    }

    /// Start a request; must be called within a tokio runtime
    pub fn execute(&self, request: OperationRequest) -> Completion {
        self.executor.execute(request)
    }

    pub fn execute_with<F>(&self, request: OperationRequest, on_complete: F)
    where
        F: FnOnce(CompletionOutcome) + Send + 'static,
    {
        self.executor.execute_with(request, on_complete)
    }

    pub fn edit_session(&self) -> &InteractiveEditSession {
        &self.session
    }

    /// Requests started on this engine, optionally filtered by status
    pub fn requests(&self, status: Option<RequestStatus>) -> Vec<RequestRecord> {
        self.registry.list(status)
    }

    pub fn request(&self, id: RequestId) -> Option<RequestRecord> {
        self.registry.get(id)
    }

    /// Stream of request snapshots, updated on every status change
    pub fn watch_requests(&self) -> tokio::sync::watch::Receiver<Vec<RequestRecord>> {
        self.registry.watch()
    }

    /// Forget requests that already reached a terminal status
    pub fn prune_requests(&self) -> usize {
        self.registry.prune_finished()
    }
}
