// Request executor - Runs validated requests and delivers one outcome each

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::{oneshot, Semaphore};
use tracing::{debug, error, info};

use crate::app::metadata_reader::MetadataReader;
use crate::app::request_registry::RequestRegistry;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::CompatibilityChecker;
use crate::ports::{HandleGuard, MediaToolkitPort};

/// Pending terminal outcome of one request.
///
/// Resolves exactly once. If the worker disappears without reporting, the
/// completion resolves to a `NativeOperationFailed` failure.
#[derive(Debug)]
pub struct Completion {
    id: RequestId,
    receiver: oneshot::Receiver<CompletionOutcome>,
}

impl Completion {
    pub(crate) fn channel(id: RequestId) -> (oneshot::Sender<CompletionOutcome>, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self { id, receiver })
    }

    /// Registry identifier of the request this completion belongs to
    pub fn request_id(&self) -> RequestId {
        self.id
    }
}

impl Future for Completion {
    type Output = CompletionOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                CompletionOutcome::failure(DomainError::NativeOperationFailed(
                    "Operation ended without reporting an outcome".to_string(),
                ))
            })
        })
    }
}

/// Dispatches requests to the toolkit off the caller's context.
///
/// Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct RequestExecutor {
    toolkit: Arc<dyn MediaToolkitPort>,
    reader: Arc<MetadataReader>,
    registry: Arc<RequestRegistry>,
    permits: Arc<Semaphore>,
}

impl RequestExecutor {
    pub fn new(
        toolkit: Arc<dyn MediaToolkitPort>,
        reader: Arc<MetadataReader>,
        registry: Arc<RequestRegistry>,
        max_concurrent_operations: usize,
    ) -> Self {
        Self {
            toolkit,
            reader,
            registry,
            permits: Arc::new(Semaphore::new(max_concurrent_operations.max(1))),
        }
    }

    /// Start a request and return its completion immediately
    pub fn execute(&self, request: OperationRequest) -> Completion {
        let id = self.registry.register(request.kind(), request.output());
        let (sender, completion) = Completion::channel(id);
        let executor = self.clone();

        tokio::spawn(async move {
            let outcome = executor.run(id, request).await;
            executor.registry.finish(id, &outcome);
            if sender.send(outcome).is_err() {
                debug!("Completion dropped before the outcome was delivered");
            }
        });

        completion
    }

    /// Start a request and hand its outcome to `on_complete`, exactly once
    pub fn execute_with<F>(&self, request: OperationRequest, on_complete: F)
    where
        F: FnOnce(CompletionOutcome) + Send + 'static,
    {
        let completion = self.execute(request);
        tokio::spawn(async move {
            on_complete(completion.await);
        });
    }

    async fn run(&self, id: RequestId, request: OperationRequest) -> CompletionOutcome {
        let kind = request.kind();

        let _permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                return CompletionOutcome::failure(DomainError::NativeOperationFailed(format!(
                    "Executor is shut down: {}",
                    e
                )))
            }
        };

        self.registry.mark_processing(id);
        info!("Starting {} {} over {} asset(s)", kind, id, request.assets().len());

        let executor = self.clone();
        let joined = tokio::task::spawn_blocking(move || executor.perform(request)).await;

        let result = match joined {
            Ok(result) => result.map_err(DomainError::into_runtime),
            Err(e) => Err(DomainError::NativeOperationFailed(format!(
                "{} worker aborted: {}",
                kind, e
            ))),
        };

        match &result {
            Ok(_) => info!("Finished {} {}", kind, id),
            Err(e) => error!("{} {} failed: {}", kind, id, e),
        }
        CompletionOutcome::from(result)
    }

    /// Blocking body of a request
    fn perform(&self, request: OperationRequest) -> Result<OperationResult, DomainError> {
        let (config, assets, output) = request.into_parts();
        let kind = config.kind();

        if kind.produces_asset() {
            let output = output.ok_or_else(|| {
                DomainError::NativeOperationFailed(format!(
                    "{} request without an output target",
                    kind
                ))
            })?;
            return self.transform(kind, &config, &assets, &output);
        }

        let metadatas = self.reader.read_all(&assets)?;
        match (kind, metadatas.as_slice()) {
            (OperationKind::Info, [metadata]) => Ok(OperationResult::Metadata(metadata.clone())),
            (OperationKind::Compare, _) => {
                CompatibilityChecker::check(&metadatas).map(OperationResult::Compatibility)
            }
            _ => Err(DomainError::NativeOperationFailed(format!(
                "{} cannot run over {} asset(s)",
                kind,
                assets.len()
            ))),
        }
    }

    fn transform(
        &self,
        kind: OperationKind,
        config: &OperationConfig,
        assets: &[AssetRef],
        output: &OutputTarget,
    ) -> Result<OperationResult, DomainError> {
        {
            let guards = assets
                .iter()
                .map(|asset| HandleGuard::open(Arc::clone(&self.toolkit), asset))
                .collect::<Result<Vec<_>, _>>()?;
            let handles: Vec<MediaHandle> = guards.iter().map(|g| g.handle().clone()).collect();

            self.toolkit.discard_output(output)?;
            debug!("Running {} into {}", kind, output);
            self.toolkit.run_transform(kind, &handles, config, output)?;
        }

        let produced = output.as_asset();
        HandleGuard::open(Arc::clone(&self.toolkit), &produced).map_err(|e| {
            DomainError::OutputNotProduced(format!(
                "{} reported success but {} is not readable: {}",
                kind,
                produced,
                e.message()
            ))
        })?;

        Ok(OperationResult::Asset(produced))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{MemoryToolkitAdapter, TransformBehavior};
    use crate::app::request_builder::*;

    fn hd(duration_ms: u64) -> MediaMetadata {
        MediaMetadata::new(duration_ms, 1920, 1080, Rotation::Deg0, "h264", Some("aac".into())).unwrap()
    }

    fn setup() -> (Arc<MemoryToolkitAdapter>, Arc<MetadataReader>, RequestExecutor) {
        let toolkit = Arc::new(MemoryToolkitAdapter::new());
        let reader = Arc::new(MetadataReader::new(toolkit.clone()));
        let executor =
            RequestExecutor::new(toolkit.clone(), reader.clone(), Arc::new(RequestRegistry::new()), 2);
        (toolkit, reader, executor)
    }

    #[tokio::test]
    async fn test_info_returns_metadata() {
        let (toolkit, reader, executor) = setup();
        let asset = toolkit.register_asset("/media/a.mp4", hd(4200));

        let request = InfoBuilder::new(reader).asset(asset).build().unwrap();
        match executor.execute(request).await {
            CompletionOutcome::Success(OperationResult::Metadata(meta)) => {
                assert_eq!(meta.duration_ms, 4200)
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(toolkit.transform_calls().is_empty());
    }

    #[tokio::test]
    async fn test_denoise_produces_readable_output() {
        let (toolkit, reader, executor) = setup();
        let asset = toolkit.register_asset("/media/a.mp4", hd(4200));
        let target = OutputTarget::new("/out/clean.mp4").unwrap();

        let request = DenoiseBuilder::new(reader)
            .asset(asset)
            .output(target.clone())
            .build()
            .unwrap();
        let outcome = executor.execute(request).await;

        assert_eq!(
            outcome,
            CompletionOutcome::Success(OperationResult::Asset(target.as_asset()))
        );
        assert_eq!(toolkit.transform_calls().len(), 1);
        assert_eq!(toolkit.open_handle_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_output_is_reported() {
        let (toolkit, reader, executor) = setup();
        let asset = toolkit.register_asset("/media/a.mp4", hd(4200));
        toolkit.set_transform_behavior(TransformBehavior::SkipOutput);

        let request = DenoiseBuilder::new(reader)
            .asset(asset)
            .output(OutputTarget::new("/out/clean.mp4").unwrap())
            .build()
            .unwrap();

        match executor.execute(request).await {
            CompletionOutcome::Failure { kind, .. } => assert_eq!(kind, ErrorKind::OutputNotProduced),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_toolkit_failure_becomes_failure_outcome() {
        let (toolkit, reader, executor) = setup();
        let asset = toolkit.register_asset("/media/a.mp4", hd(4200));
        toolkit.set_transform_behavior(TransformBehavior::Fail("encoder exploded".into()));

        let request = DenoiseBuilder::new(reader)
            .asset(asset)
            .output(OutputTarget::new("/out/clean.mp4").unwrap())
            .build()
            .unwrap();

        match executor.execute(request).await {
            CompletionOutcome::Failure { kind, message } => {
                assert_eq!(kind, ErrorKind::NativeOperationFailed);
                assert!(message.contains("encoder exploded"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(toolkit.open_handle_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_sender_resolves_as_failure() {
        let (sender, completion) = Completion::channel(RequestId(1));
        drop(sender);

        match completion.await {
            CompletionOutcome::Failure { kind, .. } => {
                assert_eq!(kind, ErrorKind::NativeOperationFailed)
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_with_invokes_callback_once() {
        let (toolkit, reader, executor) = setup();
        let a = toolkit.register_asset("/media/a.mp4", hd(1000));
        let b = toolkit.register_asset("/media/b.mp4", hd(2000));

        let request = CompareBuilder::new(reader).assets([a, b]).build().unwrap();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        executor.execute_with(request, move |outcome| {
            let _ = tx.send(outcome);
        });

        let mut rx = rx;
        assert_eq!(
            rx.recv().await,
            Some(CompletionOutcome::Success(OperationResult::Compatibility(true)))
        );
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_registry_holds_terminal_status_before_delivery() {
        let toolkit = Arc::new(MemoryToolkitAdapter::new());
        let reader = Arc::new(MetadataReader::new(toolkit.clone()));
        let registry = Arc::new(RequestRegistry::new());
        let executor = RequestExecutor::new(toolkit.clone(), reader.clone(), registry.clone(), 1);
        let asset = toolkit.register_asset("/media/a.mp4", hd(4200));
        toolkit.set_transform_behavior(TransformBehavior::Fail("codec missing".into()));

        let request = DenoiseBuilder::new(reader)
            .asset(asset)
            .output(OutputTarget::new("/out/clean.mp4").unwrap())
            .build()
            .unwrap();
        let completion = executor.execute(request);
        let id = completion.request_id();
        assert!(registry.get(id).is_some());

        assert!(!completion.await.is_success());
        let record = registry.get(id).unwrap();
        assert_eq!(record.kind, OperationKind::Denoise);
        assert_eq!(record.status, RequestStatus::Error);
        assert_eq!(record.error_message.as_deref(), Some("codec missing"));
    }
}
