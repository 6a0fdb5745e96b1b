// Interactive edit session - Hands one asset to an external editor at a time

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::app::executor::Completion;
use crate::app::request_registry::RequestRegistry;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::{HandleGuard, MediaToolkitPort};

/// Outstanding launch; `cancel` is taken once the caller cancels
struct Launch {
    cancel: Option<oneshot::Sender<()>>,
}

/// Interactive editing with a distinct `Cancelled` outcome.
///
/// At most one launch is outstanding per session. The busy slot is released
/// before the outcome is delivered, so a caller may relaunch from the
/// completion handler.
pub struct InteractiveEditSession {
    toolkit: Arc<dyn MediaToolkitPort>,
    registry: Arc<RequestRegistry>,
    slot: Arc<Mutex<Option<Launch>>>,
}

impl InteractiveEditSession {
    pub fn new(toolkit: Arc<dyn MediaToolkitPort>, registry: Arc<RequestRegistry>) -> Self {
        Self {
            toolkit,
            registry,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Launch the editor for `asset`, writing into `output`.
    ///
    /// Fails with `SessionBusy` without side effects if a launch is outstanding,
    /// and with `InvalidParameter` if `output` would overwrite `asset`.
    pub fn launch(&self, asset: AssetRef, output: OutputTarget) -> Result<Completion, DomainError> {
        if output.resolved_path() == asset.path() {
            return Err(DomainError::InvalidParameter(format!(
                "Edit output {} is the input itself",
                asset
            )));
        }

        let (cancel_tx, cancel_rx) = oneshot::channel();
        {
            let mut slot = lock(&self.slot);
            if slot.is_some() {
                return Err(DomainError::SessionBusy(
                    "An interactive edit is already in progress".to_string(),
                ));
            }
            *slot = Some(Launch {
                cancel: Some(cancel_tx),
            });
        }

        let id = self.registry.register(OperationKind::Edit, Some(&output));
        self.registry.mark_processing(id);
        let (sender, completion) = Completion::channel(id);
        let toolkit = Arc::clone(&self.toolkit);
        let registry = Arc::clone(&self.registry);
        let slot = Arc::clone(&self.slot);

        info!("Launching interactive editor {} for {}", id, asset);
        tokio::spawn(async move {
            let outcome = tokio::select! {
                outcome = Self::run_editor(toolkit, asset, output) => outcome,
                Ok(()) = cancel_rx => {
                    info!("Interactive edit cancelled by caller");
                    CompletionOutcome::Cancelled
                }
            };

            registry.finish(id, &outcome);
            lock(&slot).take();
            if sender.send(outcome).is_err() {
                debug!("Edit completion dropped before the outcome was delivered");
            }
        });

        Ok(completion)
    }

    /// Cancel the outstanding launch. Returns false when there is nothing to cancel.
    pub fn cancel(&self) -> bool {
        let cancel = lock(&self.slot)
            .as_mut()
            .and_then(|launch| launch.cancel.take());
        match cancel {
            Some(cancel) => cancel.send(()).is_ok(),
            None => false,
        }
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.slot).is_some()
    }

    async fn run_editor(
        toolkit: Arc<dyn MediaToolkitPort>,
        asset: AssetRef,
        output: OutputTarget,
    ) -> CompletionOutcome {
        let opener = Arc::clone(&toolkit);
        let opened = tokio::task::spawn_blocking(move || HandleGuard::open(opener, &asset)).await;

        let guard = match opened {
            Ok(Ok(guard)) => guard,
            Ok(Err(e)) => return CompletionOutcome::failure(e.into_runtime()),
            Err(e) => {
                return CompletionOutcome::failure(DomainError::NativeOperationFailed(format!(
                    "Opening the asset aborted: {}",
                    e
                )))
            }
        };

        match toolkit.launch_interactive_editor(guard.handle(), &output).await {
            Ok(Some(edited)) => {
                let edited = HandleGuard::adopt(Arc::clone(&toolkit), edited);
                info!("Interactive edit saved to {}", edited.handle().path.display());
                CompletionOutcome::Success(OperationResult::Asset(AssetRef::from_resolved(
                    edited.handle().path.clone(),
                )))
            }
            Ok(None) => {
                info!("Editor closed without saving");
                CompletionOutcome::Cancelled
            }
            Err(e) => {
                warn!("Interactive editor failed: {}", e);
                CompletionOutcome::failure(e.into_runtime())
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{EditorBehavior, MemoryToolkitAdapter};

    fn setup() -> (Arc<MemoryToolkitAdapter>, InteractiveEditSession, AssetRef) {
        let toolkit = Arc::new(MemoryToolkitAdapter::new());
        let meta = MediaMetadata::new(3000, 1280, 720, Rotation::Deg0, "h264", None).unwrap();
        let asset = toolkit.register_asset("/media/clip.mp4", meta);
        let session = InteractiveEditSession::new(toolkit.clone(), Arc::new(RequestRegistry::new()));
        (toolkit, session, asset)
    }

    fn target() -> OutputTarget {
        OutputTarget::new("/out/edited.mp4").unwrap()
    }

    #[tokio::test]
    async fn test_saved_edit_yields_asset() {
        let (toolkit, session, asset) = setup();

        let outcome = session.launch(asset, target()).unwrap().await;
        assert_eq!(
            outcome,
            CompletionOutcome::Success(OperationResult::Asset(target().as_asset()))
        );
        assert!(!session.is_busy());
        assert_eq!(toolkit.open_handle_count(), 0);
    }

    #[tokio::test]
    async fn test_editor_closed_without_saving() {
        let (toolkit, session, asset) = setup();
        toolkit.set_editor_behavior(EditorBehavior::Cancel);

        let outcome = session.launch(asset, target()).unwrap().await;
        assert_eq!(outcome, CompletionOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_editor_failure() {
        let (toolkit, session, asset) = setup();
        toolkit.set_editor_behavior(EditorBehavior::Fail("editor crashed".into()));

        match session.launch(asset, target()).unwrap().await {
            CompletionOutcome::Failure { kind, .. } => {
                assert_eq!(kind, ErrorKind::NativeOperationFailed)
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_second_launch_is_busy_until_cancelled() {
        let (toolkit, session, asset) = setup();
        toolkit.set_editor_behavior(EditorBehavior::Hang);

        let first = session.launch(asset.clone(), target()).unwrap();
        let err = session.launch(asset.clone(), target()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SessionBusy);

        assert!(session.cancel());
        assert_eq!(first.await, CompletionOutcome::Cancelled);
        assert!(!session.is_busy());

        toolkit.set_editor_behavior(EditorBehavior::Cancel);
        let again = session.launch(asset, target()).unwrap().await;
        assert_eq!(again, CompletionOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_without_launch() {
        let (_, session, _) = setup();
        assert!(!session.cancel());
    }

    #[tokio::test]
    async fn test_output_over_input_is_rejected() {
        let (toolkit, session, asset) = setup();

        let err = session
            .launch(asset.clone(), OutputTarget::new(asset.path()).unwrap())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert!(!session.is_busy());
        assert!(toolkit.contains("/media/clip.mp4"));
    }
}
