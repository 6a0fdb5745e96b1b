// Request registry - Status of every request an engine has started

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::debug;

use crate::domain::model::*;

/// Engine-owned ledger of request lifecycles.
///
/// Records move from `Idle` to `Processing` to one terminal status and are
/// kept until pruned. Every change publishes a full snapshot to watchers.
pub struct RequestRegistry {
    state: Mutex<RegistryState>,
    updates: watch::Sender<Vec<RequestRecord>>,
}

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    records: BTreeMap<RequestId, RequestRecord>,
}

impl Default for RequestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestRegistry {
    pub fn new() -> Self {
        let (updates, _) = watch::channel(Vec::new());
        Self {
            state: Mutex::new(RegistryState::default()),
            updates,
        }
    }

    /// Record a newly started request as `Idle`
    pub fn register(&self, kind: OperationKind, output: Option<&OutputTarget>) -> RequestId {
        let mut state = self.lock_state();
        state.next_id += 1;
        let id = RequestId(state.next_id);
        state.records.insert(
            id,
            RequestRecord {
                id,
                kind,
                status: RequestStatus::Idle,
                output: output.map(|target| target.resolved_path()),
                error_message: None,
            },
        );
        debug!("Registered {} request {}", kind, id);
        self.publish(&state);
        id
    }

    pub fn mark_processing(&self, id: RequestId) {
        self.update(id, RequestStatus::Processing, None);
    }

    /// Record the terminal outcome of a request
    pub fn finish(&self, id: RequestId, outcome: &CompletionOutcome) {
        let message = match outcome {
            CompletionOutcome::Failure { message, .. } => Some(message.clone()),
            _ => None,
        };
        self.update(id, RequestStatus::from(outcome), message);
    }

    pub fn get(&self, id: RequestId) -> Option<RequestRecord> {
        self.lock_state().records.get(&id).cloned()
    }

    /// Records in start order, optionally restricted to one status
    pub fn list(&self, status: Option<RequestStatus>) -> Vec<RequestRecord> {
        self.lock_state()
            .records
            .values()
            .filter(|record| status.map_or(true, |wanted| record.status == wanted))
            .cloned()
            .collect()
    }

    /// Snapshot stream; the current value is every record in start order
    pub fn watch(&self) -> watch::Receiver<Vec<RequestRecord>> {
        self.updates.subscribe()
    }

    /// Drop every record in a terminal status, returning how many were removed
    pub fn prune_finished(&self) -> usize {
        let mut state = self.lock_state();
        let before = state.records.len();
        state.records.retain(|_, record| !record.status.is_terminal());
        let removed = before - state.records.len();
        if removed > 0 {
            self.publish(&state);
        }
        removed
    }

    fn update(&self, id: RequestId, status: RequestStatus, error_message: Option<String>) {
        let mut state = self.lock_state();
        let Some(record) = state.records.get_mut(&id) else {
            debug!("Ignoring status {} for unknown request {}", status, id);
            return;
        };
        if record.status.is_terminal() {
            return;
        }
        record.status = status;
        record.error_message = error_message;
        debug!("Request {} is {}", id, status);
        self.publish(&state);
    }

    fn publish(&self, state: &RegistryState) {
        self.updates
            .send_replace(state.records.values().cloned().collect());
    }

    fn lock_state(&self) -> MutexGuard<'_, RegistryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
