//! Shared, observable client state.
//!
//! [`SyncContext`] owns the published snapshot, the last error and the
//! stream status. Readers take cheap copies or subscribe to changes; only
//! the client's own components write.

use std::sync::Arc;

use sync_core::{FetchSource, SyncFault, SyncState};
use sync_types::{ConnectionStatus, Snapshot};
use tokio::sync::watch;

/// Handle to the shared client state. Clones share the same state.
#[derive(Debug, Clone)]
pub struct SyncContext {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    state: watch::Sender<SyncState>,
    status: watch::Sender<ConnectionStatus>,
}

impl Default for SyncContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncContext {
    /// Create an empty context: no snapshot, no error, disconnected.
    pub fn new() -> Self {
        let (state, _) = watch::channel(SyncState::new());
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            inner: Arc::new(ContextInner { state, status }),
        }
    }

    /// The last successfully fetched snapshot.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.state.borrow().snapshot().cloned()
    }

    /// The last recorded failure.
    pub fn last_error(&self) -> Option<SyncFault> {
        self.inner.state.borrow().last_error().cloned()
    }

    /// A copy of the full synchronizer state.
    pub fn state(&self) -> SyncState {
        self.inner.state.borrow().clone()
    }

    /// Status of the streaming path.
    pub fn status(&self) -> ConnectionStatus {
        *self.inner.status.borrow()
    }

    /// Status to display: connected if either the stream is open or the
    /// last fallback poll succeeded.
    pub fn effective_status(&self) -> ConnectionStatus {
        self.inner.state.borrow().effective_status(self.status())
    }

    /// Subscribe to snapshot and error changes.
    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.inner.state.subscribe()
    }

    /// Subscribe to stream status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status.subscribe()
    }

    pub(crate) fn apply_fetch(
        &self,
        source: FetchSource,
        result: Result<Snapshot, SyncFault>,
    ) -> Result<Arc<Snapshot>, SyncFault> {
        let mut outcome = Err(SyncFault::network("fetch result not applied"));
        self.inner.state.send_modify(|state| {
            outcome = state.apply_fetch(source, result);
        });
        outcome
    }

    pub(crate) fn set_status(&self, status: ConnectionStatus) {
        self.inner.status.send_if_modified(|current| {
            let changed = *current != status;
            *current = status;
            changed
        });
    }

    pub(crate) fn record_error(&self, fault: SyncFault) {
        self.inner.state.send_modify(|state| state.record_error(fault));
    }

    pub(crate) fn clear_error(&self) {
        self.inner.state.send_if_modified(|state| {
            let had_error = state.last_error().is_some();
            state.clear_error();
            had_error
        });
    }

    pub(crate) fn reset_reachability(&self) {
        self.inner.state.send_if_modified(|state| {
            let was_reachable = state.polling_reachable();
            state.reset_reachability();
            was_reachable
        });
    }
}
