//! Snapshot and error bookkeeping for the state synchronizer.
//!
//! [`SyncState`] is the value readers observe. Every fetch result, whatever
//! path issued it, goes through [`SyncState::apply_fetch`]; the last result
//! to be applied wins.

use std::fmt;
use std::sync::Arc;
use sync_types::{ConnectionStatus, Snapshot};
use thiserror::Error;

/// Classification of a recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request failed, or the controller answered with a non-200 status.
    Network,
    /// The response body could not be decoded.
    Decode,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => f.write_str("network error"),
            Self::Decode => f.write_str("decode error"),
        }
    }
}

/// A recorded, non-fatal failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct SyncFault {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl SyncFault {
    /// Create a network fault.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Network,
            message: message.into(),
        }
    }

    /// Create a decode fault.
    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Decode,
            message: message.into(),
        }
    }
}

/// Which path issued a full-state fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// An event frame arrived on the stream.
    Event,
    /// Polling fallback tick.
    Poll,
    /// Periodic consistency refresh tick.
    Refresh,
    /// A command succeeded.
    Command,
    /// Explicit caller request.
    Manual,
}

impl fmt::Display for FetchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Event => "event",
            Self::Poll => "poll",
            Self::Refresh => "refresh",
            Self::Command => "command",
            Self::Manual => "manual",
        };
        f.write_str(label)
    }
}

/// Whether a polling tick should fetch given the stream status.
pub fn should_poll(status: ConnectionStatus) -> bool {
    status != ConnectionStatus::Connected
}

/// Observable synchronizer state.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    snapshot: Option<Arc<Snapshot>>,
    last_error: Option<SyncFault>,
    polling_reachable: bool,
}

impl SyncState {
    /// Create an empty state (no snapshot yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// The last successfully fetched snapshot.
    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.snapshot.as_ref()
    }

    /// The last recorded failure, if the most recent operation failed.
    pub fn last_error(&self) -> Option<&SyncFault> {
        self.last_error.as_ref()
    }

    /// Whether the last fallback poll succeeded.
    pub fn polling_reachable(&self) -> bool {
        self.polling_reachable
    }

    /// Apply a fetch result.
    ///
    /// Success replaces the snapshot and clears the error. Failure records the
    /// error and keeps the previous snapshot. Returns the applied snapshot or
    /// the recorded fault.
    pub fn apply_fetch(
        &mut self,
        source: FetchSource,
        result: Result<Snapshot, SyncFault>,
    ) -> Result<Arc<Snapshot>, SyncFault> {
        let outcome = match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.snapshot = Some(Arc::clone(&snapshot));
                self.last_error = None;
                Ok(snapshot)
            }
            Err(fault) => {
                self.last_error = Some(fault.clone());
                Err(fault)
            }
        };
        if source == FetchSource::Poll {
            self.polling_reachable = outcome.is_ok();
        }
        outcome
    }

    /// Record a failure that did not come from a fetch.
    pub fn record_error(&mut self, fault: SyncFault) {
        self.last_error = Some(fault);
    }

    /// Clear the recorded failure.
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Forget fallback reachability (on disconnect).
    pub fn reset_reachability(&mut self) {
        self.polling_reachable = false;
    }

    /// Status to show, given the stream status.
    ///
    /// A successful fallback poll counts as connected even when the stream
    /// is down.
    pub fn effective_status(&self, stream: ConnectionStatus) -> ConnectionStatus {
        if self.polling_reachable {
            ConnectionStatus::Connected
        } else {
            stream
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(marker: i64) -> Snapshot {
        Snapshot::new(json!({"marker": marker}))
    }

    #[test]
    fn starts_empty() {
        let state = SyncState::new();
        assert!(state.snapshot().is_none());
        assert!(state.last_error().is_none());
    }

    #[test]
    fn success_replaces_snapshot() {
        let mut state = SyncState::new();
        state.apply_fetch(FetchSource::Manual, Ok(snapshot(1))).unwrap();
        let applied = state.apply_fetch(FetchSource::Refresh, Ok(snapshot(2))).unwrap();

        assert!(Arc::ptr_eq(&applied, state.snapshot().unwrap()));

        assert_eq!(
            state.snapshot().unwrap().document(),
            &json!({"marker": 2})
        );
    }

    #[test]
    fn failure_keeps_previous_snapshot() {
        let mut state = SyncState::new();
        state.apply_fetch(FetchSource::Manual, Ok(snapshot(1))).unwrap();

        let replaced = state.apply_fetch(
            FetchSource::Refresh,
            Err(SyncFault::network("status 500")),
        );

        assert_eq!(replaced, Err(SyncFault::network("status 500")));
        assert_eq!(state.snapshot().unwrap().document(), &json!({"marker": 1}));
        assert_eq!(state.last_error().unwrap().kind, ErrorKind::Network);
    }

    #[test]
    fn failure_before_first_success_leaves_snapshot_absent() {
        let mut state = SyncState::new();
        state
            .apply_fetch(FetchSource::Event, Err(SyncFault::decode("eof")))
            .unwrap_err();
        assert!(state.snapshot().is_none());
        assert!(state.last_error().is_some());
    }

    #[test]
    fn success_clears_error() {
        let mut state = SyncState::new();
        state
            .apply_fetch(FetchSource::Poll, Err(SyncFault::network("refused")))
            .unwrap_err();
        state.apply_fetch(FetchSource::Poll, Ok(snapshot(3))).unwrap();
        assert!(state.last_error().is_none());
    }

    #[test]
    fn poll_success_reports_connected() {
        let mut state = SyncState::new();
        assert_eq!(
            state.effective_status(ConnectionStatus::Connecting),
            ConnectionStatus::Connecting
        );

        state.apply_fetch(FetchSource::Poll, Ok(snapshot(1))).unwrap();
        assert_eq!(
            state.effective_status(ConnectionStatus::Connecting),
            ConnectionStatus::Connected
        );

        state
            .apply_fetch(FetchSource::Poll, Err(SyncFault::network("timeout")))
            .unwrap_err();
        assert_eq!(
            state.effective_status(ConnectionStatus::Disconnected),
            ConnectionStatus::Disconnected
        );
    }

    #[test]
    fn non_poll_success_does_not_touch_reachability() {
        let mut state = SyncState::new();
        state.apply_fetch(FetchSource::Refresh, Ok(snapshot(1))).unwrap();
        assert!(!state.polling_reachable());
    }

    #[test]
    fn polling_only_when_stream_not_connected() {
        assert!(should_poll(ConnectionStatus::Disconnected));
        assert!(should_poll(ConnectionStatus::Connecting));
        assert!(!should_poll(ConnectionStatus::Connected));
    }

    #[test]
    fn fault_display() {
        let fault = SyncFault::network("status 500");
        assert_eq!(fault.to_string(), "network error: status 500");
    }
}
