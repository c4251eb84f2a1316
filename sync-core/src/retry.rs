//! Reconnection delay selection.
//!
//! The delay is a fixed lookup by close reason, not a backoff curve: a stale
//! socket is retried quickly, everything else after the default delay.
//! Retries continue until the caller disconnects.

use std::time::Duration;
use sync_types::CloseReason;

/// Delay before reconnecting after a stale-socket close.
pub const STALE_SOCKET_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Delay before reconnecting after any other unexpected close.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Upper bound on the tracked attempt counter.
///
/// The counter only feeds logs and status output; reaching it does not
/// stop reconnection.
pub const MAX_TRACKED_ATTEMPTS: u32 = 10_000;

/// Reconnection bookkeeping owned by the connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySchedule {
    stale_delay: Duration,
    default_delay: Duration,
    attempt: u32,
    last_reason: Option<CloseReason>,
}

impl RetrySchedule {
    /// Create a schedule with the given stale-socket and default delays.
    pub fn new(stale_delay: Duration, default_delay: Duration) -> Self {
        Self {
            stale_delay,
            default_delay,
            attempt: 0,
            last_reason: None,
        }
    }

    /// Delay for a close with the given reason.
    pub fn delay_for(&self, reason: &CloseReason) -> Duration {
        match reason {
            CloseReason::NotConnected => self.stale_delay,
            _ => self.default_delay,
        }
    }

    /// Record an unexpected close and return the delay before the next attempt.
    pub fn record_close(&mut self, reason: CloseReason) -> Duration {
        let delay = self.delay_for(&reason);
        self.attempt = self.attempt.saturating_add(1).min(MAX_TRACKED_ATTEMPTS);
        self.last_reason = Some(reason);
        delay
    }

    /// Forget previous attempts after a successful open.
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.last_reason = None;
    }

    /// Number of unexpected closes since the last successful open.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Reason of the last unexpected close.
    pub fn last_reason(&self) -> Option<&CloseReason> {
        self.last_reason.as_ref()
    }
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self::new(STALE_SOCKET_RECONNECT_DELAY, DEFAULT_RECONNECT_DELAY)
    }
}
