//! Connection state machine for the streaming path.
//!
//! This module provides a pure, side-effect-free state machine for managing
//! the stream lifecycle. The machine takes events as input and produces
//! a new state plus a list of actions to execute.
//!
//! The actual I/O (opening sockets, arming timers) is performed by
//! sync-client, not by this module.

use std::time::Duration;
use sync_types::{CloseReason, ConnectionStatus, CLOSE_GOING_AWAY};

use crate::RetrySchedule;

/// Stream state - NO I/O, just state transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No stream.
    #[default]
    Disconnected,
    /// Transport open in progress.
    Connecting,
    /// Transport open.
    Connected,
}

impl ConnectionState {
    /// The externally visible status for this state.
    pub fn status(self) -> ConnectionStatus {
        match self {
            Self::Disconnected => ConnectionStatus::Disconnected,
            Self::Connecting => ConnectionStatus::Connecting,
            Self::Connected => ConnectionStatus::Connected,
        }
    }
}

/// Events that can occur in the stream lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Caller asked to connect.
    ConnectRequested,
    /// The transport finished opening.
    TransportOpened,
    /// The transport closed or failed.
    TransportClosed {
        /// Why it closed.
        reason: CloseReason,
    },
    /// Caller asked to disconnect.
    DisconnectRequested,
    /// The reconnect delay elapsed.
    ReconnectTimer,
}

/// Actions to be executed by the sync-client.
///
/// These are instructions, not side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open the streaming transport and start reading frames.
    OpenTransport,
    /// Close the streaming transport with the given close code.
    CloseTransport {
        /// Websocket close code.
        code: u16,
    },
    /// Start the liveness probe.
    StartHeartbeat,
    /// Stop the liveness probe.
    StopHeartbeat,
    /// Arm the reconnect timer.
    StartReconnectTimer {
        /// Delay before the next attempt.
        delay: Duration,
    },
    /// Disarm the reconnect timer.
    CancelReconnect,
    /// Start the periodic consistency refresh.
    StartRefresh,
    /// Stop the periodic consistency refresh.
    StopRefresh,
    /// Arm the delayed start of the polling fallback.
    SchedulePolling,
    /// Stop the polling fallback (and its delayed start).
    StopPolling,
    /// Clear the recorded last error.
    ClearError,
    /// Publish a status change.
    EmitStatus(ConnectionStatus),
}

/// Stream state plus the reconnection bookkeeping that drives it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionMachine {
    state: ConnectionState,
    retry: RetrySchedule,
    reconnect_pending: bool,
}

impl ConnectionMachine {
    /// Create a machine in the Disconnected state.
    pub fn new(retry: RetrySchedule) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            retry,
            reconnect_pending: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Current status.
    pub fn status(&self) -> ConnectionStatus {
        self.state.status()
    }

    /// Reconnection bookkeeping.
    pub fn retry(&self) -> &RetrySchedule {
        &self.retry
    }

    /// Whether a reconnect attempt is armed.
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Process an event and return the new machine plus actions to execute.
    ///
    /// This is a pure function - no side effects.
    pub fn on_event(mut self, event: Event) -> (Self, Vec<Action>) {
        let actions = match (self.state, event) {
            // connect() is a no-op unless Disconnected
            (ConnectionState::Disconnected, Event::ConnectRequested) => {
                self.reconnect_pending = false;
                self.state = ConnectionState::Connecting;
                vec![
                    Action::CancelReconnect,
                    Action::EmitStatus(ConnectionStatus::Connecting),
                    Action::OpenTransport,
                    Action::StartRefresh,
                    Action::SchedulePolling,
                ]
            }

            (ConnectionState::Connecting, Event::TransportOpened) => {
                self.retry.reset();
                self.state = ConnectionState::Connected;
                vec![
                    Action::EmitStatus(ConnectionStatus::Connected),
                    Action::StartHeartbeat,
                    Action::ClearError,
                ]
            }

            (
                ConnectionState::Connecting | ConnectionState::Connected,
                Event::TransportClosed { reason },
            ) => {
                self.state = ConnectionState::Disconnected;
                let mut actions = vec![
                    Action::StopHeartbeat,
                    Action::EmitStatus(ConnectionStatus::Disconnected),
                ];
                if !reason.is_intentional() {
                    let delay = self.retry.record_close(reason);
                    self.reconnect_pending = true;
                    actions.push(Action::StartReconnectTimer { delay });
                }
                actions
            }

            (ConnectionState::Disconnected, Event::ReconnectTimer) if self.reconnect_pending => {
                self.reconnect_pending = false;
                self.state = ConnectionState::Connecting;
                vec![
                    Action::EmitStatus(ConnectionStatus::Connecting),
                    Action::OpenTransport,
                ]
            }

            // Stop paths run every time, whatever the state.
            (previous, Event::DisconnectRequested) => {
                self.reconnect_pending = false;
                self.retry.reset();
                self.state = ConnectionState::Disconnected;
                let mut actions = vec![
                    Action::StopHeartbeat,
                    Action::CancelReconnect,
                    Action::StopPolling,
                    Action::StopRefresh,
                    Action::CloseTransport {
                        code: CLOSE_GOING_AWAY,
                    },
                ];
                if previous != ConnectionState::Disconnected {
                    actions.push(Action::EmitStatus(ConnectionStatus::Disconnected));
                }
                actions
            }

            // Invalid transitions - stay in current state
            _ => vec![],
        };
        (self, actions)
    }

    /// Check if the stream is open.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}
