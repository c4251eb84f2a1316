//! The client's single coordinating loop.
//!
//! All state changes happen here, one input at a time. Caller requests,
//! transport notifications, fetch results and timer ticks are all posted
//! to one unbounded queue, so there is no interleaving between timers and
//! the stream to reason about.
//!
//! ```text
//! caller ──┐
//! reader ──┤                      ┌─► ConnectionManager ─► Transport
//! timers ──┼─► Input queue ─► run ┤
//! fetches ─┘                      └─► StateSynchronizer ─► StateApi
//! ```

use std::sync::Arc;
use std::time::Duration;

use sync_core::{should_poll, Action, ConnectionMachine, Event, FetchSource, RetrySchedule, SyncFault};
use sync_types::{CloseReason, ConnectionStatus, Snapshot};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::StateApi;
use crate::config::{ClientConfig, Timing};
use crate::connection::ConnectionManager;
use crate::context::SyncContext;
use crate::scheduler::{spawn_after, spawn_ticker, TimerSlot};
use crate::synchronizer::{FetchReply, StateSynchronizer};
use crate::transport::Transport;

/// Change in stream connectivity reported by the reader task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Connectivity {
    Opened,
    Closed(CloseReason),
}

/// Everything the coordinator reacts to.
pub(crate) enum Input {
    Connect {
        done: oneshot::Sender<ConnectionStatus>,
    },
    Disconnect {
        done: oneshot::Sender<()>,
    },
    ConnectivityChanged {
        session: u64,
        change: Connectivity,
    },
    FrameReceived {
        session: u64,
        text: String,
    },
    FetchCompleted {
        source: FetchSource,
        result: Result<Snapshot, SyncFault>,
        reply: Option<FetchReply>,
    },
    Refetch {
        source: FetchSource,
        reply: Option<FetchReply>,
    },
    CommandFailed {
        fault: SyncFault,
    },
    ReconnectDue,
    PollingStart,
    PollTick,
    RefreshTick,
}

pub(crate) struct Coordinator<T: Transport, A: StateApi> {
    connection: ConnectionManager<T>,
    synchronizer: StateSynchronizer<A>,
    context: SyncContext,
    timing: Timing,
    inputs: UnboundedSender<Input>,
    // Between connect() and disconnect(); ticks queued outside that window are dropped.
    active: bool,
    polling_start: TimerSlot,
    polling: TimerSlot,
    refresh: TimerSlot,
}

impl<T: Transport, A: StateApi> Coordinator<T, A> {
    pub(crate) fn new(
        config: &ClientConfig,
        transport: Arc<T>,
        api: Arc<A>,
        context: SyncContext,
        inputs: UnboundedSender<Input>,
    ) -> Self {
        let timing = config.timing.clone();
        let machine = ConnectionMachine::new(RetrySchedule::new(
            timing.stale_reconnect(),
            timing.reconnect(),
        ));
        Self {
            connection: ConnectionManager::new(
                transport,
                config.socket_url(),
                timing.heartbeat(),
                machine,
                inputs.clone(),
            ),
            synchronizer: StateSynchronizer::new(api, context.clone(), inputs.clone()),
            context,
            timing,
            inputs,
            active: false,
            polling_start: TimerSlot::new("polling-start"),
            polling: TimerSlot::new("polling"),
            refresh: TimerSlot::new("refresh"),
        }
    }

    /// Spawn the loop. Aborting the returned handle drops the coordinator,
    /// which cancels every timer it owns.
    pub(crate) fn spawn(self, inputs: UnboundedReceiver<Input>) -> JoinHandle<()> {
        tokio::spawn(self.run(inputs))
    }

    async fn run(mut self, mut inputs: UnboundedReceiver<Input>) {
        while let Some(input) = inputs.recv().await {
            self.on_input(input).await;
        }
        tracing::debug!("coordinator stopped");
    }

    async fn on_input(&mut self, input: Input) {
        match input {
            Input::Connect { done } => {
                self.drive(Event::ConnectRequested).await;
                let _ = done.send(self.connection.status());
            }
            Input::Disconnect { done } => {
                self.drive(Event::DisconnectRequested).await;
                let _ = done.send(());
            }
            Input::ConnectivityChanged { session, change } => {
                if !self.connection.is_current(session) {
                    tracing::trace!(session, "ignoring connectivity from a retired stream");
                    return;
                }
                let event = match change {
                    Connectivity::Opened => Event::TransportOpened,
                    Connectivity::Closed(reason) => Event::TransportClosed { reason },
                };
                self.drive(event).await;
            }
            Input::FrameReceived { session, text } => {
                if !self.connection.is_current(session) {
                    tracing::trace!(session, "ignoring frame from a retired stream");
                    return;
                }
                if let Some(frame) = self.connection.on_text(&text).await {
                    self.synchronizer.on_event(&frame);
                }
            }
            Input::FetchCompleted {
                source,
                result,
                reply,
            } => {
                let outcome = self.synchronizer.apply(source, result);
                // A poll that lands after the fallback stopped says nothing
                // about current reachability.
                if source == FetchSource::Poll && !self.polling.is_running() {
                    self.context.reset_reachability();
                }
                if let Some(reply) = reply {
                    let _ = reply.send(outcome);
                }
            }
            Input::Refetch { source, reply } => self.synchronizer.request(source, reply),
            Input::CommandFailed { fault } => self.context.record_error(fault),
            Input::ReconnectDue => self.drive(Event::ReconnectTimer).await,
            Input::PollingStart | Input::PollTick | Input::RefreshTick if !self.active => {
                tracing::trace!("ignoring tick after disconnect");
            }
            Input::PollingStart => self.start_polling(),
            Input::PollTick => {
                if should_poll(self.connection.status()) {
                    self.synchronizer.request(FetchSource::Poll, None);
                } else {
                    tracing::trace!("stream connected; skipping poll");
                }
            }
            Input::RefreshTick => self.synchronizer.request(FetchSource::Refresh, None),
        }
    }

    async fn drive(&mut self, event: Event) {
        for action in self.connection.transition(event) {
            self.perform(action).await;
        }
    }

    async fn perform(&mut self, action: Action) {
        match action {
            Action::OpenTransport => self.connection.open(),
            Action::CloseTransport { code } => self.connection.close(code).await,
            Action::StartHeartbeat => self.connection.start_heartbeat(),
            Action::StopHeartbeat => self.connection.stop_heartbeat(),
            Action::StartReconnectTimer { delay } => self.connection.schedule_reconnect(delay),
            Action::CancelReconnect => self.connection.cancel_reconnect(),
            Action::EmitStatus(status) => {
                tracing::info!("connection status: {}", status);
                self.context.set_status(status);
            }
            Action::ClearError => self.context.clear_error(),
            Action::StartRefresh => {
                self.active = true;
                let every = self.timing.refresh();
                self.refresh.start(spawn_ticker(
                    every,
                    every,
                    self.inputs.clone(),
                    || Input::RefreshTick,
                ));
            }
            Action::StopRefresh => {
                self.active = false;
                self.refresh.stop();
            }
            Action::SchedulePolling => {
                self.polling_start.start(spawn_after(
                    self.timing.polling_start(),
                    self.inputs.clone(),
                    Input::PollingStart,
                ));
            }
            Action::StopPolling => {
                self.polling_start.stop();
                self.polling.stop();
                self.context.reset_reachability();
            }
        }
    }

    fn start_polling(&mut self) {
        if !self.connection.is_connected() {
            tracing::info!(
                "stream not connected; polling every {}ms",
                self.timing.polling().as_millis()
            );
        }
        self.polling.start(spawn_ticker(
            Duration::ZERO,
            self.timing.polling(),
            self.inputs.clone(),
            || Input::PollTick,
        ));
    }
}
