//! Streaming connection lifecycle.
//!
//! [`ConnectionManager`] feeds events into the pure [`ConnectionMachine`]
//! and owns the transport side of the resulting actions: opening and
//! closing the stream, the reader task, the heartbeat and the reconnect
//! delay. The coordinator decides which action goes where.
//!
//! Each opened stream gets a session number. Inputs carry the session they
//! came from, and anything from an older session is ignored, so a stream
//! torn down by `disconnect()` can never report in afterwards.

use std::sync::Arc;
use std::time::Duration;

use sync_core::{Action, ConnectionMachine, Event};
use sync_types::{ConnectionStatus, Frame};
use tokio::sync::mpsc::UnboundedSender;

use crate::coordinator::{Connectivity, Input};
use crate::heartbeat::spawn_heartbeat;
use crate::scheduler::{spawn_after, TimerSlot};
use crate::transport::Transport;

pub(crate) struct ConnectionManager<T: Transport> {
    transport: Arc<T>,
    url: String,
    heartbeat_interval: Duration,
    machine: ConnectionMachine,
    session: u64,
    reader: TimerSlot,
    heartbeat: TimerSlot,
    reconnect: TimerSlot,
    inputs: UnboundedSender<Input>,
}

impl<T: Transport> ConnectionManager<T> {
    pub(crate) fn new(
        transport: Arc<T>,
        url: String,
        heartbeat_interval: Duration,
        machine: ConnectionMachine,
        inputs: UnboundedSender<Input>,
    ) -> Self {
        Self {
            transport,
            url,
            heartbeat_interval,
            machine,
            session: 0,
            reader: TimerSlot::new("reader"),
            heartbeat: TimerSlot::new("heartbeat"),
            reconnect: TimerSlot::new("reconnect"),
            inputs,
        }
    }

    pub(crate) fn status(&self) -> ConnectionStatus {
        self.machine.status()
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.machine.is_connected()
    }

    /// Whether `session` is the stream currently owned by the manager.
    pub(crate) fn is_current(&self, session: u64) -> bool {
        session == self.session
    }

    /// Run an event through the state machine and return its actions.
    pub(crate) fn transition(&mut self, event: Event) -> Vec<Action> {
        let machine = std::mem::take(&mut self.machine);
        let before = machine.state();
        let (machine, actions) = machine.on_event(event);
        self.machine = machine;
        if before != self.machine.state() {
            tracing::debug!(from = ?before, to = ?self.machine.state(), "connection state changed");
        }
        actions
    }

    pub(crate) fn start_heartbeat(&mut self) {
        self.heartbeat.start(spawn_heartbeat(
            Arc::clone(&self.transport),
            self.heartbeat_interval,
        ));
    }

    pub(crate) fn stop_heartbeat(&mut self) {
        self.heartbeat.stop();
    }

    pub(crate) fn schedule_reconnect(&mut self, delay: Duration) {
        tracing::info!(
            attempt = self.machine.retry().attempt(),
            reason = ?self.machine.retry().last_reason(),
            "reconnecting in {}ms",
            delay.as_millis()
        );
        self.reconnect
            .start(spawn_after(delay, self.inputs.clone(), Input::ReconnectDue));
    }

    pub(crate) fn cancel_reconnect(&mut self) {
        self.reconnect.stop();
    }

    /// Handle a raw frame from the current session.
    ///
    /// Replies to handshakes and heartbeats. Returns the frame only when it
    /// is an event; everything undecodable is logged and dropped.
    pub(crate) async fn on_text(&self, text: &str) -> Option<Frame> {
        let frame = match Frame::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("dropping frame: {}", e);
                return None;
            }
        };

        if let Some(reply) = frame.reply() {
            self.send_reply(&reply).await;
        }

        match frame {
            Frame::Handshake(_) => {
                tracing::debug!("handshake received");
                None
            }
            Frame::Heartbeat(beat) => {
                tracing::trace!(?beat, "heartbeat frame");
                None
            }
            Frame::Raw(payload) => {
                tracing::debug!(%payload, "ignoring untagged frame");
                None
            }
            event @ Frame::Event { .. } => Some(event),
        }
    }

    async fn send_reply(&self, reply: &Frame) {
        let text = match reply.encode() {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("failed to encode reply: {}", e);
                return;
            }
        };
        if let Err(e) = self.transport.send(&text).await {
            tracing::warn!("failed to send reply frame: {}", e);
        }
    }

    /// Start a new session: connect and read frames in a background task.
    pub(crate) fn open(&mut self) {
        self.session += 1;
        let session = self.session;
        let transport = Arc::clone(&self.transport);
        let url = self.url.clone();
        let inputs = self.inputs.clone();

        tracing::info!(session, %url, "opening stream");
        self.reader.start(tokio::spawn(async move {
            if let Err(e) = transport.connect(&url).await {
                tracing::warn!(session, "stream connect failed: {}", e);
                let _ = inputs.send(Input::ConnectivityChanged {
                    session,
                    change: Connectivity::Closed(e.close_reason()),
                });
                return;
            }
            let opened = Input::ConnectivityChanged {
                session,
                change: Connectivity::Opened,
            };
            if inputs.send(opened).is_err() {
                return;
            }

            loop {
                match transport.recv().await {
                    Ok(text) => {
                        tracing::trace!(session, %text, "frame received");
                        if inputs.send(Input::FrameReceived { session, text }).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::info!(session, "stream closed: {}", e);
                        let _ = inputs.send(Input::ConnectivityChanged {
                            session,
                            change: Connectivity::Closed(e.close_reason()),
                        });
                        return;
                    }
                }
            }
        }));
    }

    /// Retire the current session and close the stream with `code`.
    pub(crate) async fn close(&mut self, code: u16) {
        self.reader.stop();
        // Retire the session so nothing from the old stream is applied.
        self.session += 1;
        if let Err(e) = self.transport.close(code).await {
            tracing::debug!("close failed: {}", e);
        }
        tracing::info!(code, "stream closed by client");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use sync_core::RetrySchedule;
    use sync_types::CloseReason;
    use tokio::sync::mpsc;

    impl ConnectionManager<MockTransport> {
        /// Transition and perform the transport actions, returning the rest.
        async fn handle(&mut self, event: Event) -> Vec<Action> {
            let mut remaining = Vec::new();
            for action in self.transition(event) {
                match action {
                    Action::OpenTransport => self.open(),
                    Action::CloseTransport { code } => self.close(code).await,
                    Action::StartHeartbeat => self.start_heartbeat(),
                    Action::StopHeartbeat => self.stop_heartbeat(),
                    Action::StartReconnectTimer { delay } => self.schedule_reconnect(delay),
                    Action::CancelReconnect => self.cancel_reconnect(),
                    other => remaining.push(other),
                }
            }
            remaining
        }
    }

    fn manager(
        transport: &MockTransport,
    ) -> (
        ConnectionManager<MockTransport>,
        mpsc::UnboundedReceiver<Input>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = ConnectionManager::new(
            Arc::new(transport.clone()),
            "ws://pool:4200/socket.io/?EIO=4&transport=websocket".into(),
            Duration::from_secs(30),
            ConnectionMachine::new(RetrySchedule::new(
                Duration::from_millis(10),
                Duration::from_millis(50),
            )),
            tx,
        );
        (manager, rx)
    }

    async fn next_connectivity(rx: &mut mpsc::UnboundedReceiver<Input>) -> (u64, Connectivity) {
        loop {
            match rx.recv().await {
                Some(Input::ConnectivityChanged { session, change }) => return (session, change),
                Some(_) => continue,
                None => panic!("input channel closed"),
            }
        }
    }

    // ===========================================
    // Opening and closing
    // ===========================================

    #[tokio::test]
    async fn connect_opens_transport_and_reports_open() {
        let transport = MockTransport::new();
        let (mut manager, mut rx) = manager(&transport);

        let remaining = manager.handle(Event::ConnectRequested).await;
        assert!(remaining.contains(&Action::EmitStatus(ConnectionStatus::Connecting)));
        assert!(remaining.contains(&Action::StartRefresh));

        let (session, change) = next_connectivity(&mut rx).await;
        assert!(manager.is_current(session));
        assert_eq!(change, Connectivity::Opened);
        assert!(transport.connected_url().unwrap().contains("/socket.io/"));

        let remaining = manager.handle(Event::TransportOpened).await;
        assert!(manager.is_connected());
        assert!(remaining.contains(&Action::ClearError));
    }

    #[tokio::test]
    async fn connect_failure_reports_close() {
        let transport = MockTransport::new();
        transport.fail_next_connect("refused");
        let (mut manager, mut rx) = manager(&transport);

        manager.handle(Event::ConnectRequested).await;

        let (_, change) = next_connectivity(&mut rx).await;
        assert!(matches!(change, Connectivity::Closed(CloseReason::Error(_))));
    }

    #[tokio::test]
    async fn disconnect_closes_with_going_away_and_retires_session() {
        let transport = MockTransport::new();
        let (mut manager, mut rx) = manager(&transport);

        manager.handle(Event::ConnectRequested).await;
        let (session, _) = next_connectivity(&mut rx).await;
        manager.handle(Event::TransportOpened).await;

        let remaining = manager.handle(Event::DisconnectRequested).await;

        assert_eq!(transport.close_codes(), vec![1001]);
        assert!(!manager.is_current(session));
        assert_eq!(manager.status(), ConnectionStatus::Disconnected);
        assert!(remaining.contains(&Action::StopPolling));
        assert!(!manager.heartbeat.is_running());
    }

    #[tokio::test]
    async fn unexpected_close_schedules_reconnect() {
        let transport = MockTransport::new();
        let (mut manager, mut rx) = manager(&transport);

        manager.handle(Event::ConnectRequested).await;
        next_connectivity(&mut rx).await;
        manager.handle(Event::TransportOpened).await;

        transport.queue_close(CloseReason::NotConnected);
        let (_, change) = next_connectivity(&mut rx).await;
        assert_eq!(change, Connectivity::Closed(CloseReason::NotConnected));

        manager
            .handle(Event::TransportClosed {
                reason: CloseReason::NotConnected,
            })
            .await;
        assert!(manager.reconnect.is_running());

        loop {
            match rx.recv().await {
                Some(Input::ReconnectDue) => break,
                Some(_) => continue,
                None => panic!("input channel closed"),
            }
        }
    }

    #[tokio::test]
    async fn normal_close_does_not_reconnect() {
        let transport = MockTransport::new();
        let (mut manager, mut rx) = manager(&transport);

        manager.handle(Event::ConnectRequested).await;
        next_connectivity(&mut rx).await;
        manager.handle(Event::TransportOpened).await;

        manager
            .handle(Event::TransportClosed {
                reason: CloseReason::Normal,
            })
            .await;

        assert!(!manager.reconnect.is_running());
        assert_eq!(manager.status(), ConnectionStatus::Disconnected);
    }

    // ===========================================
    // Frame handling
    // ===========================================

    #[tokio::test]
    async fn handshake_is_answered_with_pong() {
        let transport = MockTransport::new();
        transport.connect("ws://pool/").await.unwrap();
        let (manager, _rx) = manager(&transport);

        let frame = manager.on_text(r#"0{"sid":"abc"}"#).await;

        assert!(frame.is_none());
        assert_eq!(transport.sent_messages(), vec!["3".to_string()]);
    }

    #[tokio::test]
    async fn pong_is_answered_with_ping_and_ping_with_pong() {
        let transport = MockTransport::new();
        transport.connect("ws://pool/").await.unwrap();
        let (manager, _rx) = manager(&transport);

        assert!(manager.on_text("3").await.is_none());
        assert!(manager.on_text("2").await.is_none());

        assert_eq!(
            transport.sent_messages(),
            vec!["2".to_string(), "3".to_string()]
        );
    }

    #[tokio::test]
    async fn event_frames_are_surfaced() {
        let transport = MockTransport::new();
        transport.connect("ws://pool/").await.unwrap();
        let (manager, _rx) = manager(&transport);

        let frame = manager
            .on_text(r#"2["circuit",{"id":5,"isOn":true}]"#)
            .await
            .unwrap();

        assert!(frame.is_event());
        assert!(transport.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn malformed_frames_are_dropped() {
        let transport = MockTransport::new();
        transport.connect("ws://pool/").await.unwrap();
        let (manager, _rx) = manager(&transport);

        assert!(manager.on_text("").await.is_none());
        assert!(manager.on_text("2[broken").await.is_none());
        assert!(manager.on_text("not json").await.is_none());
        assert!(transport.sent_messages().is_empty());
    }
}
