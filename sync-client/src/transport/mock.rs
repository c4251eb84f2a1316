//! Mock transport for testing.
//!
//! Allows scripting inbound frames and closes, and capturing outbound
//! frames, probes and close codes for verification.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sync_types::CloseReason;
use tokio::sync::Notify;

/// Mock transport for testing.
///
/// Clones share state, so a test can keep one handle while the client owns
/// another.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
    wake: Arc<Notify>,
}

#[derive(Debug)]
enum Inbound {
    Text(String),
    Close(CloseReason),
}

#[derive(Debug, Default)]
struct MockTransportInner {
    connected: bool,
    connected_url: Option<String>,
    connect_count: usize,
    connect_delay: Option<Duration>,
    sent_messages: Vec<String>,
    receive_queue: VecDeque<Inbound>,
    ping_count: usize,
    close_codes: Vec<u16>,
    fail_next_connect: Option<String>,
    refuse_connections: Option<String>,
    fail_next_send: Option<String>,
    fail_next_recv: Option<String>,
    fail_next_ping: Option<String>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text frame to be returned by `recv()`.
    pub fn queue_text(&self, text: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.receive_queue.push_back(Inbound::Text(text.to_string()));
        drop(inner);
        self.wake.notify_one();
    }

    /// Queue a peer close; `recv()` reports it once earlier frames are drained.
    pub fn queue_close(&self, reason: CloseReason) {
        let mut inner = self.inner.lock().unwrap();
        inner.receive_queue.push_back(Inbound::Close(reason));
        drop(inner);
        self.wake.notify_one();
    }

    /// Get all frames that were sent.
    pub fn sent_messages(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.sent_messages.clone()
    }

    /// Get the last frame that was sent.
    pub fn last_sent(&self) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.sent_messages.last().cloned()
    }

    /// Get the URL that was connected to.
    pub fn connected_url(&self) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.connected_url.clone()
    }

    /// Number of `connect()` calls made so far.
    pub fn connect_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.connect_count
    }

    /// Number of successful pings.
    pub fn ping_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.ping_count
    }

    /// Close codes passed to `close()`.
    pub fn close_codes(&self) -> Vec<u16> {
        let inner = self.inner.lock().unwrap();
        inner.close_codes.clone()
    }

    /// Make every `connect()` wait this long before completing.
    pub fn set_connect_delay(&self, delay: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.connect_delay = Some(delay);
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_connect = Some(error.to_string());
    }

    /// Cause every connect() to fail until [`MockTransport::accept_connections`].
    pub fn refuse_connections(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.refuse_connections = Some(error.to_string());
    }

    /// Undo [`MockTransport::refuse_connections`].
    pub fn accept_connections(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.refuse_connections = None;
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_send = Some(error.to_string());
    }

    /// Cause the next recv() to fail with the given error.
    pub fn fail_next_recv(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_recv = Some(error.to_string());
    }

    /// Cause the next ping() to fail with the given error.
    pub fn fail_next_ping(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_ping = Some(error.to_string());
    }

    /// Clear all state (frames, queue, connection, counters).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockTransportInner::default();
        drop(inner);
        self.wake.notify_one();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            wake: Arc::clone(&self.wake),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, url: &str) -> Result<(), TransportError> {
        let delay = {
            let mut inner = self.inner.lock().unwrap();
            inner.connect_count += 1;
            inner.connect_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock().unwrap();

        // Check for forced failure
        if let Some(error) = inner.fail_next_connect.take() {
            return Err(TransportError::ConnectionFailed(error));
        }
        if let Some(error) = inner.refuse_connections.clone() {
            return Err(TransportError::ConnectionFailed(error));
        }

        inner.connected = true;
        inner.connected_url = Some(url.to_string());
        Ok(())
    }

    async fn send(&self, text: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent_messages.push(text.to_string());
        Ok(())
    }

    async fn recv(&self) -> Result<String, TransportError> {
        loop {
            {
                let mut inner = self.inner.lock().unwrap();

                if !inner.connected {
                    return Err(TransportError::NotConnected);
                }

                // Check for forced failure
                if let Some(error) = inner.fail_next_recv.take() {
                    return Err(TransportError::ReceiveFailed(error));
                }

                match inner.receive_queue.pop_front() {
                    Some(Inbound::Text(text)) => return Ok(text),
                    Some(Inbound::Close(reason)) => {
                        inner.connected = false;
                        return Err(TransportError::Closed(reason));
                    }
                    None => {}
                }
            }
            self.wake.notified().await;
        }
    }

    async fn ping(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }

        if let Some(error) = inner.fail_next_ping.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.ping_count += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.connected
    }

    async fn close(&self, code: u16) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.connected = false;
        inner.close_codes.push(code);
        drop(inner);
        self.wake.notify_one();
        Ok(())
    }
}
