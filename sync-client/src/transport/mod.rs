//! Transport abstraction for the streaming path.
//!
//! This module provides a pluggable transport layer that abstracts
//! the underlying connection mechanism (websocket, mock for testing).
//!
//! # Design
//!
//! The transport trait is async and connection-oriented:
//! - `connect()` opens the stream
//! - `send()` transmits one text frame
//! - `recv()` waits for the next text frame, or reports why the stream closed
//! - `ping()` sends a transport-level liveness probe
//! - `close()` terminates with a close code
//!
//! All methods take `&self` so one task can read while others write.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.connect("ws://pool:4200/socket.io/?EIO=4&transport=websocket").await?;
//! transport.send("3").await?;
//! let text = transport.recv().await?;
//! ```

mod mock;
mod websocket;

pub use mock::MockTransport;
pub use websocket::WebSocketTransport;

use async_trait::async_trait;
use sync_types::CloseReason;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// The stream closed.
    #[error("connection closed: {0}")]
    Closed(CloseReason),

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Websocket protocol violation.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// The close reason this error implies for the reconnection policy.
    pub fn close_reason(&self) -> CloseReason {
        match self {
            Self::Closed(reason) => reason.clone(),
            Self::NotConnected => CloseReason::NotConnected,
            other => CloseReason::Error(other.to_string()),
        }
    }
}

/// Transport trait for the streaming text protocol.
///
/// Implementations handle the underlying connection mechanism
/// (websocket, mock, etc).
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open the stream at `url`.
    async fn connect(&self, url: &str) -> Result<(), TransportError>;

    /// Send one text frame.
    async fn send(&self, text: &str) -> Result<(), TransportError>;

    /// Receive the next text frame.
    ///
    /// Blocks until a frame is available. Returns `Err(Closed(..))` when the
    /// peer closes the stream.
    async fn recv(&self) -> Result<String, TransportError>;

    /// Send a transport-level ping.
    async fn ping(&self) -> Result<(), TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the stream with the given close code.
    async fn close(&self, code: u16) -> Result<(), TransportError>;
}
