//! Websocket transport built on `tokio-tungstenite`.
//!
//! The socket is split into a write half and a read half behind separate
//! locks, so the reader task can block in `recv()` while the heartbeat and
//! frame replies write.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use sync_types::CloseReason;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{Transport, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Close code reported when the peer closes without a status.
const NO_STATUS_RECEIVED: u16 = 1005;

/// Websocket transport for the controller's socket endpoint.
#[derive(Default)]
pub struct WebSocketTransport {
    writer: Mutex<Option<SplitSink<WsStream, Message>>>,
    reader: Mutex<Option<SplitStream<WsStream>>>,
    connected: AtomicBool,
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl WebSocketTransport {
    /// Create an unconnected transport.
    pub fn new() -> Self {
        Self::default()
    }

    async fn write(&self, message: Message) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        let sink = writer.as_mut().ok_or(TransportError::NotConnected)?;
        sink.send(message).await.map_err(|e| match map_ws_error(e) {
            TransportError::ReceiveFailed(detail) => TransportError::SendFailed(detail),
            other => other,
        })
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, url: &str) -> Result<(), TransportError> {
        let (socket, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        let (sink, stream) = socket.split();

        *self.writer.lock().await = Some(sink);
        *self.reader.lock().await = Some(stream);
        self.connected.store(true, Ordering::SeqCst);
        tracing::debug!(url, "websocket open");
        Ok(())
    }

    async fn send(&self, text: &str) -> Result<(), TransportError> {
        self.write(Message::Text(text.to_owned().into())).await
    }

    async fn recv(&self) -> Result<String, TransportError> {
        let mut reader = self.reader.lock().await;
        let stream = reader.as_mut().ok_or(TransportError::NotConnected)?;

        loop {
            let result = match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
                Some(Ok(Message::Close(frame))) => {
                    let code = frame.map_or(NO_STATUS_RECEIVED, |f| u16::from(f.code));
                    Err(TransportError::Closed(CloseReason::from_code(code)))
                }
                // Control and binary frames carry nothing for us
                Some(Ok(_)) => continue,
                Some(Err(e)) => Err(map_ws_error(e)),
                None => Err(TransportError::Closed(CloseReason::NotConnected)),
            };
            self.connected.store(false, Ordering::SeqCst);
            return result;
        }
    }

    async fn ping(&self) -> Result<(), TransportError> {
        self.write(Message::Ping(Default::default())).await
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self, code: u16) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        let Some(mut sink) = self.writer.lock().await.take() else {
            return Ok(());
        };
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: String::new().into(),
        };
        match sink.send(Message::Close(Some(frame))).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(map_ws_error(e)),
        }
    }
}

/// Classify a websocket error for the reconnection policy.
fn map_ws_error(error: WsError) -> TransportError {
    match error {
        WsError::ConnectionClosed | WsError::AlreadyClosed => {
            TransportError::Closed(CloseReason::NotConnected)
        }
        WsError::Io(e)
            if matches!(
                e.kind(),
                std::io::ErrorKind::NotConnected | std::io::ErrorKind::BrokenPipe
            ) =>
        {
            TransportError::Closed(CloseReason::NotConnected)
        }
        WsError::Protocol(e) => TransportError::Protocol(e.to_string()),
        other => TransportError::ReceiveFailed(other.to_string()),
    }
}
