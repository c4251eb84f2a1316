//! SyncClient - the main interface for the pool controller mirror.
//!
//! This module provides [`SyncClient`], the handle applications use to
//! start and stop synchronization, read the mirrored state and send
//! commands.
//!
//! # Architecture
//!
//! SyncClient uses a pure state machine (from sync-core) for connection
//! logic. A background coordinator task interprets its actions and performs
//! the actual I/O through the [`Transport`] and [`StateApi`] traits.
//!
//! ```text
//! Application → SyncClient → coordinator → Transport → controller stream
//!                   ↓              ↓
//!              SyncContext    StateApi → controller HTTP
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sync_client::{ClientConfig, MockApi, MockTransport, SyncClient};
//!
//! let client = SyncClient::new(
//!     ClientConfig::new("pool.local", 4200, false),
//!     MockTransport::new(),
//!     MockApi::new(),
//! );
//!
//! client.connect().await?;
//! let snapshot = client.refetch().await?;
//! client.dispatcher().toggle_circuit(6).await?;
//! ```

use std::sync::Arc;

use serde_json::{Map, Value};
use sync_core::{FetchSource, SyncFault, SyncState};
use sync_types::{encode_event, ConnectionStatus, FrameError, Snapshot};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::api::{ApiError, StateApi};
use crate::config::ClientConfig;
use crate::context::SyncContext;
use crate::coordinator::{Coordinator, Input};
use crate::dispatcher::CommandDispatcher;
use crate::transport::{Transport, TransportError};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Controller API error.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// Full-state fetch failed.
    #[error("fetch failed: {0}")]
    Fetch(SyncFault),

    /// Frame could not be encoded.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The stream is not connected.
    #[error("not connected")]
    NotConnected,

    /// The background coordinator is gone.
    #[error("client stopped")]
    Stopped,
}

/// The main sync client.
///
/// Must be created inside a tokio runtime. Dropping the client stops all
/// background work.
pub struct SyncClient<T: Transport, A: StateApi> {
    config: ClientConfig,
    transport: Arc<T>,
    context: SyncContext,
    dispatcher: CommandDispatcher<A>,
    inputs: UnboundedSender<Input>,
    task: JoinHandle<()>,
}

impl<T: Transport, A: StateApi> SyncClient<T, A> {
    /// Create a new SyncClient and start its coordinator.
    ///
    /// Nothing touches the network until [`connect`](Self::connect),
    /// [`refetch`](Self::refetch) or a command is issued.
    pub fn new(config: ClientConfig, transport: T, api: A) -> Self {
        let transport = Arc::new(transport);
        let api = Arc::new(api);
        let context = SyncContext::new();
        let (inputs, rx) = mpsc::unbounded_channel();

        let coordinator = Coordinator::new(
            &config,
            Arc::clone(&transport),
            Arc::clone(&api),
            context.clone(),
            inputs.clone(),
        );
        let task = coordinator.spawn(rx);
        let dispatcher = CommandDispatcher::new(api, context.clone(), inputs.clone());

        Self {
            config,
            transport,
            context,
            dispatcher,
            inputs,
            task,
        }
    }

    /// Start synchronizing.
    ///
    /// Opens the stream, starts the periodic refresh and schedules the
    /// polling fallback. A no-op unless currently disconnected. Returns the
    /// stream status once the request has been taken up, normally
    /// `Connecting`; watch [`subscribe_status`](Self::subscribe_status) for
    /// the outcome.
    pub async fn connect(&self) -> Result<ConnectionStatus, ClientError> {
        let (done, rx) = oneshot::channel();
        self.post(Input::Connect { done })?;
        rx.await.map_err(|_| ClientError::Stopped)
    }

    /// Stop synchronizing.
    ///
    /// Cancels every timer, closes the stream with "going away" and
    /// suppresses reconnection. Safe to call in any state.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let (done, rx) = oneshot::channel();
        self.post(Input::Disconnect { done })?;
        rx.await.map_err(|_| ClientError::Stopped)
    }

    /// Fetch the full state now and wait for the result.
    ///
    /// The result is published like any other fetch (a failure is recorded
    /// as the last error and the previous snapshot kept) and also returned.
    pub async fn refetch(&self) -> Result<Arc<Snapshot>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.post(Input::Refetch {
            source: FetchSource::Manual,
            reply: Some(reply),
        })?;
        rx.await
            .map_err(|_| ClientError::Stopped)?
            .map_err(ClientError::Fetch)
    }

    /// Send an event frame `2[name,payload]` over the open stream.
    pub async fn emit(&self, name: &str, payload: &Value) -> Result<(), ClientError> {
        if self.context.status() != ConnectionStatus::Connected {
            return Err(ClientError::NotConnected);
        }
        let text = encode_event(name, payload)?;
        self.transport.send(&text).await?;
        Ok(())
    }

    /// Send `params` to a command endpoint, then refetch on success.
    pub async fn dispatch(
        &self,
        endpoint: &str,
        params: Map<String, Value>,
    ) -> Result<(), ClientError> {
        self.dispatcher.dispatch(endpoint, params).await
    }

    /// The command dispatcher, for typed command helpers.
    pub fn dispatcher(&self) -> &CommandDispatcher<A> {
        &self.dispatcher
    }

    /// The last successfully fetched snapshot, if any.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.context.snapshot()
    }

    /// The last recorded failure.
    pub fn last_error(&self) -> Option<SyncFault> {
        self.context.last_error()
    }

    /// Status of the streaming path.
    pub fn status(&self) -> ConnectionStatus {
        self.context.status()
    }

    /// Status to display, counting a working polling fallback as connected.
    pub fn effective_status(&self) -> ConnectionStatus {
        self.context.effective_status()
    }

    /// Subscribe to snapshot and error changes.
    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.context.subscribe_state()
    }

    /// Subscribe to stream status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.context.subscribe_status()
    }

    /// The shared state handle.
    pub fn context(&self) -> &SyncContext {
        &self.context
    }

    /// The configuration the client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    fn post(&self, input: Input) -> Result<(), ClientError> {
        self.inputs.send(input).map_err(|_| ClientError::Stopped)
    }
}

impl<T: Transport, A: StateApi> Drop for SyncClient<T, A> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
