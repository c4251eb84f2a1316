//! # sync-client
//!
//! Real-time synchronization client for a pool controller mirror.
//!
//! The client keeps a local, read-only copy of the controller's full state
//! and keeps it converging to server truth over an unreliable network.
//!
//! ## Features
//!
//! - **Streaming path**: websocket text frames; any event triggers a refetch
//! - **Reconnection**: fixed delay chosen by close reason, retried until disconnect
//! - **Polling fallback**: full-state fetch while the stream is not connected
//! - **Consistency refresh**: unconditional periodic full-state fetch
//! - **Commands**: HTTP `PUT` to controller endpoints, then a refetch
//! - **Transport abstraction**: pluggable stream and HTTP layers (real, mock)
//!
//! ## Example
//!
//! ```ignore
//! use sync_client::{ClientConfig, HttpApi, SyncClient, WebSocketTransport};
//!
//! let config = ClientConfig::new("192.168.1.20", 4200, false);
//! let api = HttpApi::new(&config.base_url())?;
//! let client = SyncClient::new(config, WebSocketTransport::new(), api);
//!
//! client.connect().await;
//! let mut state = client.subscribe_state();
//! state.changed().await?;
//! println!("{:?}", client.snapshot());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod client;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod heartbeat;
pub mod scheduler;
pub mod transport;

mod connection;
mod coordinator;
mod synchronizer;

pub use api::{ApiError, HttpApi, MockApi, StateApi};
pub use client::{ClientError, SyncClient};
pub use config::{ClientConfig, ConfigError, ServerConfig, Timing};
pub use context::SyncContext;
pub use dispatcher::CommandDispatcher;
pub use transport::{MockTransport, Transport, TransportError, WebSocketTransport};
