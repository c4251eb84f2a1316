//! CLI command implementations.

pub mod config;
pub mod control;
pub mod fetch;
pub mod send;
pub mod watch;

use anyhow::{Context, Result};
use sync_client::{ClientConfig, HttpApi, SyncClient, WebSocketTransport};

/// Client type every command talks through.
pub type Client = SyncClient<WebSocketTransport, HttpApi>;

/// Build a client for the controller described by `config`.
pub fn build_client(config: ClientConfig) -> Result<Client> {
    let api = HttpApi::new(&config.base_url()).context("Failed to create HTTP client")?;
    Ok(SyncClient::new(config, WebSocketTransport::new(), api))
}
