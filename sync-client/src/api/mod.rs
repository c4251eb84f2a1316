//! Request/response path to the controller.
//!
//! [`StateApi`] covers the two calls the client makes outside the stream:
//! the full-state fetch and the command `PUT`. [`HttpApi`] talks to a real
//! controller, [`MockApi`] scripts responses for tests.

mod http;
mod mock;

pub use http::HttpApi;
pub use mock::MockApi;

use async_trait::async_trait;
use serde_json::Value;
use sync_core::SyncFault;
use sync_types::Command;
use thiserror::Error;

/// Request/response errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request could not be sent or the response not read.
    #[error("request failed: {0}")]
    Request(String),

    /// The controller answered with something other than 200.
    #[error("unexpected status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The response body was not valid JSON.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<&ApiError> for SyncFault {
    fn from(error: &ApiError) -> Self {
        match error {
            ApiError::Request(_) | ApiError::Status { .. } => SyncFault::network(error.to_string()),
            ApiError::Decode(_) => SyncFault::decode(error.to_string()),
        }
    }
}

impl From<ApiError> for SyncFault {
    fn from(error: ApiError) -> Self {
        Self::from(&error)
    }
}

/// Full-state fetch and command submission.
#[async_trait]
pub trait StateApi: Send + Sync + 'static {
    /// Fetch the controller's full state document.
    async fn fetch_state(&self) -> Result<Value, ApiError>;

    /// Submit a command. Only a 200 response counts as success.
    async fn send_command(&self, command: &Command) -> Result<(), ApiError>;
}
