//! Mock controller API for testing.
//!
//! Allows queuing fetch and command results and capturing submitted
//! commands for verification.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use sync_types::Command;

use super::{ApiError, StateApi};

/// Mock controller API for testing.
///
/// Clones share state. When no fetch result is queued, `fetch_state()`
/// answers with the default document.
#[derive(Debug, Clone, Default)]
pub struct MockApi {
    inner: Arc<Mutex<MockApiInner>>,
}

#[derive(Debug, Default)]
struct MockApiInner {
    document: Value,
    fetch_queue: VecDeque<Result<Value, ApiError>>,
    fetch_count: usize,
    fetch_delay: Option<Duration>,
    command_queue: VecDeque<Result<(), ApiError>>,
    commands: Vec<Command>,
}

impl MockApi {
    /// Create a mock answering every fetch with an empty controller document.
    pub fn new() -> Self {
        Self::with_document(json!({
            "circuits": [],
            "features": [],
            "pumps": [],
            "temps": {}
        }))
    }

    /// Create a mock answering every fetch with `document`.
    pub fn with_document(document: Value) -> Self {
        let api = Self::default();
        api.set_document(document);
        api
    }

    /// Replace the default fetch document.
    pub fn set_document(&self, document: Value) {
        let mut inner = self.inner.lock().unwrap();
        inner.document = document;
    }

    /// Queue a one-shot fetch result.
    pub fn queue_fetch(&self, result: Result<Value, ApiError>) {
        let mut inner = self.inner.lock().unwrap();
        inner.fetch_queue.push_back(result);
    }

    /// Delay fetches issued from now on by `delay`.
    ///
    /// A fetch takes its result when it is issued and returns it after the
    /// delay, so fetches with different delays can land out of order.
    pub fn set_fetch_delay(&self, delay: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.fetch_delay = Some(delay);
    }

    /// Queue a one-shot command result.
    pub fn queue_command_result(&self, result: Result<(), ApiError>) {
        let mut inner = self.inner.lock().unwrap();
        inner.command_queue.push_back(result);
    }

    /// Number of fetches issued.
    pub fn fetch_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.fetch_count
    }

    /// All commands submitted, in order.
    pub fn commands(&self) -> Vec<Command> {
        let inner = self.inner.lock().unwrap();
        inner.commands.clone()
    }

    /// The most recently submitted command.
    pub fn last_command(&self) -> Option<Command> {
        let inner = self.inner.lock().unwrap();
        inner.commands.last().cloned()
    }
}

#[async_trait]
impl StateApi for MockApi {
    async fn fetch_state(&self) -> Result<Value, ApiError> {
        let (result, delay) = {
            let mut inner = self.inner.lock().unwrap();
            inner.fetch_count += 1;
            let result = match inner.fetch_queue.pop_front() {
                Some(result) => result,
                None => Ok(inner.document.clone()),
            };
            (result, inner.fetch_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn send_command(&self, command: &Command) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.commands.push(command.clone());
        inner.command_queue.pop_front().unwrap_or(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answers_with_default_document() {
        let api = MockApi::with_document(json!({"marker": 1}));
        assert_eq!(api.fetch_state().await.unwrap(), json!({"marker": 1}));
        assert_eq!(api.fetch_state().await.unwrap(), json!({"marker": 1}));
        assert_eq!(api.fetch_count(), 2);
    }

    #[tokio::test]
    async fn queued_results_come_first() {
        let api = MockApi::with_document(json!({"marker": 1}));
        api.queue_fetch(Err(ApiError::Status { status: 500 }));

        assert_eq!(
            api.fetch_state().await,
            Err(ApiError::Status { status: 500 })
        );
        assert_eq!(api.fetch_state().await.unwrap(), json!({"marker": 1}));
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_fetch_keeps_result_taken_at_issue() {
        let api = MockApi::with_document(json!({"marker": 1}));
        api.set_fetch_delay(Duration::from_secs(1));

        let pending = api.fetch_state();
        tokio::pin!(pending);
        assert!(futures_util::poll!(&mut pending).is_pending());
        api.set_document(json!({"marker": 2}));

        assert_eq!(pending.await.unwrap(), json!({"marker": 1}));
    }

    #[tokio::test]
    async fn records_commands() {
        let api = MockApi::new();
        api.queue_command_result(Err(ApiError::Status { status: 400 }));

        let first = api.send_command(&Command::circuit_state(6, true)).await;
        let second = api.send_command(&Command::pump_speed(1, 2000)).await;

        assert!(first.is_err());
        assert!(second.is_ok());
        assert_eq!(api.commands().len(), 2);
        assert_eq!(api.last_command(), Some(Command::pump_speed(1, 2000)));
    }
}
