//! Full-state refetch and snapshot publication.
//!
//! Every path that wants fresh state (an event frame, a polling tick, the
//! consistency refresh, a successful command, an explicit caller request)
//! goes through [`StateSynchronizer::request`]. The fetch runs in its own
//! task and its result comes back to the coordinator as an input, where
//! [`StateSynchronizer::apply`] publishes it. Overlapping fetches are
//! allowed; whichever result is applied last wins.

use std::sync::Arc;

use sync_core::{FetchSource, SyncFault};
use sync_types::{Frame, Snapshot};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;

use crate::api::StateApi;
use crate::context::SyncContext;
use crate::coordinator::Input;

/// Reply channel for a caller waiting on a refetch.
pub(crate) type FetchReply = oneshot::Sender<Result<Arc<Snapshot>, SyncFault>>;

/// Issues fetches and applies their results to the shared context.
pub(crate) struct StateSynchronizer<A: StateApi> {
    api: Arc<A>,
    context: SyncContext,
    inputs: UnboundedSender<Input>,
}

impl<A: StateApi> StateSynchronizer<A> {
    pub(crate) fn new(api: Arc<A>, context: SyncContext, inputs: UnboundedSender<Input>) -> Self {
        Self {
            api,
            context,
            inputs,
        }
    }

    /// Start a full-state fetch. The result arrives as `FetchCompleted`.
    pub(crate) fn request(&self, source: FetchSource, reply: Option<FetchReply>) {
        let api = Arc::clone(&self.api);
        let inputs = self.inputs.clone();

        tracing::debug!(%source, "refetch requested");
        tokio::spawn(async move {
            let result = fetch(api.as_ref()).await;
            let _ = inputs.send(Input::FetchCompleted {
                source,
                result,
                reply,
            });
        });
    }

    /// Publish a fetch result.
    ///
    /// Success replaces the snapshot and clears the error; failure records
    /// the error and keeps the previous snapshot.
    pub(crate) fn apply(
        &self,
        source: FetchSource,
        result: Result<Snapshot, SyncFault>,
    ) -> Result<Arc<Snapshot>, SyncFault> {
        let outcome = self.context.apply_fetch(source, result);
        match &outcome {
            Ok(snapshot) if !snapshot.is_complete() => {
                tracing::debug!(%source, "snapshot applied (partial document)");
            }
            Ok(snapshot) => {
                tracing::debug!(%source, fetched_at = ?snapshot.fetched_at(), "snapshot applied")
            }
            Err(fault) => tracing::warn!(%source, "fetch failed: {}", fault),
        }
        outcome
    }

    /// React to an event frame: any event, whatever its name, means refetch.
    pub(crate) fn on_event(&self, frame: &Frame) {
        if let Frame::Event { name, .. } = frame {
            tracing::debug!(event = %name, "event received");
            self.request(FetchSource::Event, None);
        }
    }
}

async fn fetch<A: StateApi>(api: &A) -> Result<Snapshot, SyncFault> {
    api.fetch_state()
        .await
        .map(Snapshot::new)
        .map_err(SyncFault::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, MockApi};
    use serde_json::json;
    use sync_core::ErrorKind;
    use tokio::sync::mpsc;

    fn synchronizer(api: &MockApi) -> (StateSynchronizer<MockApi>, mpsc::UnboundedReceiver<Input>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sync = StateSynchronizer::new(Arc::new(api.clone()), SyncContext::new(), tx);
        (sync, rx)
    }

    async fn completed(
        rx: &mut mpsc::UnboundedReceiver<Input>,
    ) -> (FetchSource, Result<Snapshot, SyncFault>) {
        match rx.recv().await {
            Some(Input::FetchCompleted { source, result, .. }) => (source, result),
            _ => panic!("expected FetchCompleted"),
        }
    }

    #[tokio::test]
    async fn request_fetches_and_reports_back() {
        let api = MockApi::with_document(json!({"marker": 1}));
        let (sync, mut rx) = synchronizer(&api);

        sync.request(FetchSource::Refresh, None);
        let (source, result) = completed(&mut rx).await;

        assert_eq!(source, FetchSource::Refresh);
        assert_eq!(result.unwrap().document(), &json!({"marker": 1}));
        assert_eq!(api.fetch_count(), 1);
    }

    #[tokio::test]
    async fn fetch_errors_are_classified() {
        let api = MockApi::new();
        api.queue_fetch(Err(ApiError::Status { status: 500 }));
        api.queue_fetch(Err(ApiError::Decode("eof".into())));
        let (sync, mut rx) = synchronizer(&api);

        sync.request(FetchSource::Poll, None);
        let (_, first) = completed(&mut rx).await;
        sync.request(FetchSource::Poll, None);
        let (_, second) = completed(&mut rx).await;

        assert_eq!(first.unwrap_err().kind, ErrorKind::Network);
        assert_eq!(second.unwrap_err().kind, ErrorKind::Decode);
    }

    #[tokio::test]
    async fn failed_apply_keeps_previous_snapshot() {
        let api = MockApi::new();
        let (sync, _rx) = synchronizer(&api);

        sync.apply(FetchSource::Manual, Ok(Snapshot::new(json!({"marker": 1}))))
            .unwrap();
        let result = sync.apply(FetchSource::Refresh, Err(SyncFault::network("status 500")));

        assert!(result.is_err());
        assert_eq!(
            sync.context.snapshot().unwrap().document(),
            &json!({"marker": 1})
        );
        assert_eq!(sync.context.last_error().unwrap().kind, ErrorKind::Network);
    }

    #[tokio::test]
    async fn any_event_requests_exactly_one_fetch() {
        let api = MockApi::new();
        let (sync, mut rx) = synchronizer(&api);

        sync.on_event(&Frame::event("circuit", json!({"id": 5, "isOn": true})));
        let (source, _) = completed(&mut rx).await;

        assert_eq!(source, FetchSource::Event);
        assert_eq!(api.fetch_count(), 1);
    }

    #[tokio::test]
    async fn non_event_frames_are_ignored() {
        let api = MockApi::new();
        let (sync, mut rx) = synchronizer(&api);

        sync.on_event(&Frame::Raw(json!({"x": 1})));
        tokio::task::yield_now().await;

        assert!(rx.try_recv().is_err());
        assert_eq!(api.fetch_count(), 0);
    }
}
