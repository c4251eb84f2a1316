//! Liveness probing on an open stream.
//!
//! While the stream is connected a probe goes out every heartbeat interval.
//! A failed probe is logged and otherwise ignored; the transport's own close
//! path reports a dead socket.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::transport::Transport;

/// Spawn the heartbeat task.
///
/// The first probe goes out one interval after the call. Returns a handle
/// that can be used to abort the task.
pub fn spawn_heartbeat<T: Transport>(transport: Arc<T>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::debug!("heartbeat started (interval: {}ms)", every.as_millis());

        let mut timer = interval_at(Instant::now() + every, every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;

            match transport.ping().await {
                Ok(()) => tracing::trace!("heartbeat probe sent"),
                Err(e) => tracing::warn!("heartbeat probe failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    async fn connected_transport() -> Arc<MockTransport> {
        let transport = Arc::new(MockTransport::new());
        transport.connect("ws://pool:4200/").await.unwrap();
        transport
    }

    #[tokio::test(start_paused = true)]
    async fn probes_every_interval() {
        let transport = connected_transport().await;
        let handle = spawn_heartbeat(Arc::clone(&transport), Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(transport.ping_count(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(transport.ping_count(), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.ping_count(), 2);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_probe_keeps_running() {
        let transport = connected_transport().await;
        transport.fail_next_ping("broken pipe");
        let handle = spawn_heartbeat(Arc::clone(&transport), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(transport.ping_count(), 1);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_heartbeat_stops_probing() {
        let transport = connected_transport().await;
        let handle = spawn_heartbeat(Arc::clone(&transport), Duration::from_secs(1));
        handle.abort();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(transport.ping_count(), 0);
    }
}
