//! Timer slots for the client's background work.
//!
//! Each repeating or one-shot timer lives in a [`TimerSlot`]. Starting a
//! slot cancels whatever it held before, so there is never more than one
//! live timer per slot. Timers never touch state directly; they post an
//! input to the coordinator's queue.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Holder for at most one background task.
///
/// Dropping the slot aborts the task.
#[derive(Debug)]
pub struct TimerSlot {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl TimerSlot {
    /// Create an empty slot.
    pub fn new(name: &'static str) -> Self {
        Self { name, handle: None }
    }

    /// Install a task, cancelling the previous one.
    pub fn start(&mut self, handle: JoinHandle<()>) {
        self.stop();
        tracing::trace!(timer = self.name, "timer started");
        self.handle = Some(handle);
    }

    /// Cancel the task, if any. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::trace!(timer = self.name, "timer stopped");
        }
    }

    /// Whether the slot holds a task that has not finished.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Post `input` once after `delay`.
pub fn spawn_after<I>(delay: Duration, inputs: UnboundedSender<I>, input: I) -> JoinHandle<()>
where
    I: Send + 'static,
{
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = inputs.send(input);
    })
}

/// Post `make()` every `every`, the first time after `first`.
///
/// Stops on its own once the receiving side is gone. A slow consumer
/// delays later ticks rather than bunching them up.
pub fn spawn_ticker<I, F>(
    first: Duration,
    every: Duration,
    inputs: UnboundedSender<I>,
    make: F,
) -> JoinHandle<()>
where
    I: Send + 'static,
    F: Fn() -> I + Send + 'static,
{
    tokio::spawn(async move {
        let mut timer = interval_at(Instant::now() + first, every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            if inputs.send(make()).is_err() {
                break;
            }
        }
    })
}
