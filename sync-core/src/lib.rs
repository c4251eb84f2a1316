//! # sync-core
//!
//! Pure logic for poolsync (no I/O, instant tests).
//!
//! This crate implements the state machines and policies for mirroring the
//! controller without any network or timer I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (websocket, HTTP, timers) is performed by `sync-client`,
//! which interprets the actions produced by these state machines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod retry;
pub mod state;
pub mod sync;
pub mod toggle;

pub use retry::{RetrySchedule, DEFAULT_RECONNECT_DELAY, STALE_SOCKET_RECONNECT_DELAY};
pub use state::{Action, ConnectionMachine, ConnectionState, Event};
pub use sync::{should_poll, ErrorKind, FetchSource, SyncFault, SyncState};
pub use toggle::{last_known, toggle_target};
