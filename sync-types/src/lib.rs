//! # sync-types
//!
//! Wire and data types for the poolsync controller mirror.
//!
//! This crate provides the foundational types used across all poolsync crates:
//! - [`Frame`] - One parsed unit of the streaming text protocol, plus its codec
//! - [`Snapshot`] - The opaque full-state document last fetched from the controller
//! - [`ConnectionStatus`], [`CloseReason`] - Stream connectivity vocabulary
//! - [`Command`] - An outbound (endpoint, parameters) pair
//! - [`FrameError`] - Codec errors

#![warn(missing_docs)]
#![warn(clippy::all)]

mod command;
mod error;
mod frame;
mod snapshot;
mod status;

pub use command::{endpoints, Command};
pub use error::FrameError;
pub use frame::{encode_event, Frame, Heartbeat, GENERIC_EVENT};
pub use snapshot::{Snapshot, EXPECTED_COLLECTIONS};
pub use status::{CloseReason, ConnectionStatus, CLOSE_GOING_AWAY, CLOSE_NORMAL};
