//! Error types for the frame codec.

use thiserror::Error;

/// Errors that can occur while decoding or encoding a [`Frame`](crate::Frame).
#[derive(Debug, Error)]
pub enum FrameError {
    /// The transport delivered an empty text message.
    #[error("empty frame")]
    Empty,

    /// The text after the type tag is not a valid payload for that tag.
    #[error("invalid payload for frame type '{tag}': {source}")]
    InvalidPayload {
        /// The type tag that was recognised.
        tag: char,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Untagged text that is not JSON either.
    #[error("unrecognised frame: {0}")]
    Unrecognised(#[source] serde_json::Error),

    /// JSON serialization failed while encoding.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),
}
