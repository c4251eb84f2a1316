//! Text frame protocol carried over the streaming transport.
//!
//! Every frame starts with a single ASCII digit type tag:
//!
//! | Tag | Meaning                                                        |
//! |-----|----------------------------------------------------------------|
//! | `0` | Handshake, remainder is a JSON object                          |
//! | `2` | Event `[name, payload]` or bare JSON object; empty means ping  |
//! | `3` | Pong                                                           |
//!
//! Anything else is tried as bare JSON and surfaced as [`Frame::Raw`].
//! The codec knows nothing about controller payloads.

use serde_json::{Map, Value};

use crate::FrameError;

/// Event name used when an event frame carries a bare JSON object.
pub const GENERIC_EVENT: &str = "data";

const HANDSHAKE_TAG: char = '0';
const PING_TAG: char = '2';
const PONG_TAG: char = '3';

/// Liveness frame direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heartbeat {
    /// `2` with no payload.
    Ping,
    /// `3`.
    Pong,
}

/// One parsed unit of the streaming text protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Protocol parameters sent by the server when the stream opens.
    Handshake(Value),
    /// Ping or pong.
    Heartbeat(Heartbeat),
    /// A named event with its payload.
    Event {
        /// Event name (`data` for untagged object payloads).
        name: String,
        /// Event payload, never interpreted by the codec.
        payload: Value,
    },
    /// Untagged JSON.
    Raw(Value),
}

impl Frame {
    /// Build an event frame.
    pub fn event(name: impl Into<String>, payload: Value) -> Self {
        Self::Event {
            name: name.into(),
            payload,
        }
    }

    /// Classify raw transport text into a frame.
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let tag = text.chars().next().ok_or(FrameError::Empty)?;
        // Tags are ASCII, so the remainder starts at byte 1.
        match tag {
            HANDSHAKE_TAG => decode_handshake(&text[1..]),
            PING_TAG => decode_event(&text[1..]),
            PONG_TAG => Ok(Self::Heartbeat(Heartbeat::Pong)),
            _ => serde_json::from_str(text)
                .map(Self::Raw)
                .map_err(FrameError::Unrecognised),
        }
    }

    /// Serialize the frame back to wire text.
    pub fn encode(&self) -> Result<String, FrameError> {
        match self {
            Self::Handshake(Value::Null) => Ok(HANDSHAKE_TAG.to_string()),
            Self::Handshake(payload) => Ok(format!("{HANDSHAKE_TAG}{}", to_json(payload)?)),
            Self::Heartbeat(Heartbeat::Ping) => Ok(PING_TAG.to_string()),
            Self::Heartbeat(Heartbeat::Pong) => Ok(PONG_TAG.to_string()),
            Self::Event { name, payload } => encode_event(name, payload),
            Self::Raw(payload) => to_json(payload),
        }
    }

    /// The frame the client answers with, if any.
    ///
    /// A handshake and a server ping are answered with a pong; a pong is
    /// answered with a ping. Events and raw frames need no reply.
    pub fn reply(&self) -> Option<Frame> {
        match self {
            Self::Handshake(_) | Self::Heartbeat(Heartbeat::Ping) => {
                Some(Self::Heartbeat(Heartbeat::Pong))
            }
            Self::Heartbeat(Heartbeat::Pong) => Some(Self::Heartbeat(Heartbeat::Ping)),
            Self::Event { .. } | Self::Raw(_) => None,
        }
    }

    /// Check if this is an event frame.
    pub fn is_event(&self) -> bool {
        matches!(self, Self::Event { .. })
    }
}

/// Encode an outbound event as `2[name,payload]`.
pub fn encode_event(name: &str, payload: &Value) -> Result<String, FrameError> {
    let body = serde_json::to_string(&(name, payload)).map_err(FrameError::Serialization)?;
    Ok(format!("{PING_TAG}{body}"))
}

fn decode_handshake(rest: &str) -> Result<Frame, FrameError> {
    if rest.is_empty() {
        return Ok(Frame::Handshake(Value::Null));
    }
    serde_json::from_str(rest)
        .map(Frame::Handshake)
        .map_err(|source| FrameError::InvalidPayload {
            tag: HANDSHAKE_TAG,
            source,
        })
}

fn decode_event(rest: &str) -> Result<Frame, FrameError> {
    if rest.is_empty() {
        return Ok(Frame::Heartbeat(Heartbeat::Ping));
    }
    if let Ok((name, payload)) = serde_json::from_str::<(String, Value)>(rest) {
        return Ok(Frame::Event { name, payload });
    }
    serde_json::from_str::<Map<String, Value>>(rest)
        .map(|object| Frame::event(GENERIC_EVENT, Value::Object(object)))
        .map_err(|source| FrameError::InvalidPayload {
            tag: PING_TAG,
            source,
        })
}

fn to_json(value: &Value) -> Result<String, FrameError> {
    serde_json::to_string(value).map_err(FrameError::Serialization)
}
