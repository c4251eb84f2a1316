//! Stream connectivity vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Websocket close code for a normal closure.
pub const CLOSE_NORMAL: u16 = 1000;
/// Websocket close code for an endpoint going away.
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// Connectivity of the streaming path.
///
/// Transitions only through Disconnected → Connecting → Connected → Disconnected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No stream, and none being opened.
    #[default]
    Disconnected,
    /// Transport open in progress.
    Connecting,
    /// Transport open and receiving frames.
    Connected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(label)
    }
}

/// Why the streaming transport closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Normal closure (1000).
    Normal,
    /// Endpoint going away (1001). This is also the code a caller-issued
    /// disconnect closes with.
    GoingAway,
    /// The socket was no longer connected (stale socket).
    NotConnected,
    /// Any other close code sent by the peer.
    Code(u16),
    /// Transport, protocol or decoding fault.
    Error(String),
}

impl CloseReason {
    /// Map a websocket close code to a reason.
    pub fn from_code(code: u16) -> Self {
        match code {
            CLOSE_NORMAL => Self::Normal,
            CLOSE_GOING_AWAY => Self::GoingAway,
            other => Self::Code(other),
        }
    }

    /// Whether the close was a deliberate shutdown that must not be retried.
    pub fn is_intentional(&self) -> bool {
        matches!(self, Self::Normal | Self::GoingAway)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal closure"),
            Self::GoingAway => write!(f, "going away"),
            Self::NotConnected => write!(f, "socket not connected"),
            Self::Code(code) => write!(f, "closed with code {code}"),
            Self::Error(reason) => write!(f, "transport error: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disconnected() {
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn close_codes_map_to_reasons() {
        assert_eq!(CloseReason::from_code(1000), CloseReason::Normal);
        assert_eq!(CloseReason::from_code(1001), CloseReason::GoingAway);
        assert_eq!(CloseReason::from_code(1011), CloseReason::Code(1011));
    }

    #[test]
    fn only_normal_and_going_away_are_intentional() {
        assert!(CloseReason::Normal.is_intentional());
        assert!(CloseReason::GoingAway.is_intentional());
        assert!(!CloseReason::NotConnected.is_intentional());
        assert!(!CloseReason::Code(1006).is_intentional());
        assert!(!CloseReason::Error("reset".into()).is_intentional());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ConnectionStatus::Connecting).unwrap();
        assert_eq!(json, "\"connecting\"");
    }
}
