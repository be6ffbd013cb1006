//! Events emitted by the external chat client.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::message::{ActorId, InboundMessage};

/// Connection state of the external client as last reported to the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Not connected (initial state).
    #[default]
    Disconnected,
    /// Login in progress.
    Connecting,
    /// Gateway session is live.
    Connected,
    /// Session dropped; the client library is resuming it.
    Reconnecting,
    /// The client reported an unrecoverable error.
    Error,
}

impl ConnectionStatus {
    /// Returns the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event flowing from the client library into the runtime.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Login finished; carries the id of the logged-in account.
    Ready {
        /// The account the client is logged in as.
        self_id: ActorId,
    },
    /// A chat message was received.
    Message(InboundMessage),
    /// The gateway connection dropped.
    Disconnected {
        /// Reason reported by the client library, if any.
        reason: Option<String>,
    },
    /// The gateway session was resumed after a drop.
    Resumed,
    /// The client library hit an error it could not recover from.
    Error(String),
}

impl ClientEvent {
    /// Connection status implied by this event, if it is a lifecycle event.
    pub fn status(&self) -> Option<ConnectionStatus> {
        match self {
            Self::Ready { .. } | Self::Resumed => Some(ConnectionStatus::Connected),
            Self::Disconnected { .. } => Some(ConnectionStatus::Reconnecting),
            Self::Error(_) => Some(ConnectionStatus::Error),
            Self::Message(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_status() {
        let ready = ClientEvent::Ready {
            self_id: ActorId::from("me"),
        };
        assert_eq!(ready.status(), Some(ConnectionStatus::Connected));
        assert_eq!(
            ClientEvent::Disconnected { reason: None }.status(),
            Some(ConnectionStatus::Reconnecting)
        );
        let msg = ClientEvent::Message(InboundMessage::new("u", "c", "m", "hi"));
        assert_eq!(msg.status(), None);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(ConnectionStatus::Reconnecting.to_string(), "reconnecting");
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
    }
}
