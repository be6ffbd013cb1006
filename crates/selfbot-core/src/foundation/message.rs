//! Identifiers and the inbound message type.
//!
//! Chat platforms hand out opaque snowflake-style identifiers. They are kept
//! as strings here so that the core never has to care about the platform's
//! numeric width, and wrapped in newtypes so an actor id can never be passed
//! where a channel id is expected.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Creates a new identifier.
            pub fn new(id: impl AsRef<str>) -> Self {
                Self(Arc::from(id.as_ref()))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(Arc::from(id))
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self::new(id.to_string())
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

id_type! {
    /// The account that authored an inbound message.
    ActorId
}

id_type! {
    /// The channel (or DM) a message was posted in.
    ChannelId
}

id_type! {
    /// A platform message identifier.
    MessageId
}

/// Everything needed to address an existing message for an edit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageRef {
    /// Channel holding the message.
    pub channel: ChannelId,
    /// The message itself.
    pub message: MessageId,
}

impl MessageRef {
    /// Creates a new message reference.
    pub fn new(channel: impl Into<ChannelId>, message: impl Into<MessageId>) -> Self {
        Self {
            channel: channel.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel, self.message)
    }
}

/// A chat message delivered by the external client.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Author of the message.
    pub actor: ActorId,
    /// Channel the message was posted in.
    pub channel: ChannelId,
    /// Platform id of the message.
    pub id: MessageId,
    /// Raw message content.
    pub text: String,
    /// When the platform says the message was created.
    pub timestamp: SystemTime,
}

impl InboundMessage {
    /// Creates a message stamped with the current wall-clock time.
    pub fn new(
        actor: impl Into<ActorId>,
        channel: impl Into<ChannelId>,
        id: impl Into<MessageId>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            channel: channel.into(),
            id: id.into(),
            text: text.into(),
            timestamp: SystemTime::now(),
        }
    }

    /// Overrides the creation timestamp.
    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Reference to this message, suitable for [`ChatClient::edit`](crate::ChatClient::edit).
    pub fn reference(&self) -> MessageRef {
        MessageRef {
            channel: self.channel.clone(),
            message: self.id.clone(),
        }
    }
}
