//! Chat client trait and event channels.
//!
//! The dispatch core never talks to the chat platform directly. The external
//! client library implements [`ChatClient`] for outbound traffic and pushes
//! [`ClientEvent`]s into the channel returned by [`event_channel`].
//!
//! # Example
//!
//! ```rust,ignore
//! use selfbot_core::{event_channel, ClientEvent};
//!
//! let (tx, rx) = event_channel(256);
//! tx.send(ClientEvent::Message(message)).await?;
//! runtime.run(rx).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::foundation::error::ClientResult;
use crate::foundation::event::ClientEvent;
use crate::foundation::message::{ActorId, ChannelId, MessageId, MessageRef};

/// Sending half of an event channel, held by the client library.
pub type EventSender = mpsc::Sender<ClientEvent>;

/// Receiving half of an event channel, consumed by the runtime.
pub type EventReceiver = mpsc::Receiver<ClientEvent>;

/// Creates a bounded channel for client events.
pub fn event_channel(buffer_size: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(buffer_size.max(1))
}

/// The outbound half of an external chat client.
///
/// Implementations wrap a real client library session. All methods must be
/// safe to call concurrently from several dispatch lanes.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Id of the logged-in account, once the session is ready.
    fn self_id(&self) -> Option<ActorId>;

    /// Most recent gateway heartbeat latency, if one has been measured.
    fn latency(&self) -> Option<Duration>;

    /// Posts a new message to a channel and returns its id.
    async fn send(&self, channel: &ChannelId, text: &str) -> ClientResult<MessageId>;

    /// Replaces the content of an existing message.
    async fn edit(&self, message: &MessageRef, text: &str) -> ClientResult<()>;
}

/// Type alias for a shared, type-erased client.
pub type BoxedClient = Arc<dyn ChatClient>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::message::InboundMessage;

    #[tokio::test]
    async fn test_event_channel_delivers_in_order() {
        let (tx, mut rx) = event_channel(4);
        for i in 0..3 {
            let msg = InboundMessage::new("u1", "c1", i.to_string(), format!(".n {i}"));
            tx.send(ClientEvent::Message(msg)).await.unwrap();
        }
        drop(tx);

        let mut seen = Vec::new();
        while let Some(ClientEvent::Message(msg)) = rx.recv().await {
            seen.push(msg.id.to_string());
        }
        assert_eq!(seen, vec!["0", "1", "2"]);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let (tx, _rx) = event_channel(0);
        assert_eq!(tx.max_capacity(), 1);
    }
}
