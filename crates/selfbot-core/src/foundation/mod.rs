//! Foundation layer - identifiers, messages, events and errors.

pub mod error;
pub mod event;
pub mod message;

pub use error::{ClientError, ClientResult};
pub use event::{ClientEvent, ConnectionStatus};
pub use message::{ActorId, ChannelId, InboundMessage, MessageId, MessageRef};
