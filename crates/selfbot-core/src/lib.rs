//! # Selfbot Core
//!
//! The foundation of the selfbot command framework.
//!
//! This crate owns the types every other layer agrees on and the single seam
//! to the outside world: the [`ChatClient`] trait. The chat protocol itself
//! (gateway, sessions, encryption) lives in an external client library; this
//! crate only describes what the dispatch core needs from it.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! - **Identifiers**: [`ActorId`], [`ChannelId`], [`MessageId`], [`MessageRef`]
//! - **Inbound messages**: [`InboundMessage`]
//! - **Client events**: [`ClientEvent`], [`ConnectionStatus`]
//! - **Errors**: [`ClientError`], [`ClientResult`]
//!
//! ### Integration Layer
//!
//! - **Chat client**: the [`ChatClient`] sink used to deliver responses
//! - **Event channels**: [`event_channel`] for feeding events into a runtime
//!
//! ```text
//! ┌───────────────┐  ClientEvent   ┌────────────┐  send / edit  ┌───────────────┐
//! │ external chat │──────────────▶│  runtime   │─────────────▶│  ChatClient   │
//! │    library    │   (mpsc)       │ dispatcher │               │    (sink)     │
//! └───────────────┘                └────────────┘               └───────────────┘
//! ```

pub mod foundation;
pub mod integration;

pub use foundation::{
    ActorId, ChannelId, ClientError, ClientEvent, ClientResult, ConnectionStatus, InboundMessage,
    MessageId, MessageRef,
};
pub use integration::{BoxedClient, ChatClient, EventReceiver, EventSender, event_channel};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::integration::{BoxedClient, ChatClient};
}
