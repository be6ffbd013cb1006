//! Integration layer - the seam to the external chat client.
//!
//! This module contains:
//! - The `ChatClient` trait the dispatch core delivers responses through
//! - Event channels the client library feeds inbound events into

pub mod client;

pub use client::{BoxedClient, ChatClient, EventReceiver, EventSender, event_channel};
