//! # Selfbot
//!
//! Command dispatch for automating a personal chat account.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  ClientEvent  ┌──────────────┐      ┌────────────┐      ┌──────────┐
//! │ ChatClient │──────────────▶│  BotRuntime  │─────▶│ Dispatcher │─────▶│ Command  │
//! │            │◀──────────────│ (actor lanes)│      │ rate limit │      │ execute  │
//! └────────────┘  send / edit  └──────────────┘      │  + stats   │      └──────────┘
//!                                                    └────────────┘
//! ```
//!
//! - **Core**: identifiers, inbound messages, client events and the `ChatClient` trait
//! - **Framework**: commands, registry, rate limiter, stats and the dispatcher
//! - **Runtime**: configuration, logging and the event loop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use selfbot::prelude::*;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Command for Echo {
//!     fn name(&self) -> &str { "echo" }
//!     fn trigger(&self) -> &str { ".echo" }
//!     fn description(&self) -> &str { "Repeats its arguments" }
//!
//!     async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<CommandOutput> {
//!         Ok(CommandOutput::reply(ctx.args()))
//!     }
//! }
//!
//! let runtime = BotRuntime::builder()
//!     .config(load_config()?)
//!     .client(my_client)
//!     .builtin_commands()
//!     .command(Echo)
//!     .build()?;
//! runtime.run(events).await;
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub mod console;

pub use selfbot_core as core;
pub use selfbot_framework as framework;
pub use selfbot_runtime as runtime;

/// Prelude module for convenient imports.
pub mod prelude {
    // Runtime - main entry point
    pub use selfbot_runtime::config::{ConfigLoader, RuntimeConfig, load_config};
    pub use selfbot_runtime::{BotRuntime, RunSummary};

    // Commands
    pub use selfbot_framework::prelude::*;
    pub use selfbot_framework::{CommandRegistry, StatsCollector};

    // Client side
    pub use selfbot_core::{
        ActorId, ChannelId, ChatClient, ClientEvent, InboundMessage, MessageId, MessageRef,
        event_channel,
    };
}
