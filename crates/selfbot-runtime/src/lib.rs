//! Selfbot Runtime - configuration, logging and the event loop.
//!
//! This crate provides:
//! - Layered configuration (`ConfigLoader`, `RuntimeConfig`, `validate_config`)
//! - Logging setup on `tracing-subscriber` (`LoggingBuilder`)
//! - The runtime (`BotRuntime`), which feeds client events through per-actor
//!   lanes into the dispatcher and sweeps idle rate-limit state
//! - Offline token checks (`TokenValidator`)
//!
//! ```ignore
//! use selfbot_runtime::{BotRuntime, config::load_config, logging};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     logging::init_from_config(&config.logging);
//!
//!     let (client, events) = connect().await?;
//!     let runtime = BotRuntime::builder()
//!         .config(config)
//!         .client(client)
//!         .builtin_commands()
//!         .build()?;
//!
//!     runtime.run(events).await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod sequencer;
pub mod token;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, Profile, RuntimeConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{BotRuntime, BotRuntimeBuilder, RunSummary};
pub use sequencer::LaneSet;
pub use token::{TokenFormat, TokenReport, TokenValidator};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for command authors.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
