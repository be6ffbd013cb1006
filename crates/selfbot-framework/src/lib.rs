//! # Selfbot Framework
//!
//! Command dispatch components for the selfbot.
//!
//! This layer provides:
//! - The [`Command`] trait and closure-backed [`FnCommand`]
//! - [`CommandRegistry`] with longest-prefix trigger resolution
//! - [`RateLimiter`], a per-actor token bucket
//! - [`Dispatcher`], the receive / resolve / rate-check / execute / record pipeline
//! - [`StatsCollector`] for per-command metrics
//! - Built-in `.ping`, `.help` and `.stats` commands
//!
//! The framework knows nothing about configuration files or process
//! lifecycle; the runtime crate wires these pieces together.

pub mod command;
pub mod commands;
pub mod dispatcher;
pub mod error;
pub mod rate_limit;
pub mod registry;
pub mod settings;
pub mod stats;

pub use command::{
    BoxedCommand, Category, Command, CommandContext, CommandOptions, CommandOutput,
    ExecutionResult, FnCommand, RegisteredCommand,
};
pub use dispatcher::{DispatchOutcome, Dispatcher, RejectReason};
pub use error::{ErrorKind, PolicyError, RegistryError, RegistryResult};
pub use rate_limit::{Decision, RateLimitPolicy, RateLimiter};
pub use registry::{CommandRegistry, DEFAULT_PREFIX, RegistryStats, Resolved};
pub use settings::{AccessPolicy, DispatchSettings, ReplyMode};
pub use stats::{CommandMetrics, PerformanceSummary, StatsCollector, StatsSnapshot};

/// Prelude for writing commands.
pub mod prelude {
    pub use super::command::{
        Category, Command, CommandContext, CommandOptions, CommandOutput, FnCommand,
    };
    pub use async_trait::async_trait;
}
