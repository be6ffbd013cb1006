//! Runtime error types.

use thiserror::Error;

use selfbot_framework::{PolicyError, RegistryError};

use crate::config::ConfigError;

/// Errors that stop the runtime from being built or started.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Command registration failed: {0}")]
    Registry(#[from] RegistryError),

    #[error("Invalid rate limit policy: {0}")]
    Policy(#[from] PolicyError),

    /// `[commands.<name>]` names a command that was never registered.
    #[error("Configuration overrides unknown command: {0}")]
    UnknownCommand(String),

    #[error("No chat client was provided")]
    MissingClient,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
