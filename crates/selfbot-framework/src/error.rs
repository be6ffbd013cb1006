//! Error types for the selfbot framework.

use serde::Serialize;
use thiserror::Error;

/// Errors raised while registering commands.
///
/// Registration happens once at startup, so every variant is fatal to the
/// runtime that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The trigger (or an alias) is already bound to a command.
    #[error("trigger '{trigger}' is already registered by command '{existing}'")]
    DuplicateTrigger {
        /// The conflicting trigger.
        trigger: String,
        /// Name of the command that already owns it.
        existing: String,
    },

    /// Another command already uses this name.
    #[error("a command named '{0}' is already registered")]
    DuplicateName(String),

    /// The command definition itself is malformed.
    #[error("invalid command '{name}': {reason}")]
    InvalidCommand {
        /// Name of the offending command (may be empty).
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl RegistryError {
    /// Creates an [`InvalidCommand`](Self::InvalidCommand) error.
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCommand {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors raised while building a rate-limit policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// The policy parameters cannot produce a working limiter.
    #[error("invalid rate limit policy: {0}")]
    InvalidPolicy(String),
}

/// Classification of a failed command execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The command returned an error or panicked.
    CommandFailure,
    /// The command did not finish within its timeout.
    Timeout,
}

impl ErrorKind {
    /// Returns the kind as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommandFailure => "command_failure",
            Self::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
