//! Configuration schema.
//!
//! Every section has serde defaults, so an empty file (or no file at all)
//! yields a runnable configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use selfbot_core::ActorId;
use selfbot_framework::{
    AccessPolicy, CommandOptions, DispatchSettings, PolicyError, RateLimitPolicy, ReplyMode,
};

use super::error::{ConfigError, ConfigResult};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Per-command overrides keyed by command name.
    #[serde(default)]
    pub commands: BTreeMap<String, CommandConfig>,

    #[serde(default)]
    pub client: ClientConfig,
}

// =============================================================================
// Logging
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to compact otherwise.
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Required when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Per-module levels, e.g. `selfbot_framework = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include file names and line numbers.
    #[serde(default)]
    pub file_location: bool,
}

// =============================================================================
// Dispatch
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Timeout applied to commands without their own override.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// Number of sequencing lanes.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Bounded queue length per lane.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default)]
    pub reply_mode: ReplyMode,

    #[serde(default = "default_true")]
    pub notify_rate_limited: bool,

    /// Only the logged-in account (plus `allowed_actors`) may trigger commands.
    #[serde(default = "default_true")]
    pub self_only: bool,

    #[serde(default)]
    pub allowed_actors: Vec<String>,

    #[serde(default)]
    pub blocked_actors: Vec<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: default_command_timeout_ms(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            reply_mode: ReplyMode::default(),
            notify_rate_limited: true,
            self_only: true,
            allowed_actors: Vec::new(),
            blocked_actors: Vec::new(),
        }
    }
}

impl DispatchConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy {
            self_only: self.self_only,
            allowed: self.allowed_actors.iter().map(ActorId::new).collect(),
            blocked: self.blocked_actors.iter().map(ActorId::new).collect(),
        }
    }

    pub fn to_settings(&self) -> DispatchSettings {
        DispatchSettings::new()
            .command_timeout(self.command_timeout())
            .reply_mode(self.reply_mode)
            .notify_rate_limited(self.notify_rate_limited)
            .access(self.access_policy())
    }
}

fn default_command_timeout_ms() -> u64 {
    30_000
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    256
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Rate limiting
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_invocations")]
    pub max_invocations: u32,

    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Per-actor state untouched for this long is evicted.
    #[serde(default = "default_idle_evict_ms")]
    pub idle_evict_ms: u64,

    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_invocations: default_max_invocations(),
            window_ms: default_window_ms(),
            idle_evict_ms: default_idle_evict_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn idle_evict(&self) -> Duration {
        Duration::from_millis(self.idle_evict_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn to_policy(&self) -> Result<RateLimitPolicy, PolicyError> {
        RateLimitPolicy::new(self.max_invocations, self.window())
    }
}

fn default_max_invocations() -> u32 {
    5
}

fn default_window_ms() -> u64 {
    10_000
}

fn default_idle_evict_ms() -> u64 {
    600_000
}

fn default_sweep_interval_ms() -> u64 {
    60_000
}

// =============================================================================
// Commands
// =============================================================================

/// Override for a single registered command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Per-actor cooldown; 0 turns off the command's built-in one.
    #[serde(default)]
    pub cooldown_ms: Option<u64>,

    /// Extra triggers, added to the ones given in code.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: None,
            cooldown_ms: None,
            aliases: Vec::new(),
        }
    }
}

impl CommandConfig {
    /// Layers this override on top of the options given at registration.
    pub fn apply(&self, options: CommandOptions) -> CommandOptions {
        let timeout = self
            .timeout_ms
            .map(Duration::from_millis)
            .or(options.timeout);
        let mut options = options
            .enabled(self.enabled)
            .aliases(self.aliases.iter().cloned());
        options.timeout = timeout;
        if let Some(ms) = self.cooldown_ms {
            options.cooldown = Some(Duration::from_millis(ms));
        }
        options
    }
}

// =============================================================================
// Client
// =============================================================================

/// A string that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([redacted])")
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Account token, usually supplied via `SELFBOT_CLIENT__TOKEN`.
    #[serde(default)]
    pub token: Option<Secret>,
}

impl ClientConfig {
    pub fn token(&self) -> ConfigResult<&Secret> {
        self.token
            .as_ref()
            .ok_or_else(|| ConfigError::missing_field("client.token"))
    }
}
