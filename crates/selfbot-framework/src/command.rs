//! Commands and their execution context.
//!
//! A [`Command`] is a self-contained unit of behavior: a unique name, a
//! trigger the message must start with, a description for help output, and an
//! async body. Commands are registered once into a
//! [`CommandRegistry`](crate::CommandRegistry) together with
//! [`CommandOptions`] and are immutable afterwards.
//!
//! # Example
//!
//! ```rust,ignore
//! use selfbot_framework::prelude::*;
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
//! // Or, for quick one-offs:
//! let shout = FnCommand::new("shout", ".shout", "Repeats loudly", |ctx: CommandContext| async move {
//!     Ok(CommandOutput::reply(ctx.args().to_uppercase()))
//! });
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ErrorKind;
use crate::registry::CommandRegistry;
use crate::stats::StatsCollector;
use selfbot_core::{ActorId, BoxedClient, ChannelId, InboundMessage};

// ============================================================================
// Category
// ============================================================================

/// Grouping used by the help listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Category {
    Utility,
    Fun,
    Information,
    Moderation,
    Other,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 5] = [
        Category::Utility,
        Category::Fun,
        Category::Information,
        Category::Moderation,
        Category::Other,
    ];

    /// Guesses a category from a well-known command name.
    pub fn from_command_name(name: &str) -> Self {
        match name {
            "ping" | "help" | "status" | "info" | "stats" | "uptime" => Self::Utility,
            "hurt" | "owo" | "meow" | "hentai" | "joke" | "meme" | "ascii" => Self::Fun,
            "user" | "server" | "channel" | "role" | "avatar" | "whois" => Self::Information,
            "ban" | "kick" | "mute" | "warn" | "clear" | "purge" => Self::Moderation,
            _ => Self::Other,
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Utility => "Utility",
            Self::Fun => "Fun",
            Self::Information => "Information",
            Self::Moderation => "Moderation",
            Self::Other => "Other",
        }
    }

    /// Emoji shown next to the label.
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Utility => "🔧",
            Self::Fun => "🎉",
            Self::Information => "ℹ️",
            Self::Moderation => "🛡️",
            Self::Other => "📦",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Output & result
// ============================================================================

/// What a command wants sent back to the chat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Response text, or `None` to stay silent.
    pub response: Option<String>,
}

impl CommandOutput {
    /// Output that replies with `text`.
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            response: Some(text.into()),
        }
    }

    /// Output that sends nothing.
    pub fn silent() -> Self {
        Self::default()
    }
}

impl From<String> for CommandOutput {
    fn from(text: String) -> Self {
        Self::reply(text)
    }
}

impl From<&str> for CommandOutput {
    fn from(text: &str) -> Self {
        Self::reply(text)
    }
}

/// Outcome of one command execution, as seen by stats and logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    pub response: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub elapsed: Duration,
}

impl ExecutionResult {
    /// A successful execution.
    pub fn success(response: Option<String>, elapsed: Duration) -> Self {
        Self {
            success: true,
            response,
            error_kind: None,
            error_message: None,
            elapsed,
        }
    }

    /// A failed execution.
    pub fn failure(kind: ErrorKind, message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            response: None,
            error_kind: Some(kind),
            error_message: Some(message.into()),
            elapsed,
        }
    }

    /// Whether the failure was a timeout.
    pub fn is_timeout(&self) -> bool {
        self.error_kind == Some(ErrorKind::Timeout)
    }
}

// ============================================================================
// Command trait
// ============================================================================

/// A chat command.
#[async_trait]
pub trait Command: Send + Sync + 'static {
    /// Unique name, used for configuration and metrics.
    fn name(&self) -> &str;

    /// The text a message must start with to invoke this command.
    fn trigger(&self) -> &str;

    /// One-line description for help output.
    fn description(&self) -> &str;

    /// Usage line for detailed help. Defaults to the bare trigger.
    fn usage(&self) -> Option<&str> {
        None
    }

    /// Help category.
    fn category(&self) -> Category {
        Category::from_command_name(self.name())
    }

    /// Minimum time between two runs by the same actor.
    fn cooldown(&self) -> Option<Duration> {
        None
    }

    /// Runs the command.
    ///
    /// Errors and panics are contained by the dispatcher and reported as a
    /// `command_failure`.
    async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<CommandOutput>;
}

/// Type alias for a shared, type-erased command.
pub type BoxedCommand = Arc<dyn Command>;

/// A [`Command`] backed by an async closure.
pub struct FnCommand<F> {
    name: String,
    trigger: String,
    description: String,
    category: Option<Category>,
    func: F,
}

impl<F, Fut> FnCommand<F>
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<CommandOutput>> + Send + 'static,
{
    /// Creates a closure command.
    pub fn new(
        name: impl Into<String>,
        trigger: impl Into<String>,
        description: impl Into<String>,
        func: F,
    ) -> Self {
        Self {
            name: name.into(),
            trigger: trigger.into(),
            description: description.into(),
            category: None,
            func,
        }
    }

    /// Overrides the category derived from the name.
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }
}

#[async_trait]
impl<F, Fut> Command for FnCommand<F>
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<CommandOutput>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn trigger(&self) -> &str {
        &self.trigger
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn category(&self) -> Category {
        self.category
            .unwrap_or_else(|| Category::from_command_name(&self.name))
    }

    async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<CommandOutput> {
        (self.func)(ctx.clone()).await
    }
}

// ============================================================================
// Options & registration record
// ============================================================================

/// Per-command settings applied at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOptions {
    /// Disabled commands resolve but never execute.
    pub enabled: bool,
    /// Additional triggers.
    pub aliases: Vec<String>,
    /// Overrides the dispatcher's global timeout.
    pub timeout: Option<Duration>,
    /// Overrides [`Command::cooldown`]; zero turns the cooldown off.
    pub cooldown: Option<Duration>,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            aliases: Vec::new(),
            timeout: None,
            cooldown: None,
        }
    }
}

impl CommandOptions {
    /// Creates default options (enabled, no aliases, global timeout).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = Some(cooldown);
        self
    }
}

/// A command as stored by the registry.
#[derive(Clone)]
pub struct RegisteredCommand {
    command: BoxedCommand,
    options: CommandOptions,
}

impl RegisteredCommand {
    pub(crate) fn new(command: BoxedCommand, options: CommandOptions) -> Self {
        Self { command, options }
    }

    pub fn name(&self) -> &str {
        self.command.name()
    }

    pub fn trigger(&self) -> &str {
        self.command.trigger()
    }

    pub fn description(&self) -> &str {
        self.command.description()
    }

    pub fn category(&self) -> Category {
        self.command.category()
    }

    /// Usage line, falling back to the trigger.
    pub fn usage(&self) -> &str {
        self.command
            .usage()
            .unwrap_or_else(|| self.command.trigger())
    }

    pub fn is_enabled(&self) -> bool {
        self.options.enabled
    }

    pub fn aliases(&self) -> &[String] {
        &self.options.aliases
    }

    /// Per-command timeout override, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.options.timeout
    }

    /// Effective per-actor cooldown: the option, else the command's own.
    pub fn cooldown(&self) -> Option<Duration> {
        self.options
            .cooldown
            .or_else(|| self.command.cooldown())
            .filter(|cooldown| !cooldown.is_zero())
    }

    pub fn options(&self) -> &CommandOptions {
        &self.options
    }

    pub fn command(&self) -> &BoxedCommand {
        &self.command
    }

    /// The primary trigger followed by every alias.
    pub fn triggers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.trigger()).chain(self.options.aliases.iter().map(String::as_str))
    }
}

impl fmt::Debug for RegisteredCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredCommand")
            .field("name", &self.name())
            .field("trigger", &self.trigger())
            .field("options", &self.options)
            .finish()
    }
}

// ============================================================================
// CommandContext
// ============================================================================

/// Everything a command body can see while it runs.
///
/// Cloning is cheap: the client, registry and stats are shared handles.
#[derive(Clone)]
pub struct CommandContext {
    message: InboundMessage,
    trigger: String,
    args: String,
    client: BoxedClient,
    registry: Arc<CommandRegistry>,
    stats: StatsCollector,
}

impl CommandContext {
    pub fn new(
        message: InboundMessage,
        trigger: impl Into<String>,
        args: impl Into<String>,
        client: BoxedClient,
        registry: Arc<CommandRegistry>,
        stats: StatsCollector,
    ) -> Self {
        Self {
            message,
            trigger: trigger.into(),
            args: args.into(),
            client,
            registry,
            stats,
        }
    }

    /// The message that invoked the command.
    pub fn message(&self) -> &InboundMessage {
        &self.message
    }

    pub fn actor(&self) -> &ActorId {
        &self.message.actor
    }

    pub fn channel(&self) -> &ChannelId {
        &self.message.channel
    }

    /// The trigger (or alias) that matched.
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// Text after the trigger, trimmed.
    pub fn args(&self) -> &str {
        &self.args
    }

    /// Arguments split on whitespace.
    pub fn arg_list(&self) -> Vec<&str> {
        self.args.split_whitespace().collect()
    }

    pub fn client(&self) -> &BoxedClient {
        &self.client
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &StatsCollector {
        &self.stats
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("actor", &self.message.actor)
            .field("channel", &self.message.channel)
            .field("trigger", &self.trigger)
            .field("args", &self.args)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_name() {
        assert_eq!(Category::from_command_name("ping"), Category::Utility);
        assert_eq!(Category::from_command_name("meme"), Category::Fun);
        assert_eq!(Category::from_command_name("whois"), Category::Information);
        assert_eq!(Category::from_command_name("purge"), Category::Moderation);
        assert_eq!(Category::from_command_name("echo"), Category::Other);
    }

    #[test]
    fn test_options_builder() {
        let options = CommandOptions::new()
            .enabled(false)
            .alias(".p")
            .aliases([".pp", ".ppp"])
            .timeout(Duration::from_secs(2));

        assert!(!options.enabled);
        assert_eq!(options.aliases, vec![".p", ".pp", ".ppp"]);
        assert_eq!(options.timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_registered_command_triggers() {
        let command = FnCommand::new("echo", ".echo", "Echo", |ctx: CommandContext| async move {
            Ok(CommandOutput::reply(ctx.args()))
        });
        let registered =
            RegisteredCommand::new(Arc::new(command), CommandOptions::new().alias(".e"));

        let triggers: Vec<_> = registered.triggers().collect();
        assert_eq!(triggers, vec![".echo", ".e"]);
        assert_eq!(registered.usage(), ".echo");
        assert_eq!(registered.category(), Category::Other);
    }

    #[test]
    fn test_effective_cooldown() {
        let ping = || Arc::new(crate::commands::PingCommand) as BoxedCommand;

        let defaults = RegisteredCommand::new(ping(), CommandOptions::new());
        assert_eq!(defaults.cooldown(), Some(Duration::from_secs(1)));

        let longer = CommandOptions::new().cooldown(Duration::from_secs(5));
        let overridden = RegisteredCommand::new(ping(), longer);
        assert_eq!(overridden.cooldown(), Some(Duration::from_secs(5)));

        let off = RegisteredCommand::new(ping(), CommandOptions::new().cooldown(Duration::ZERO));
        assert_eq!(off.cooldown(), None);
    }

    #[test]
    fn test_execution_result_constructors() {
        let ok = ExecutionResult::success(Some("pong".into()), Duration::from_millis(3));
        assert!(ok.success);
        assert!(ok.error_kind.is_none());

        let failed = ExecutionResult::failure(ErrorKind::Timeout, "too slow", Duration::ZERO);
        assert!(!failed.success);
        assert!(failed.is_timeout());
    }
}
