//! Command dispatcher.
//!
//! The [`Dispatcher`] takes an inbound chat message through a fixed sequence
//! of stages:
//!
//! ```text
//! Received ──▶ Resolved ──▶ RateChecked ──▶ Executing ──▶ Completed
//!     │            │             │
//!     └────────────┴─────────────┴──────▶ Rejected
//! ```
//!
//! 1. **Received**: the access policy is applied and empty messages dropped
//! 2. **Resolved**: the registry maps the text to a command; non-commands and
//!    disabled commands end here silently
//! 3. **RateChecked**: the actor's token bucket is consulted; a denial sends a
//!    cooldown notice
//! 4. **Executing**: the command runs under its timeout with panics contained
//! 5. **Completed**: stats are recorded and the response delivered
//!
//! Nothing that happens inside a command escapes [`Dispatcher::dispatch`].
//!
//! # Tower Service Integration
//!
//! `Dispatcher` implements `tower::Service<InboundMessage>`, so middleware can
//! be stacked on top of it:
//!
//! ```rust,ignore
//! use tower::{ServiceBuilder, ServiceExt};
//!
//! let service = ServiceBuilder::new()
//!     .concurrency_limit(16)
//!     .service(dispatcher.clone());
//!
//! let outcome = service.oneshot(message).await?;
//! ```

use std::any::Any;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;
use tower::Service;
use tracing::{Instrument, Level, debug, info, span, trace, warn};

use crate::command::{CommandContext, ExecutionResult};
use crate::error::ErrorKind;
use crate::rate_limit::{Decision, RateLimiter};
use crate::registry::CommandRegistry;
use crate::settings::{DispatchSettings, ReplyMode};
use crate::stats::StatsCollector;
use selfbot_core::{BoxedClient, InboundMessage};

/// Notice delivered when a command fails.
pub const FAILURE_NOTICE: &str = "❌ An unexpected error occurred. Please try again.";

/// Notice delivered when a command exceeds its timeout.
pub const TIMEOUT_NOTICE: &str = "⏱️ Command timed out. Please try again.";

/// Notice delivered when the rate limiter denies a dispatch.
pub fn cooldown_notice(retry_after: Duration) -> String {
    format!(
        "⏳ Command on cooldown. Try again in {:.1}s",
        retry_after.as_secs_f64()
    )
}

/// Why a message did not run a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The author is not permitted to use commands.
    AccessDenied,
    /// The message has no text.
    Empty,
    /// No trigger matched.
    NoMatch,
    /// The matched command is disabled.
    Disabled,
    /// The actor exhausted their rate limit.
    RateLimited {
        retry_after: Duration,
    },
    /// The actor ran this command too recently.
    Cooldown {
        retry_after: Duration,
    },
}

/// Final state of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Stopped before execution.
    Rejected(RejectReason),
    /// The command ran (successfully or not).
    Completed {
        /// Name of the executed command.
        command: String,
        result: ExecutionResult,
    },
}

impl DispatchOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// The execution result, if the command ran.
    pub fn result(&self) -> Option<&ExecutionResult> {
        match self {
            Self::Completed { result, .. } => Some(result),
            Self::Rejected(_) => None,
        }
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Self::Rejected(reason) => Some(*reason),
            Self::Completed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Received,
    Resolved,
    RateChecked,
    Executing,
    Completed,
    Rejected,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Resolved => "resolved",
            Self::RateChecked => "rate_checked",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }
}

struct DispatcherInner {
    registry: Arc<CommandRegistry>,
    limiter: Arc<RateLimiter>,
    stats: StatsCollector,
    client: BoxedClient,
    settings: DispatchSettings,
}

/// The command dispatcher.
///
/// Cheap to clone; all clones share the same registry, limiter and stats.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    /// Creates a dispatcher over fully built components.
    pub fn new(
        registry: Arc<CommandRegistry>,
        limiter: Arc<RateLimiter>,
        stats: StatsCollector,
        client: BoxedClient,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                registry,
                limiter,
                stats,
                client,
                settings,
            }),
        }
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.inner.registry
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.inner.limiter
    }

    pub fn stats(&self) -> &StatsCollector {
        &self.inner.stats
    }

    pub fn client(&self) -> &BoxedClient {
        &self.inner.client
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.inner.settings
    }

    /// Dispatches one inbound message to completion.
    pub async fn dispatch(&self, message: InboundMessage) -> DispatchOutcome {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            actor = %message.actor,
            channel = %message.channel,
            message_id = %message.id
        );
        self.dispatch_inner(message).instrument(span).await
    }

    async fn dispatch_inner(&self, message: InboundMessage) -> DispatchOutcome {
        let inner = &self.inner;
        inner.stats.record_message();
        trace!(stage = Stage::Received.as_str());

        let self_id = inner.client.self_id();
        if !inner.settings.access.permits(&message.actor, self_id.as_ref()) {
            return reject(RejectReason::AccessDenied);
        }
        if message.text.trim().is_empty() {
            return reject(RejectReason::Empty);
        }

        let Some(resolved) = inner.registry.resolve(&message.text) else {
            return reject(RejectReason::NoMatch);
        };
        let name = resolved.command.name().to_string();
        trace!(stage = Stage::Resolved.as_str(), command = %name, trigger = %resolved.trigger);

        if !resolved.command.is_enabled() {
            debug!(command = %name, "Command is disabled, ignoring");
            return reject(RejectReason::Disabled);
        }

        if let Decision::Deny { retry_after } = inner.limiter.check(&message.actor) {
            self.refuse(&message, &name, "rate_limited", retry_after).await;
            return reject(RejectReason::RateLimited { retry_after });
        }
        if let Some(cooldown) = resolved.command.cooldown() {
            let decision = inner
                .limiter
                .check_cooldown(&name, &message.actor, cooldown);
            if let Decision::Deny { retry_after } = decision {
                self.refuse(&message, &name, "command_cooldown", retry_after).await;
                return reject(RejectReason::Cooldown { retry_after });
            }
        }
        trace!(stage = Stage::RateChecked.as_str());

        let timeout = resolved
            .command
            .timeout()
            .unwrap_or(inner.settings.command_timeout);
        let ctx = CommandContext::new(
            message.clone(),
            resolved.trigger,
            resolved.args,
            Arc::clone(&inner.client),
            Arc::clone(&inner.registry),
            inner.stats.clone(),
        );

        trace!(stage = Stage::Executing.as_str(), timeout_ms = timeout.as_millis() as u64);
        let result = execute(&resolved.command, ctx, timeout).await;

        inner.stats.record(&name, &result);
        log_result(&name, &message, &result);

        let reply = match (&result.response, result.error_kind) {
            (Some(response), None) => Some(response.as_str()),
            (_, Some(ErrorKind::Timeout)) => Some(TIMEOUT_NOTICE),
            (_, Some(ErrorKind::CommandFailure)) => Some(FAILURE_NOTICE),
            (None, None) => None,
        };
        if let Some(text) = reply {
            self.deliver(&message, text).await;
        }

        trace!(stage = Stage::Completed.as_str());
        DispatchOutcome::Completed {
            command: name,
            result,
        }
    }

    /// Counts and logs a throttled dispatch, then sends the cooldown notice.
    async fn refuse(
        &self,
        message: &InboundMessage,
        command: &str,
        event: &'static str,
        retry_after: Duration,
    ) {
        let inner = &self.inner;
        inner.stats.record_rate_limited();
        info!(
            event,
            command,
            actor = %message.actor,
            channel = %message.channel,
            retry_after_ms = retry_after.as_millis() as u64,
            "Command throttled"
        );
        if inner.settings.notify_rate_limited {
            self.deliver(message, &cooldown_notice(retry_after)).await;
        }
    }

    /// Sends `text` back according to the reply mode. Failures are logged only.
    async fn deliver(&self, message: &InboundMessage, text: &str) {
        let client = &self.inner.client;
        let delivered = match self.inner.settings.reply_mode {
            ReplyMode::Edit => client.edit(&message.reference(), text).await,
            ReplyMode::Send => client.send(&message.channel, text).await.map(|_| ()),
        };
        if let Err(error) = delivered {
            warn!(
                error = %error,
                channel = %message.channel,
                "Failed to deliver command response"
            );
        }
    }
}

fn reject(reason: RejectReason) -> DispatchOutcome {
    trace!(stage = Stage::Rejected.as_str(), reason = ?reason);
    DispatchOutcome::Rejected(reason)
}

async fn execute(
    command: &crate::command::RegisteredCommand,
    ctx: CommandContext,
    timeout: Duration,
) -> ExecutionResult {
    let body = Arc::clone(command.command());
    let run = async move { body.execute(&ctx).await };

    let started = Instant::now();
    let outcome = tokio::time::timeout(timeout, AssertUnwindSafe(run).catch_unwind()).await;
    let elapsed = started.elapsed();

    match outcome {
        Ok(Ok(Ok(output))) => ExecutionResult::success(output.response, elapsed),
        Ok(Ok(Err(error))) => {
            ExecutionResult::failure(ErrorKind::CommandFailure, format!("{error:#}"), elapsed)
        }
        Ok(Err(panic)) => ExecutionResult::failure(
            ErrorKind::CommandFailure,
            format!("command panicked: {}", panic_message(panic.as_ref())),
            elapsed,
        ),
        Err(_) => ExecutionResult::failure(
            ErrorKind::Timeout,
            format!("timed out after {}ms", timeout.as_millis()),
            elapsed,
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

fn log_result(command: &str, message: &InboundMessage, result: &ExecutionResult) {
    let elapsed_ms = result.elapsed.as_secs_f64() * 1000.0;
    match result.error_kind {
        None => info!(
            event = "command_executed",
            command,
            actor = %message.actor,
            channel = %message.channel,
            elapsed_ms,
            "Command executed"
        ),
        Some(ErrorKind::Timeout) => warn!(
            event = "command_timeout",
            command,
            actor = %message.actor,
            channel = %message.channel,
            elapsed_ms,
            "Command timed out"
        ),
        Some(ErrorKind::CommandFailure) => warn!(
            event = "command_failed",
            command,
            actor = %message.actor,
            channel = %message.channel,
            elapsed_ms,
            error = result.error_message.as_deref().unwrap_or_default(),
            "Command failed"
        ),
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("commands", &self.inner.registry.len())
            .field("settings", &self.inner.settings)
            .finish()
    }
}

impl Service<InboundMessage> for Dispatcher {
    type Response = DispatchOutcome;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, message: InboundMessage) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { Ok(dispatcher.dispatch(message).await) })
    }
}
