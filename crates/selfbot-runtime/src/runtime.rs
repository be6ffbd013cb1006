//! The event loop that ties a chat client to the dispatcher.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use selfbot_runtime::{BotRuntime, config::load_config};
//!
//! let config = load_config()?;
//! let runtime = BotRuntime::builder()
//!     .config(config)
//!     .client(my_client)
//!     .builtin_commands()
//!     .build()?;
//!
//! // Runs until the event stream closes or Ctrl+C / SIGTERM arrives.
//! runtime.run(events).await;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use selfbot_core::{BoxedClient, ChatClient, ClientEvent, EventReceiver};
use selfbot_framework::{
    BoxedCommand, Command, CommandOptions, CommandRegistry, Dispatcher, RateLimiter,
    StatsCollector, commands,
};

use crate::config::{RuntimeConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::sequencer::LaneSet;

/// Counters reported when [`BotRuntime::run`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Client events received, of every kind.
    pub events: u64,
    /// Messages that went through the dispatcher.
    pub dispatched: u64,
}

/// A fully assembled bot: registry, rate limiter, stats and dispatcher.
#[derive(Debug)]
pub struct BotRuntime {
    config: RuntimeConfig,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
}

impl BotRuntime {
    pub fn builder() -> BotRuntimeBuilder {
        BotRuntimeBuilder::new()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        self.dispatcher.registry()
    }

    pub fn stats(&self) -> &StatsCollector {
        self.dispatcher.stats()
    }

    /// A token that stops [`run`](Self::run) and [`run_until`](Self::run_until) when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Requests shutdown; queued messages are still dispatched.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Runs until the event stream closes, Ctrl+C or SIGTERM arrives, or the
    /// shutdown token is cancelled.
    pub async fn run(&self, events: EventReceiver) -> RunSummary {
        info!("Selfbot runtime is now running. Press Ctrl+C to stop.");
        self.run_until(events, wait_for_signal()).await
    }

    /// Runs until the event stream closes, `shutdown` resolves, or the
    /// shutdown token is cancelled.
    pub async fn run_until<F>(&self, mut events: EventReceiver, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        let dispatch = &self.config.dispatch;
        let rate_limit = &self.config.rate_limit;

        let lanes = LaneSet::spawn(
            self.dispatcher.clone(),
            dispatch.workers,
            dispatch.queue_capacity,
        );
        let sweeper_token = self.shutdown.child_token();
        let sweeper = spawn_sweeper(
            self.dispatcher.limiter().clone(),
            rate_limit.idle_evict(),
            rate_limit.sweep_interval(),
            sweeper_token.clone(),
        );

        let mut summary = RunSummary::default();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => {
                        summary.events += 1;
                        self.handle_event(event, &lanes).await;
                    }
                    None => {
                        info!("Event stream closed");
                        break;
                    }
                },
            }
        }

        sweeper_token.cancel();
        if let Err(e) = sweeper.await {
            warn!(error = %e, "Rate limit sweeper ended abnormally");
        }

        debug!(lanes = lanes.len(), "Draining dispatch lanes");
        summary.dispatched = lanes.shutdown().await;

        info!(
            events = summary.events,
            dispatched = summary.dispatched,
            "Selfbot runtime stopped"
        );
        summary
    }

    async fn handle_event(&self, event: ClientEvent, lanes: &LaneSet) {
        if let Some(status) = event.status() {
            self.stats().set_status(status);
        }

        match event {
            ClientEvent::Message(message) => {
                lanes.submit(message).await;
            }
            ClientEvent::Ready { self_id } => {
                info!(self_id = %self_id, "Client ready");
            }
            ClientEvent::Resumed => info!("Client session resumed"),
            ClientEvent::Disconnected { reason } => {
                warn!(
                    reason = reason.as_deref().unwrap_or("unknown"),
                    "Client disconnected"
                );
            }
            ClientEvent::Error(e) => error!(error = %e, "Client error"),
        }
    }
}

/// Periodically evicts rate-limit state for idle actors.
fn spawn_sweeper(
    limiter: Arc<RateLimiter>,
    idle: Duration,
    every: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let evicted = limiter.sweep(idle);
                    if evicted > 0 {
                        debug!(
                            evicted,
                            tracked = limiter.tracked_actors(),
                            "Evicted idle rate limit state"
                        );
                    }
                }
            }
        }
    })
}

/// Waits for Ctrl+C or, on Unix, SIGTERM.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Assembles a [`BotRuntime`].
#[derive(Default)]
pub struct BotRuntimeBuilder {
    config: RuntimeConfig,
    client: Option<BoxedClient>,
    commands: Vec<(BoxedCommand, CommandOptions)>,
}

impl BotRuntimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn client<C: ChatClient + 'static>(self, client: C) -> Self {
        self.boxed_client(Arc::new(client))
    }

    pub fn boxed_client(mut self, client: BoxedClient) -> Self {
        self.client = Some(client);
        self
    }

    pub fn command<C: Command>(self, command: C) -> Self {
        self.command_with(command, CommandOptions::default())
    }

    /// Adds a command with code-level options; `[commands.<name>]` is layered on top.
    pub fn command_with<C: Command>(mut self, command: C, options: CommandOptions) -> Self {
        self.commands.push((Arc::new(command), options));
        self
    }

    /// Adds `ping`, `help` and `stats`.
    pub fn builtin_commands(mut self) -> Self {
        self.commands.extend(
            commands::builtin()
                .into_iter()
                .map(|command| (command, CommandOptions::default())),
        );
        self
    }

    /// Validates the configuration and builds every component.
    pub fn build(self) -> RuntimeResult<BotRuntime> {
        let Self {
            config,
            client,
            commands,
        } = self;

        validate_config(&config)?;
        let client = client.ok_or(RuntimeError::MissingClient)?;

        if let Some(unknown) = config
            .commands
            .keys()
            .find(|name| !commands.iter().any(|(c, _)| c.name() == name.as_str()))
        {
            return Err(RuntimeError::UnknownCommand(unknown.clone()));
        }

        let mut registry = CommandRegistry::new();
        for (command, options) in commands {
            let options = match config.commands.get(command.name()) {
                Some(overrides) => overrides.apply(options),
                None => options,
            };
            registry.register_boxed(command, options)?;
        }

        let limiter = RateLimiter::new(config.rate_limit.to_policy()?);
        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            Arc::new(limiter),
            StatsCollector::new(),
            client,
            config.dispatch.to_settings(),
        );

        let registered = dispatcher.registry().stats();
        info!(
            commands = registered.total,
            enabled = registered.enabled,
            workers = config.dispatch.workers,
            max_invocations = config.rate_limit.max_invocations,
            window_ms = config.rate_limit.window_ms,
            reply_mode = ?config.dispatch.reply_mode,
            "Runtime initialized from configuration"
        );

        Ok(BotRuntime {
            config,
            dispatcher,
            shutdown: CancellationToken::new(),
        })
    }
}
