//! `selfbot` command line.
//!
//! ```bash
//! selfbot run --profile production
//! selfbot validate-token            # checks client.token from the configuration
//! selfbot check-config --config ./selfbot.toml
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::{error, info};

use selfbot::console::{self, ConsoleClient};
use selfbot_core::event_channel;
use selfbot_runtime::config::{ConfigLoader, RuntimeConfig, validate_config};
use selfbot_runtime::{BotRuntime, TokenValidator, logging};

const STDIN_GRACE: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(
    name = "selfbot",
    version,
    about = "Command dispatch for a personal chat account"
)]
struct Cli {
    /// Configuration file; searched for in the working and user config directories when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Configuration profile (defaults to SELFBOT_PROFILE, then development).
    #[arg(short, long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Run the bot against the terminal: each input line is a message")]
    Run,
    #[command(about = "Check the format of an account token")]
    ValidateToken {
        /// Token to check; falls back to client.token from the configuration.
        token: Option<String>,
    },
    #[command(about = "Load and validate the configuration")]
    CheckConfig,
}

impl Cli {
    fn load_config(&self) -> Result<RuntimeConfig> {
        let mut loader = ConfigLoader::new();
        if let Some(profile) = &self.profile {
            loader = loader.profile(profile);
        }
        if let Some(path) = &self.config {
            loader = loader.file(path);
        }

        let config = loader.load().context("failed to load configuration")?;
        validate_config(&config).context("invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run => {
            let config = cli.load_config()?;
            let runtime = tokio::runtime::Runtime::new().context("failed to start tokio")?;
            let code = runtime.block_on(run(config));
            // A pending stdin read holds a blocking thread until the next line arrives.
            runtime.shutdown_timeout(STDIN_GRACE);
            code
        }
        Commands::ValidateToken { token } => validate_token(&cli, token.as_deref()),
        Commands::CheckConfig => check_config(&cli),
    }
}

async fn run(config: RuntimeConfig) -> Result<ExitCode> {
    logging::init_from_config(&config.logging);

    let runtime = BotRuntime::builder()
        .config(config)
        .client(ConsoleClient::new(tokio::io::stdout()))
        .builtin_commands()
        .build()
        .context("failed to build runtime")?;

    let (events, receiver) = event_channel(runtime.config().dispatch.queue_capacity);
    let input = tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        if let Err(e) = console::forward_lines(stdin, events).await {
            error!(error = %e, "Failed to read console input");
        }
    });

    let summary = runtime.run(receiver).await;
    input.abort();

    info!(
        events = summary.events,
        dispatched = summary.dispatched,
        "Goodbye"
    );
    Ok(ExitCode::SUCCESS)
}

fn validate_token(cli: &Cli, token: Option<&str>) -> Result<ExitCode> {
    let report = match token {
        Some(token) => TokenValidator::validate(token),
        None => {
            let config = cli.load_config()?;
            TokenValidator::validate(config.client.token()?.expose())
        }
    };

    println!("{report}");
    Ok(if report.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn check_config(cli: &Cli) -> Result<ExitCode> {
    let config = cli.load_config()?;

    println!("✅ Configuration is valid");
    println!("  log level:      {}", config.logging.level);
    println!(
        "  rate limit:     {} per {}ms",
        config.rate_limit.max_invocations, config.rate_limit.window_ms
    );
    println!(
        "  dispatch:       {} workers, timeout {}ms, reply mode {:?}",
        config.dispatch.workers, config.dispatch.command_timeout_ms, config.dispatch.reply_mode
    );
    println!("  overrides:      {}", config.commands.len());
    match &config.client.token {
        Some(token) => println!("  client.token:   {}", TokenValidator::mask(token.expose())),
        None => println!("  client.token:   (not set)"),
    }
    Ok(ExitCode::SUCCESS)
}
