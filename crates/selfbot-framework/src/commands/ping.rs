use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;

use crate::command::{Category, Command, CommandContext, CommandOutput};

/// Connection quality derived from gateway latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl LatencyQuality {
    pub fn from_latency(latency: Duration) -> Self {
        match latency.as_millis() {
            0..50 => Self::Excellent,
            50..100 => Self::Good,
            100..200 => Self::Fair,
            _ => Self::Poor,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Excellent => "🟢",
            Self::Good => "🟡",
            Self::Fair => "🟠",
            Self::Poor => "🔴",
        }
    }
}

/// Replies with `pong` and the gateway latency.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingCommand;

impl PingCommand {
    /// Formats the reply for a measured latency.
    pub fn format_response(latency: Duration) -> String {
        let quality = LatencyQuality::from_latency(latency);
        let millis = latency.as_secs_f64() * 1000.0;
        let latency = if millis < 10.0 {
            format!("{millis:.1}ms")
        } else {
            format!("{}ms", millis as u64)
        };

        let suffix = match quality {
            LatencyQuality::Excellent => " (excellent)",
            LatencyQuality::Poor => " (slow connection)",
            LatencyQuality::Good | LatencyQuality::Fair => "",
        };
        format!("{} pong {latency}{suffix}", quality.emoji())
    }
}

#[async_trait]
impl Command for PingCommand {
    fn name(&self) -> &str {
        "ping"
    }

    fn trigger(&self) -> &str {
        ".ping"
    }

    fn description(&self) -> &str {
        "Responds with pong and gateway latency information"
    }

    fn category(&self) -> Category {
        Category::Utility
    }

    fn cooldown(&self) -> Option<Duration> {
        Some(Duration::from_secs(1))
    }

    async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<CommandOutput> {
        let latency = ctx
            .client()
            .latency()
            .context("gateway latency is not available yet")?;
        Ok(CommandOutput::reply(Self::format_response(latency)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::context;
    use crate::registry::CommandRegistry;
    use crate::stats::StatsCollector;

    #[test]
    fn test_quality_thresholds() {
        let q = |ms| LatencyQuality::from_latency(Duration::from_millis(ms));
        assert_eq!(q(0), LatencyQuality::Excellent);
        assert_eq!(q(49), LatencyQuality::Excellent);
        assert_eq!(q(50), LatencyQuality::Good);
        assert_eq!(q(99), LatencyQuality::Good);
        assert_eq!(q(100), LatencyQuality::Fair);
        assert_eq!(q(199), LatencyQuality::Fair);
        assert_eq!(q(200), LatencyQuality::Poor);
    }

    #[test]
    fn test_format_response() {
        assert_eq!(
            PingCommand::format_response(Duration::from_micros(4_500)),
            "🟢 pong 4.5ms (excellent)"
        );
        assert_eq!(
            PingCommand::format_response(Duration::from_millis(42)),
            "🟢 pong 42ms (excellent)"
        );
        assert_eq!(
            PingCommand::format_response(Duration::from_millis(75)),
            "🟡 pong 75ms"
        );
        assert_eq!(
            PingCommand::format_response(Duration::from_millis(150)),
            "🟠 pong 150ms"
        );
        assert_eq!(
            PingCommand::format_response(Duration::from_millis(320)),
            "🔴 pong 320ms (slow connection)"
        );
    }

    #[tokio::test]
    async fn test_execute_uses_client_latency() {
        let ctx = context(
            CommandRegistry::new(),
            StatsCollector::new(),
            Some(Duration::from_millis(120)),
            ".ping",
            "",
        );
        let output = PingCommand.execute(&ctx).await.unwrap();
        assert_eq!(output.response.as_deref(), Some("🟠 pong 120ms"));
    }

    #[tokio::test]
    async fn test_execute_without_latency_fails() {
        let ctx = context(
            CommandRegistry::new(),
            StatsCollector::new(),
            None,
            ".ping",
            "",
        );
        assert!(PingCommand.execute(&ctx).await.is_err());
    }
}
