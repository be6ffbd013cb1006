use std::time::Duration;

use async_trait::async_trait;

use crate::command::{Category, Command, CommandContext, CommandOutput};
use crate::stats::StatsSnapshot;

/// Reports runtime statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsCommand;

/// Formats an uptime as `1d 2h 3m 4s`, omitting leading zero units.
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let (days, hours, minutes, seconds) = (
        total / 86_400,
        total % 86_400 / 3_600,
        total % 3_600 / 60,
        total % 60,
    );

    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

impl StatsCommand {
    pub fn format_snapshot(snapshot: &StatsSnapshot) -> String {
        let summary = snapshot.summary();
        let most_used = match &summary.most_used_command {
            Some(name) => {
                let count = snapshot
                    .command(name)
                    .map(|m| m.total_executions)
                    .unwrap_or_default();
                format!("`{name}` ({count})")
            }
            None => "n/a".to_string(),
        };

        [
            "📈 **Bot Statistics**".to_string(),
            String::new(),
            format!("⏱️ **Uptime**: {}", format_uptime(snapshot.uptime)),
            format!("🔌 **Connection**: {}", snapshot.status),
            format!("💬 **Messages processed**: {}", snapshot.messages_processed),
            format!("⚡ **Commands executed**: {}", snapshot.commands_executed),
            format!("⏳ **Rate limited**: {}", snapshot.rate_limited),
            format!("✅ **Success rate**: {:.1}%", summary.success_rate),
            format!("🏆 **Most used**: {most_used}"),
            format!(
                "📶 **Mean latency**: {:.1}ms",
                summary.mean_latency.as_secs_f64() * 1000.0
            ),
        ]
        .join("\n")
    }
}

#[async_trait]
impl Command for StatsCommand {
    fn name(&self) -> &str {
        "stats"
    }

    fn trigger(&self) -> &str {
        ".stats"
    }

    fn description(&self) -> &str {
        "Shows uptime, command counts and performance figures"
    }

    fn category(&self) -> Category {
        Category::Utility
    }

    async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<CommandOutput> {
        Ok(CommandOutput::reply(Self::format_snapshot(
            &ctx.stats().snapshot(),
        )))
    }
}
