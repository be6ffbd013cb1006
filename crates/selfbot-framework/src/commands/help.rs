use std::time::Duration;

use async_trait::async_trait;

use crate::command::{Category, Command, CommandContext, CommandOutput, RegisteredCommand};
use crate::registry::CommandRegistry;

const MAX_DESCRIPTION: usize = 60;

/// Lists commands, or shows details for one of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct HelpCommand;

impl HelpCommand {
    /// The grouped command listing.
    pub fn general_help(registry: &CommandRegistry) -> String {
        if registry.is_empty() {
            return "❌ No commands available".to_string();
        }

        let stats = registry.stats();
        let mut lines = vec![
            "📚 **Discord Self-Bot Commands**".to_string(),
            String::new(),
            format!(
                "📊 **Statistics**: {}/{} commands enabled",
                stats.enabled, stats.total
            ),
            String::new(),
        ];

        for category in Category::ALL {
            let mut members = registry.list().filter(|c| c.category() == category).peekable();
            if members.peek().is_none() {
                continue;
            }

            lines.push(format!("**{} {}**", category.emoji(), category.label()));
            for command in members {
                lines.push(format!(
                    "  {} `{}` - {}",
                    status_emoji(command),
                    command.trigger(),
                    truncate(description(command))
                ));
            }
            lines.push(String::new());
        }

        lines.push("💡 **Usage**: Type any command to execute it".to_string());
        lines.push("📖 **Detailed Help**: `.help <command>` for specific command info".to_string());
        lines.push("⚠️ **Note**: Self-bot for educational purposes only".to_string());
        lines.join("\n")
    }

    /// Detailed help for the command identified by `identifier`.
    pub fn command_help(registry: &CommandRegistry, identifier: &str) -> String {
        let Some(command) = registry.find(identifier) else {
            return format!(
                "❌ **Command not found**: `{identifier}`\n\n💡 Use `.help` to see all available commands"
            );
        };

        let mut lines = vec![
            format!("📖 **Help for `{}`**", command.trigger()),
            String::new(),
            format!("**Name**: {}", command.name()),
            format!("**Description**: {}", description(command)),
            format!("**Usage**: `{}`", command.usage()),
            String::new(),
            "**Configuration**:".to_string(),
            format!(
                "• Status: {} {}",
                status_emoji(command),
                if command.is_enabled() { "Enabled" } else { "Disabled" }
            ),
        ];
        if let Some(timeout) = command.timeout() {
            lines.push(format!("• Timeout: {:.1}s", timeout.as_secs_f64()));
        }
        match command.cooldown() {
            Some(cooldown) => lines.push(format!("• Cooldown: {:.1}s", cooldown.as_secs_f64())),
            None => lines.push("• Cooldown: None".to_string()),
        }
        if !command.aliases().is_empty() {
            lines.push(format!("• Aliases: {}", command.aliases().join(", ")));
        }

        let category = command.category();
        lines.push(String::new());
        lines.push(format!("**Category**: {} {}", category.emoji(), category.label()));
        lines.push(String::new());
        lines.push("💡 **Tip**: Use `.help` to see all commands".to_string());
        lines.join("\n")
    }
}

fn status_emoji(command: &RegisteredCommand) -> &'static str {
    if command.is_enabled() { "✅" } else { "❌" }
}

fn description(command: &RegisteredCommand) -> &str {
    match command.description() {
        "" => "No description available",
        text => text,
    }
}

/// Cuts descriptions longer than 60 characters to 57 plus an ellipsis.
fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_DESCRIPTION {
        let cut: String = text.chars().take(MAX_DESCRIPTION - 3).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &str {
        "help"
    }

    fn trigger(&self) -> &str {
        ".help"
    }

    fn description(&self) -> &str {
        "Shows available commands and their descriptions"
    }

    fn usage(&self) -> Option<&str> {
        Some(".help [command]")
    }

    fn category(&self) -> Category {
        Category::Utility
    }

    fn cooldown(&self) -> Option<Duration> {
        Some(Duration::from_secs(2))
    }

    async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<CommandOutput> {
        let response = match ctx.arg_list().first() {
            Some(identifier) => Self::command_help(ctx.registry(), identifier),
            None => Self::general_help(ctx.registry()),
        };
        Ok(CommandOutput::reply(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandOptions, FnCommand};
    use crate::commands::PingCommand;
    use crate::commands::testing::context;
    use crate::stats::StatsCollector;

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry
            .register_with(
                PingCommand,
                CommandOptions::new()
                    .alias(".p")
                    .timeout(Duration::from_millis(2500)),
            )
            .unwrap();
        registry.register(HelpCommand).unwrap();
        let meme = FnCommand::new(
            "meme",
            ".meme",
            "Posts a random meme from a curated list of very long named subreddits",
            |_ctx: CommandContext| async { Ok(CommandOutput::silent()) },
        );
        registry
            .register_with(meme, CommandOptions::new().enabled(false))
            .unwrap();
        let echo = FnCommand::new("echo", "!echo", "Echoes", |_ctx: CommandContext| async {
            Ok(CommandOutput::silent())
        });
        registry.register(echo).unwrap();
        registry
    }

    #[test]
    fn test_general_help_layout() {
        let help = HelpCommand::general_help(&registry());

        assert!(help.starts_with("📚 **Discord Self-Bot Commands**"));
        assert!(help.contains("📊 **Statistics**: 3/4 commands enabled"));
        assert!(help.contains("**🔧 Utility**\n  ✅ `.ping` - "));
        assert!(help.contains("**🎉 Fun**\n  ❌ `.meme` - "));
        assert!(help.contains("**📦 Other**\n  ✅ `!echo` - Echoes"));
        assert!(!help.contains("Moderation"));
        assert!(help.ends_with("⚠️ **Note**: Self-bot for educational purposes only"));

        // Registration order within a category.
        let ping = help.find("`.ping`").unwrap();
        let help_pos = help.find("`.help`").unwrap();
        assert!(ping < help_pos);
    }

    #[test]
    fn test_long_descriptions_are_truncated() {
        let help = HelpCommand::general_help(&registry());
        let line = help.lines().find(|l| l.contains("`.meme`")).unwrap();
        let description = line.split(" - ").nth(1).unwrap();
        assert_eq!(description.chars().count(), 60);
        assert!(description.ends_with("..."));

        assert_eq!(truncate(&"x".repeat(60)), "x".repeat(60));
    }

    #[test]
    fn test_empty_registry() {
        assert_eq!(
            HelpCommand::general_help(&CommandRegistry::new()),
            "❌ No commands available"
        );
    }

    #[test]
    fn test_command_help_details() {
        let help = HelpCommand::command_help(&registry(), "ping");

        assert!(help.starts_with("📖 **Help for `.ping`**"));
        assert!(help.contains("**Name**: ping"));
        assert!(help.contains("**Usage**: `.ping`"));
        assert!(help.contains("• Status: ✅ Enabled"));
        assert!(help.contains("• Timeout: 2.5s"));
        assert!(help.contains("• Cooldown: 1.0s"));
        assert!(help.contains("• Aliases: .p"));
        assert!(help.contains("**Category**: 🔧 Utility"));

        let help = HelpCommand::command_help(&registry(), ".help");
        assert!(help.contains("**Usage**: `.help [command]`"));
        assert!(help.contains("• Cooldown: 2.0s"));
    }

    #[test]
    fn test_command_help_not_found() {
        assert_eq!(
            HelpCommand::command_help(&registry(), "nope"),
            "❌ **Command not found**: `nope`\n\n💡 Use `.help` to see all available commands"
        );
    }

    #[tokio::test]
    async fn test_execute_dispatches_on_args() {
        let ctx = context(registry(), StatsCollector::new(), None, ".help", "meme");
        let output = HelpCommand.execute(&ctx).await.unwrap();
        assert!(output.response.unwrap().contains("• Status: ❌ Disabled"));

        let ctx = context(registry(), StatsCollector::new(), None, ".help", "");
        let output = HelpCommand.execute(&ctx).await.unwrap();
        assert!(output.response.unwrap().starts_with("📚"));
    }
}
