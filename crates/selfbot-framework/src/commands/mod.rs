//! Built-in commands.
//!
//! - [`PingCommand`] (`.ping`): gateway latency with a quality indicator
//! - [`HelpCommand`] (`.help [command]`): command listing and detailed help
//! - [`StatsCommand`] (`.stats`): runtime statistics

mod help;
mod ping;
mod stats;

pub use help::HelpCommand;
pub use ping::{LatencyQuality, PingCommand};
pub use stats::{StatsCommand, format_uptime};

use std::sync::Arc;

use crate::command::BoxedCommand;

/// All built-in commands, in their default registration order.
pub fn builtin() -> Vec<BoxedCommand> {
    vec![
        Arc::new(PingCommand),
        Arc::new(HelpCommand),
        Arc::new(StatsCommand),
    ]
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared helpers for command tests.

    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use selfbot_core::{
        ActorId, BoxedClient, ChannelId, ChatClient, ClientResult, InboundMessage, MessageId,
        MessageRef,
    };

    use crate::command::CommandContext;
    use crate::registry::CommandRegistry;
    use crate::stats::StatsCollector;

    pub struct LatencyClient(pub Option<Duration>);

    #[async_trait]
    impl ChatClient for LatencyClient {
        fn self_id(&self) -> Option<ActorId> {
            Some(ActorId::from("me"))
        }

        fn latency(&self) -> Option<Duration> {
            self.0
        }

        async fn send(&self, _channel: &ChannelId, _text: &str) -> ClientResult<MessageId> {
            Ok(MessageId::from("1"))
        }

        async fn edit(&self, _message: &MessageRef, _text: &str) -> ClientResult<()> {
            Ok(())
        }
    }

    pub fn context(
        registry: CommandRegistry,
        stats: StatsCollector,
        latency: Option<Duration>,
        trigger: &str,
        args: &str,
    ) -> CommandContext {
        let client: BoxedClient = Arc::new(LatencyClient(latency));
        let message = InboundMessage::new("me", "chan", "m1", format!("{trigger} {args}"));
        CommandContext::new(message, trigger, args, client, Arc::new(registry), stats)
    }
}
