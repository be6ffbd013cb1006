//! A chat client backed by the terminal.
//!
//! Every input line is a message from the logged-in account in a single
//! channel; responses are written to the output, one per line.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

use selfbot_core::{
    ActorId, ChannelId, ChatClient, ClientError, ClientEvent, ClientResult, EventSender,
    InboundMessage, MessageId, MessageRef,
};

pub const CONSOLE_ACTOR: &str = "console";
pub const CONSOLE_CHANNEL: &str = "terminal";

/// Writes responses to `W` (stdout in the binary).
pub struct ConsoleClient<W> {
    self_id: ActorId,
    output: Mutex<W>,
    sent: AtomicU64,
}

impl<W> ConsoleClient<W> {
    pub fn new(output: W) -> Self {
        Self {
            self_id: ActorId::from(CONSOLE_ACTOR),
            output: Mutex::new(output),
            sent: AtomicU64::new(0),
        }
    }

    pub fn into_inner(self) -> W {
        self.output.into_inner()
    }
}

impl<W: AsyncWrite + Unpin + Send> ConsoleClient<W> {
    async fn write_line(&self, text: &str) -> ClientResult<()> {
        let mut output = self.output.lock().await;
        let write = async {
            output.write_all(text.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await
        };
        write.await.map_err(|e| ClientError::other(e.to_string()))
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send + 'static> ChatClient for ConsoleClient<W> {
    fn self_id(&self) -> Option<ActorId> {
        Some(self.self_id.clone())
    }

    fn latency(&self) -> Option<Duration> {
        Some(Duration::ZERO)
    }

    async fn send(&self, _channel: &ChannelId, text: &str) -> ClientResult<MessageId> {
        self.write_line(text).await?;
        let id = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(MessageId::new(format!("out-{id}")))
    }

    async fn edit(&self, _message: &MessageRef, text: &str) -> ClientResult<()> {
        self.write_line(text).await
    }
}

/// Forwards lines from `input` as message events until EOF.
///
/// Emits `Ready` first. Returns the number of messages forwarded; blank lines
/// are skipped.
pub async fn forward_lines<R>(input: R, events: EventSender) -> std::io::Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let actor = ActorId::from(CONSOLE_ACTOR);
    let channel = ChannelId::from(CONSOLE_CHANNEL);

    if events
        .send(ClientEvent::Ready {
            self_id: actor.clone(),
        })
        .await
        .is_err()
    {
        return Ok(0);
    }

    let mut lines = input.lines();
    let mut forwarded = 0;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        forwarded += 1;
        let message = InboundMessage::new(
            actor.clone(),
            channel.clone(),
            format!("in-{forwarded}"),
            line,
        );
        if events.send(ClientEvent::Message(message)).await.is_err() {
            break;
        }
    }

    debug!(forwarded, "Console input closed");
    Ok(forwarded)
}
