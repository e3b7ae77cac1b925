use crate::{error::WikipeekError, message::IncomingMessage};
use async_trait::async_trait;

/// Inbound message source — one per messaging platform.
///
/// `start` spawns whatever background work the platform needs (websocket
/// gateway, long polling, ...) and hands back a receiver of messages that
/// already passed the bot-author filter.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for incoming messages.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<IncomingMessage>, WikipeekError>;

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), WikipeekError>;
}

/// Outbound chat-platform API.
///
/// Injected into the reply pipeline as a constructed dependency so tests
/// can substitute a recording double. Every call is independently
/// fallible; the caller decides whether a failure aborts or is swallowed.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Send a text message; returns the platform message id.
    async fn send(&self, channel_id: &str, content: &str) -> Result<String, WikipeekError>;

    /// Send a message carrying a PNG image attachment.
    async fn send_with_image(
        &self,
        channel_id: &str,
        content: &str,
        filename: &str,
        image: &[u8],
    ) -> Result<String, WikipeekError>;

    /// Replace the content of an existing message.
    async fn edit(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), WikipeekError>;

    /// Confirm a message still exists.
    async fn fetch(&self, channel_id: &str, message_id: &str) -> Result<(), WikipeekError>;

    /// Delete a message.
    async fn delete(&self, channel_id: &str, message_id: &str) -> Result<(), WikipeekError>;
}
