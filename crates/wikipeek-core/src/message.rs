use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An inbound chat message, already filtered to non-bot authors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel name (e.g. "discord").
    pub channel: String,
    /// Platform channel the message arrived in; replies go back here.
    pub channel_id: String,
    /// Display name of the originating guild/server ("DM" for direct
    /// messages). Used for request-log context only.
    pub guild_name: String,
    /// Human-readable author name.
    pub author_name: Option<String>,
    /// Whether the author is a bot. Bot messages never reach the
    /// pipeline; the flag is kept for completeness of the record.
    pub author_is_bot: bool,
    /// Message text content.
    pub text: String,
    pub timestamp: DateTime<Utc>,
}
