//! Discord gateway and REST deserialization types.

use serde::Deserialize;

/// Gateway opcodes used by this client.
pub(crate) const OP_DISPATCH: u8 = 0;
pub(crate) const OP_HEARTBEAT: u8 = 1;
pub(crate) const OP_IDENTIFY: u8 = 2;
pub(crate) const OP_RECONNECT: u8 = 7;
pub(crate) const OP_INVALID_SESSION: u8 = 9;
pub(crate) const OP_HELLO: u8 = 10;

/// GUILDS | GUILD_MESSAGES | DIRECT_MESSAGES | MESSAGE_CONTENT.
pub(crate) const GATEWAY_INTENTS: u64 = (1 << 0) | (1 << 9) | (1 << 12) | (1 << 15);

#[derive(Debug, Deserialize)]
pub(crate) struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: Option<serde_json::Value>,
    /// Sequence number, echoed back in heartbeats.
    #[serde(default)]
    pub s: Option<i64>,
    /// Dispatch event name, present when `op` is 0.
    #[serde(default)]
    pub t: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Hello {
    pub heartbeat_interval: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageCreate {
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub content: String,
    pub author: Author,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Author {
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

/// GUILD_CREATE carries the guild display name; one arrives per guild
/// after identify.
#[derive(Debug, Deserialize)]
pub(crate) struct GuildCreate {
    pub id: String,
    pub name: String,
}

/// Subset of a REST message object.
#[derive(Debug, Deserialize)]
pub(crate) struct RestMessage {
    pub id: String,
}

/// Subset of `GET /users/@me`.
#[derive(Debug, Deserialize)]
pub(crate) struct CurrentUser {
    pub username: String,
}
