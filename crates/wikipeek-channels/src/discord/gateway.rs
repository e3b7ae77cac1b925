//! Discord gateway connection: identify, heartbeat, dispatch.
//!
//! One websocket connection feeds the channel receiver; transport
//! failures reconnect with exponential backoff and a fresh identify.

use super::types::{
    Author, GatewayPayload, GuildCreate, Hello, MessageCreate, GATEWAY_INTENTS, OP_DISPATCH,
    OP_HEARTBEAT, OP_HELLO, OP_IDENTIFY, OP_INVALID_SESSION, OP_RECONNECT,
};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use wikipeek_core::{error::WikipeekError, message::IncomingMessage};

const GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// Reconnect loop. Runs until the receiver side is dropped.
pub(crate) async fn run_gateway(token: String, tx: mpsc::Sender<IncomingMessage>) {
    let mut backoff_secs: u64 = 1;

    loop {
        match connect_and_listen(&token, &tx).await {
            Ok(()) => {
                info!("discord gateway closed, reconnecting");
                backoff_secs = 1;
            }
            Err(e) => {
                error!("discord gateway error (retry in {backoff_secs}s): {e}");
            }
        }

        if tx.is_closed() {
            info!("discord channel receiver dropped, stopping gateway");
            return;
        }

        time::sleep(Duration::from_secs(backoff_secs)).await;
        backoff_secs = (backoff_secs * 2).min(60);
    }
}

async fn connect_and_listen(
    token: &str,
    tx: &mpsc::Sender<IncomingMessage>,
) -> Result<(), WikipeekError> {
    let (ws, _) = connect_async(GATEWAY_URL)
        .await
        .map_err(|e| WikipeekError::Channel(format!("gateway connect failed: {e}")))?;
    let (mut sink, mut stream) = ws.split();

    let mut last_seq: Option<i64> = None;
    // Guild display names arrive via GUILD_CREATE after identify.
    let mut guild_names: HashMap<String, String> = HashMap::new();
    // Replaced with the real cadence once HELLO arrives.
    let mut heartbeat = time::interval(Duration::from_secs(3600));
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut received_hello = false;

    loop {
        tokio::select! {
            _ = heartbeat.tick(), if received_hello => {
                let payload = serde_json::json!({ "op": OP_HEARTBEAT, "d": last_seq });
                sink.send(Message::Text(payload.to_string()))
                    .await
                    .map_err(|e| WikipeekError::Channel(format!("heartbeat send failed: {e}")))?;
            }

            frame = stream.next() => {
                let message = match frame {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        return Err(WikipeekError::Channel(format!("gateway read failed: {e}")));
                    }
                    None => return Ok(()),
                };

                let text = match message {
                    Message::Text(text) => text,
                    Message::Close(frame) => {
                        warn!("discord gateway close frame: {frame:?}");
                        return Ok(());
                    }
                    _ => continue,
                };

                let payload: GatewayPayload = match serde_json::from_str(&text) {
                    Ok(p) => p,
                    Err(e) => {
                        debug!("unparseable gateway payload: {e}");
                        continue;
                    }
                };

                if let Some(seq) = payload.s {
                    last_seq = Some(seq);
                }

                match payload.op {
                    OP_HELLO => {
                        let hello: Hello = payload
                            .d
                            .and_then(|d| serde_json::from_value(d).ok())
                            .ok_or_else(|| {
                                WikipeekError::Channel("malformed HELLO payload".into())
                            })?;
                        let period = Duration::from_millis(hello.heartbeat_interval);
                        heartbeat = time::interval_at(Instant::now() + period, period);
                        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
                        received_hello = true;

                        sink.send(Message::Text(identify_payload(token).to_string()))
                            .await
                            .map_err(|e| {
                                WikipeekError::Channel(format!("identify send failed: {e}"))
                            })?;
                    }

                    OP_DISPATCH => {
                        let Some(data) = payload.d else { continue };
                        match payload.t.as_deref() {
                            Some("GUILD_CREATE") => {
                                if let Ok(guild) = serde_json::from_value::<GuildCreate>(data) {
                                    guild_names.insert(guild.id, guild.name);
                                }
                            }
                            Some("MESSAGE_CREATE") => {
                                let Ok(msg) = serde_json::from_value::<MessageCreate>(data)
                                else {
                                    continue;
                                };
                                // Bot-authored messages never enter the pipeline.
                                if msg.author.bot {
                                    continue;
                                }
                                if tx.send(to_incoming(msg, &guild_names)).await.is_err() {
                                    return Ok(());
                                }
                            }
                            Some("READY") => info!("discord gateway ready"),
                            _ => {}
                        }
                    }

                    OP_RECONNECT | OP_INVALID_SESSION => {
                        info!("discord gateway requested reconnect (op {})", payload.op);
                        return Ok(());
                    }

                    // Server asked for an immediate heartbeat.
                    OP_HEARTBEAT => {
                        let payload = serde_json::json!({ "op": OP_HEARTBEAT, "d": last_seq });
                        sink.send(Message::Text(payload.to_string())).await.map_err(|e| {
                            WikipeekError::Channel(format!("heartbeat send failed: {e}"))
                        })?;
                    }

                    _ => {}
                }
            }
        }
    }
}

pub(crate) fn identify_payload(token: &str) -> serde_json::Value {
    serde_json::json!({
        "op": OP_IDENTIFY,
        "d": {
            "token": token,
            "intents": GATEWAY_INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "wikipeek",
                "device": "wikipeek",
            },
        },
    })
}

pub(crate) fn to_incoming(
    msg: MessageCreate,
    guild_names: &HashMap<String, String>,
) -> IncomingMessage {
    let MessageCreate {
        channel_id,
        guild_id,
        content,
        author: Author { username, bot },
        ..
    } = msg;

    let guild_name = guild_id
        .and_then(|id| guild_names.get(&id).cloned())
        .unwrap_or_else(|| "DM".to_string());

    IncomingMessage {
        id: Uuid::new_v4(),
        channel: "discord".to_string(),
        channel_id,
        guild_name,
        author_name: Some(username),
        author_is_bot: bot,
        text: content,
        timestamp: chrono::Utc::now(),
    }
}
