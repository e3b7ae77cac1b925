//! Discord channel: websocket gateway for inbound messages, REST for
//! the outbound message lifecycle.
//! Docs: <https://discord.com/developers/docs>

mod gateway;
mod rest;
pub(crate) mod types;


pub use rest::DiscordRest;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;
use wikipeek_core::{
    config::DiscordConfig, error::WikipeekError, message::IncomingMessage, traits::Channel,
};

/// Inbound Discord channel backed by a gateway websocket.
pub struct DiscordChannel {
    config: DiscordConfig,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, WikipeekError> {
        if self.config.bot_token.is_empty() {
            return Err(WikipeekError::Channel("discord bot_token is empty".into()));
        }

        let (tx, rx) = mpsc::channel(64);
        info!("Discord channel connecting to gateway...");
        tokio::spawn(gateway::run_gateway(self.config.bot_token.clone(), tx));
        Ok(rx)
    }

    async fn stop(&self) -> Result<(), WikipeekError> {
        info!("Discord channel stopped");
        Ok(())
    }
}
