//! Gateway — the event loop connecting inbound channels to the reply
//! pipeline.

use crate::pipeline::Pipeline;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use wikipeek_core::{message::IncomingMessage, traits::Channel};

/// Routes inbound messages into per-reference pipeline tasks.
pub struct Gateway {
    channels: HashMap<String, Arc<dyn Channel>>,
    pipeline: Arc<Pipeline>,
}

impl Gateway {
    pub fn new(channels: HashMap<String, Arc<dyn Channel>>, pipeline: Arc<Pipeline>) -> Self {
        Self { channels, pipeline }
    }

    /// Run the main event loop until the channels close or ctrl-c.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!(
            "wikipeek gateway running | channels: {}",
            self.channels.keys().cloned().collect::<Vec<_>>().join(", ")
        );

        let (tx, mut rx) = mpsc::channel::<IncomingMessage>(256);

        for (name, channel) in &self.channels {
            let mut channel_rx = channel
                .start()
                .await
                .map_err(|e| anyhow::anyhow!("failed to start channel {name}: {e}"))?;
            let tx = tx.clone();
            let channel_name = name.clone();

            tokio::spawn(async move {
                while let Some(msg) = channel_rx.recv().await {
                    if tx.send(msg).await.is_err() {
                        info!("gateway receiver dropped, stopping {channel_name} forwarder");
                        break;
                    }
                }
            });

            info!("Channel started: {name}");
        }

        drop(tx);

        loop {
            tokio::select! {
                maybe = rx.recv() => match maybe {
                    Some(incoming) => self.handle_message(incoming),
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                    self.shutdown().await;
                    break;
                }
            }
        }

        Ok(())
    }

    /// Fire one pipeline task per extracted reference without awaiting
    /// any of them, so the scan loop keeps draining inbound messages.
    fn handle_message(&self, incoming: IncomingMessage) {
        // Channels filter bot authors already; keep the guard anyway.
        if incoming.author_is_bot {
            return;
        }

        let handles = self.pipeline.dispatch(&incoming);
        if handles.is_empty() {
            debug!("no references in message from {:?}", incoming.author_name);
        }
    }

    async fn shutdown(&self) {
        for (name, channel) in &self.channels {
            if let Err(e) = channel.stop().await {
                error!("failed to stop channel {name}: {e}");
            }
        }
    }
}
