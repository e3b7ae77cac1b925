//! Reply lifecycle — one outgoing message per resolved reference.
//!
//! Placeholder first, then exactly one terminal transition: edited text,
//! replaced with an image attachment, or deleted on failure. Collaborator
//! failures past the placeholder are logged and swallowed; they never
//! abort the process or touch other in-flight references.

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use wikipeek_core::config::{ReplyConfig, WikiConfig};
use wikipeek_core::message::IncomingMessage;
use wikipeek_core::reference::{extract_references, LookupTarget, Reference};
use wikipeek_core::traits::ChatApi;
use wikipeek_snapshot::Snapshotter;

/// Terminal state of one outgoing reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyState {
    EditedText,
    ReplacedWithAttachment,
    DeletedOnFailure,
}

/// The per-reference reply pipeline with its injected collaborators.
pub struct Pipeline {
    chat: Arc<dyn ChatApi>,
    engine: Arc<dyn Snapshotter>,
    base_url: String,
    delete_delay: Duration,
}

impl Pipeline {
    pub fn new(
        chat: Arc<dyn ChatApi>,
        engine: Arc<dyn Snapshotter>,
        wiki: &WikiConfig,
        reply: &ReplyConfig,
    ) -> Self {
        Self {
            chat,
            engine,
            base_url: wiki.base_url.clone(),
            delete_delay: Duration::from_millis(reply.delete_delay_ms),
        }
    }

    /// Spawn one independent task per reference in the message.
    /// Completion order across references is unspecified.
    pub fn dispatch(
        self: &Arc<Self>,
        incoming: &IncomingMessage,
    ) -> Vec<tokio::task::JoinHandle<Option<ReplyState>>> {
        extract_references(&incoming.text)
            .map(|reference| {
                let pipeline = Arc::clone(self);
                let channel_id = incoming.channel_id.clone();
                let guild_name = incoming.guild_name.clone();
                tokio::spawn(async move {
                    pipeline
                        .handle_reference(&channel_id, &guild_name, reference)
                        .await
                })
            })
            .collect()
    }

    /// Run the full lifecycle for one reference. Returns the terminal
    /// state, or `None` when the placeholder could not even be sent.
    pub async fn handle_reference(
        &self,
        channel_id: &str,
        guild_name: &str,
        reference: Reference,
    ) -> Option<ReplyState> {
        let title = reference.resolved_title();
        let target = LookupTarget::new(&self.base_url, &title);

        let placeholder_text = format!("Retrieving details from the wiki for **{title}**");
        let placeholder = match self.chat.send(channel_id, &placeholder_text).await {
            Ok(id) => id,
            Err(e) => {
                // Nothing was posted, so there is nothing to clean up.
                error!("\"{e}\" \"{guild_name}\" \"{title}\"");
                return None;
            }
        };

        let result = match self.engine.extract(&target.url).await {
            Ok(result) => result,
            Err(e) => {
                error!("\"Snapshot failed: {e}\" \"{guild_name}\" \"{}\"", target.url);
                remove_message(self.chat.as_ref(), channel_id, &placeholder, guild_name).await;
                return Some(ReplyState::DeletedOnFailure);
            }
        };

        if !result.success {
            let failure_text = format!("Could not get details from the wiki for **{title}**");
            edit_message(
                self.chat.as_ref(),
                channel_id,
                &placeholder,
                &failure_text,
                guild_name,
            )
            .await;

            // Leave the failure visible briefly, then remove the trace.
            // Independent one-shot task; its failures are swallowed too.
            let chat = Arc::clone(&self.chat);
            let delay = self.delete_delay;
            let channel_id = channel_id.to_string();
            let guild_name_owned = guild_name.to_string();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                remove_message(chat.as_ref(), &channel_id, &placeholder, &guild_name_owned).await;
            });

            error!(target: "requests", "\"{guild_name}\" \"{title}\" \"{}\" \"INVALID PAGE\"", target.url);
            return Some(ReplyState::DeletedOnFailure);
        }

        info!(target: "requests", "\"{guild_name}\" \"{title}\" \"{}\"", target.url);

        // Angle brackets suppress the platform's own URL embed.
        let mut content = format!("<{}>", target.url);
        if let Some(ref textblock) = result.textblock {
            content.push('\n');
            content.push_str(textblock);
        }

        match result.screenshot {
            None => {
                edit_message(
                    self.chat.as_ref(),
                    channel_id,
                    &placeholder,
                    &content,
                    guild_name,
                )
                .await;
                Some(ReplyState::EditedText)
            }
            Some(image) => {
                remove_message(self.chat.as_ref(), channel_id, &placeholder, guild_name).await;
                if let Err(e) = self
                    .chat
                    .send_with_image(channel_id, &content, "snapshot.png", &image)
                    .await
                {
                    error!("\"{e}\" \"{guild_name}\" \"{content}\"");
                }
                Some(ReplyState::ReplacedWithAttachment)
            }
        }
    }
}

/// Edit in place, log-and-swallow on failure.
async fn edit_message(
    chat: &dyn ChatApi,
    channel_id: &str,
    message_id: &str,
    content: &str,
    guild_name: &str,
) {
    if let Err(e) = chat.edit(channel_id, message_id, content).await {
        error!("\"Could not edit message {message_id}: {e}\" \"{guild_name}\" \"{content}\"");
    }
}

/// Fetch-then-delete, log-and-swallow on either failure.
async fn remove_message(chat: &dyn ChatApi, channel_id: &str, message_id: &str, guild_name: &str) {
    let removed = match chat.fetch(channel_id, message_id).await {
        Ok(()) => chat.delete(channel_id, message_id).await.is_ok(),
        Err(_) => false,
    };
    if !removed {
        error!("\"Could not delete message {message_id}\" \"{guild_name}\"");
    }
}
