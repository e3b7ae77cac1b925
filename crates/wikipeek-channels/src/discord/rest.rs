//! Discord REST client: message send/edit/fetch/delete and attachment
//! upload, each call independently fallible.

use super::types::{CurrentUser, RestMessage};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use wikipeek_core::{error::WikipeekError, traits::ChatApi};

const API_BASE: &str = "https://discord.com/api/v10";

/// REST-side Discord client. Shared process-wide; holds no mutable state.
pub struct DiscordRest {
    client: reqwest::Client,
    auth_header: String,
    base_url: String,
}

impl DiscordRest {
    pub fn new(bot_token: &str) -> Self {
        Self::with_base_url(bot_token, API_BASE)
    }

    pub(crate) fn with_base_url(bot_token: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            auth_header: format!("Bot {bot_token}"),
            base_url: base_url.to_string(),
        }
    }

    fn message_url(&self, channel_id: &str, message_id: &str) -> String {
        format!(
            "{}/channels/{}/messages/{}",
            self.base_url, channel_id, message_id
        )
    }

    /// Verify the token by fetching the bot's own user.
    pub async fn current_username(&self) -> Result<String, WikipeekError> {
        let resp = self
            .client
            .get(format!("{}/users/@me", self.base_url))
            .header(AUTHORIZATION, &self.auth_header)
            .send()
            .await
            .map_err(|e| WikipeekError::Chat(format!("users/@me failed: {e}")))?;

        let user: CurrentUser = check_status(resp, "users/@me")
            .await?
            .json()
            .await
            .map_err(|e| WikipeekError::Chat(format!("users/@me parse failed: {e}")))?;
        Ok(user.username)
    }
}

async fn check_status(
    resp: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response, WikipeekError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(WikipeekError::Chat(format!(
        "{what} failed: HTTP {status}: {body}"
    )))
}

#[async_trait]
impl ChatApi for DiscordRest {
    async fn send(&self, channel_id: &str, content: &str) -> Result<String, WikipeekError> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel_id);
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, &self.auth_header)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(|e| WikipeekError::Chat(format!("send failed: {e}")))?;

        let message: RestMessage = check_status(resp, "send")
            .await?
            .json()
            .await
            .map_err(|e| WikipeekError::Chat(format!("send parse failed: {e}")))?;
        Ok(message.id)
    }

    async fn send_with_image(
        &self,
        channel_id: &str,
        content: &str,
        filename: &str,
        image: &[u8],
    ) -> Result<String, WikipeekError> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel_id);

        let payload = serde_json::json!({
            "content": content,
            "attachments": [{ "id": 0, "filename": filename }],
        });
        let part = reqwest::multipart::Part::bytes(image.to_vec())
            .file_name(filename.to_string())
            .mime_str("image/png")
            .map_err(|e| WikipeekError::Chat(format!("attachment mime failed: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .text("payload_json", payload.to_string())
            .part("files[0]", part);

        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, &self.auth_header)
            .multipart(form)
            .send()
            .await
            .map_err(|e| WikipeekError::Chat(format!("attachment send failed: {e}")))?;

        let message: RestMessage = check_status(resp, "attachment send")
            .await?
            .json()
            .await
            .map_err(|e| WikipeekError::Chat(format!("attachment send parse failed: {e}")))?;
        Ok(message.id)
    }

    async fn edit(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), WikipeekError> {
        let resp = self
            .client
            .patch(self.message_url(channel_id, message_id))
            .header(AUTHORIZATION, &self.auth_header)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(|e| WikipeekError::Chat(format!("edit failed: {e}")))?;
        check_status(resp, "edit").await?;
        Ok(())
    }

    async fn fetch(&self, channel_id: &str, message_id: &str) -> Result<(), WikipeekError> {
        let resp = self
            .client
            .get(self.message_url(channel_id, message_id))
            .header(AUTHORIZATION, &self.auth_header)
            .send()
            .await
            .map_err(|e| WikipeekError::Chat(format!("fetch failed: {e}")))?;
        check_status(resp, "fetch").await?;
        Ok(())
    }

    async fn delete(&self, channel_id: &str, message_id: &str) -> Result<(), WikipeekError> {
        let resp = self
            .client
            .delete(self.message_url(channel_id, message_id))
            .header(AUTHORIZATION, &self.auth_header)
            .send()
            .await
            .map_err(|e| WikipeekError::Chat(format!("delete failed: {e}")))?;
        check_status(resp, "delete").await?;
        Ok(())
    }
}
