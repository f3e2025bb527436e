//! Discord REST client.
//!
//! Covers the handful of endpoints the bot needs: sending embeds, deleting
//! trigger messages, registering the global slash commands, and answering
//! interactions.

use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::debug;

pub const DISCORD_DEFAULT_API_BASE_URL: &str = "https://discord.com/api/v10";

/// Error types for Discord REST calls.
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("discord API error ({status}): {message}")]
    Api { status: StatusCode, message: String },
}

/// A thin client over the Discord REST API targeting a configurable base
/// URL (tests point it at a local server).
pub struct DiscordApi {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
}

impl DiscordApi {
    /// Create a new client targeting the given API base URL.
    pub fn new(base_url: String, bot_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            bot_token,
        }
    }

    /// Build the API endpoint URL for a path.
    fn api_url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{}/{}", base, path)
    }

    fn auth_header(&self) -> String {
        format_bot_token(&self.bot_token)
    }

    /// Post an embed message to a channel.
    pub async fn send_embed(&self, channel_id: &str, embed: Value) -> Result<(), DiscordError> {
        let body = json!({ "embeds": [embed] });
        let resp = self
            .client
            .post(self.api_url(&format!("channels/{}/messages", channel_id)))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&body)
            .send()
            .await?;
        Self::check_response(resp).await
    }

    /// Best-effort delete of a trigger message. Missing permissions or an
    /// already-deleted message are not worth surfacing to the user.
    pub async fn delete_message(&self, channel_id: &str, message_id: &str) {
        let url = self.api_url(&format!("channels/{}/messages/{}", channel_id, message_id));
        let result = self
            .client
            .delete(url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await;
        match result {
            Ok(resp) if !resp.status().is_success() => {
                debug!("message delete returned {}", resp.status());
            }
            Err(err) => debug!("message delete failed: {}", err),
            _ => {}
        }
    }

    /// Overwrite the application's global slash commands.
    pub async fn register_commands(
        &self,
        client_id: &str,
        commands: &Value,
    ) -> Result<(), DiscordError> {
        let resp = self
            .client
            .put(self.api_url(&format!("applications/{}/commands", client_id)))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(commands)
            .send()
            .await?;
        Self::check_response(resp).await
    }

    /// Answer an interaction with a callback payload.
    pub async fn interaction_reply(
        &self,
        interaction_id: &str,
        token: &str,
        response: Value,
    ) -> Result<(), DiscordError> {
        let resp = self
            .client
            .post(self.api_url(&format!(
                "interactions/{}/{}/callback",
                interaction_id, token
            )))
            .json(&response)
            .send()
            .await?;
        Self::check_response(resp).await
    }

    async fn check_response(resp: reqwest::Response) -> Result<(), DiscordError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body_text = resp.text().await.unwrap_or_default();
        let parsed: Value = serde_json::from_str(&body_text).unwrap_or(Value::Null);
        let message = parsed
            .get("message")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .or_else(|| {
                if body_text.is_empty() {
                    None
                } else {
                    Some(body_text)
                }
            })
            .unwrap_or_else(|| format!("HTTP {}", status));

        Err(DiscordError::Api { status, message })
    }
}

fn format_bot_token(token: &str) -> String {
    if token.trim_start().starts_with("Bot ") {
        token.to_string()
    } else {
        format!("Bot {}", token)
    }
}
