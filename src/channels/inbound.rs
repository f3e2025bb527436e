//! Inbound event routing.
//!
//! Maps `MESSAGE_CREATE` text commands and `INTERACTION_CREATE` slash
//! commands onto clock transitions and builds the replies. Events are
//! handled one at a time by the gateway loop, so transitions never
//! interleave.

use serde_json::Value;
use tracing::error;

use crate::attendance::{now_millis, AttendanceStore, Clock, ClockError, DEFAULT_HISTORY_LIMIT};
use crate::channels::commands::{
    embed_response, ephemeral_embed_response, ephemeral_text_response, help_embed, history_embed,
    offline_embed, online_embed, status_embed,
};
use crate::channels::discord::DiscordApi;
use crate::channels::{classify_scope, Scope};

pub const WRONG_CHANNEL_REPLY: &str = "Wrong channel";
pub const ALREADY_ONLINE_REPLY: &str = "You are already online.";
pub const NOT_ONLINE_REPLY: &str = "You are not online.";
pub const NO_HISTORY_REPLY: &str = "No attendance history found.";
pub const SAVE_FAILED_REPLY: &str = "Attendance could not be saved. Please try again.";

/// The bot: a clock over the attendance store, the REST client for
/// replies, and the guild/channel scope restriction.
pub struct AttendanceBot<S: AttendanceStore> {
    clock: Clock<S>,
    api: DiscordApi,
    guild_id: String,
    channel_id: String,
    bot_user_id: Option<String>,
}

impl<S: AttendanceStore> AttendanceBot<S> {
    pub fn new(clock: Clock<S>, api: DiscordApi, guild_id: String, channel_id: String) -> Self {
        Self {
            clock,
            api,
            guild_id,
            channel_id,
            bot_user_id: None,
        }
    }

    /// Record our own user ID (from the gateway READY event) so we can
    /// skip our own messages.
    pub fn set_bot_user_id(&mut self, user_id: String) {
        self.bot_user_id = Some(user_id);
    }

    pub fn clock(&self) -> &Clock<S> {
        &self.clock
    }

    fn scope(&self, guild_id: Option<&str>, channel_id: &str) -> Scope {
        classify_scope(&self.guild_id, &self.channel_id, guild_id, channel_id)
    }

    /// Handle a `MESSAGE_CREATE` event (the free-text command path).
    pub async fn handle_message_create(&mut self, data: &Value) {
        let author = match data.get("author") {
            Some(a) => a,
            None => return,
        };

        if author.get("bot").and_then(|v| v.as_bool()) == Some(true) {
            return;
        }

        let sender_id = match author.get("id").and_then(|v| v.as_str()) {
            Some(id) => id.to_string(),
            None => return,
        };

        if self.bot_user_id.as_deref() == Some(sender_id.as_str()) {
            return;
        }

        let channel_id = match data.get("channel_id").and_then(|v| v.as_str()) {
            Some(id) => id.to_string(),
            None => return,
        };

        let guild_id = data.get("guild_id").and_then(|v| v.as_str());

        // Text commands outside the designated channel are silently ignored.
        if self.scope(guild_id, &channel_id) != Scope::Allowed {
            return;
        }

        let content = match data.get("content").and_then(|v| v.as_str()) {
            Some(text) if !text.is_empty() => text.trim().to_lowercase(),
            _ => return,
        };

        if content != "online" && content != "offline" {
            return;
        }

        // The trigger message is removed whether or not the transition
        // succeeds; the embed (if any) is the visible record.
        if let Some(message_id) = data.get("id").and_then(|v| v.as_str()) {
            self.api.delete_message(&channel_id, message_id).await;
        }

        if let Some(embed) = self.text_reply(&content, &sender_id, now_millis()) {
            if let Err(err) = self.api.send_embed(&channel_id, embed).await {
                error!("attendance reply failed for {}: {}", sender_id, err);
            }
        }
    }

    /// Handle an `INTERACTION_CREATE` event (the slash command path).
    pub async fn handle_interaction_create(&mut self, data: &Value) {
        if data.get("type").and_then(|v| v.as_u64()) != Some(2) {
            return;
        }

        let interaction_id = match data.get("id").and_then(|v| v.as_str()) {
            Some(id) => id.to_string(),
            None => return,
        };
        let token = match data.get("token").and_then(|v| v.as_str()) {
            Some(t) => t.to_string(),
            None => return,
        };
        let channel_id = match data.get("channel_id").and_then(|v| v.as_str()) {
            Some(id) => id.to_string(),
            None => return,
        };

        // Guild interactions carry the caller under member.user.
        let user_id = match data
            .get("member")
            .and_then(|m| m.get("user"))
            .or_else(|| data.get("user"))
            .and_then(|u| u.get("id"))
            .and_then(|v| v.as_str())
        {
            Some(id) => id.to_string(),
            None => return,
        };

        let guild_id = data.get("guild_id").and_then(|v| v.as_str());
        let response = match self.scope(guild_id, &channel_id) {
            Scope::OutOfScope => return,
            Scope::WrongChannel => Some(ephemeral_text_response(WRONG_CHANNEL_REPLY)),
            Scope::Allowed => {
                let name = data
                    .get("data")
                    .and_then(|d| d.get("name"))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                self.slash_reply(&name, &user_id, now_millis())
            }
        };

        if let Some(response) = response {
            if let Err(err) = self
                .api
                .interaction_reply(&interaction_id, &token, response)
                .await
            {
                error!("interaction reply failed for {}: {}", user_id, err);
            }
        }
    }

    /// Reply selection for the text path. `None` means stay silent: an
    /// unknown command, a redundant `online` while already online, or an
    /// `offline` with no open session.
    fn text_reply(&mut self, command: &str, user_id: &str, now: i64) -> Option<Value> {
        match command {
            "online" => match self.clock.clock_in(user_id, now) {
                Ok(_) => Some(online_embed(user_id)),
                Err(ClockError::AlreadyOnline) => None,
                Err(err) => {
                    error!("clock-in persist failed for {}: {}", user_id, err);
                    None
                }
            },
            "offline" => match self.clock.clock_out(user_id, now) {
                Ok(receipt) => Some(offline_embed(user_id, &receipt)),
                Err(ClockError::NotOnline) => None,
                Err(err) => {
                    error!("clock-out persist failed for {}: {}", user_id, err);
                    None
                }
            },
            _ => None,
        }
    }

    /// Reply selection for the slash path. `None` only for unknown command
    /// names; every known command gets an explicit reply.
    fn slash_reply(&mut self, name: &str, user_id: &str, now: i64) -> Option<Value> {
        let response = match name {
            "online" => match self.clock.clock_in(user_id, now) {
                Ok(_) => embed_response(online_embed(user_id)),
                Err(ClockError::AlreadyOnline) => ephemeral_text_response(ALREADY_ONLINE_REPLY),
                Err(err) => {
                    error!("clock-in persist failed for {}: {}", user_id, err);
                    ephemeral_text_response(SAVE_FAILED_REPLY)
                }
            },
            "offline" => match self.clock.clock_out(user_id, now) {
                Ok(receipt) => embed_response(offline_embed(user_id, &receipt)),
                Err(ClockError::NotOnline) => ephemeral_text_response(NOT_ONLINE_REPLY),
                Err(err) => {
                    error!("clock-out persist failed for {}: {}", user_id, err);
                    ephemeral_text_response(SAVE_FAILED_REPLY)
                }
            },
            "status" => embed_response(status_embed(&self.clock.status(user_id))),
            "history" => match self.clock.history(user_id, DEFAULT_HISTORY_LIMIT) {
                Ok(sessions) => embed_response(history_embed(&sessions)),
                Err(_) => ephemeral_text_response(NO_HISTORY_REPLY),
            },
            "help" => ephemeral_embed_response(help_embed()),
            _ => return None,
        };
        Some(response)
    }
}
