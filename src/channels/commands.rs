//! Attendance command surface shared by the text and slash paths.
//!
//! Slash command definitions, embed builders, and interaction reply
//! envelopes. Both paths map onto the same clock transitions; only the
//! reply plumbing differs.

use serde_json::{json, Value};

use crate::attendance::format::{discord_timestamp, format_duration, mention};
use crate::attendance::{ClockOut, Session, Status};

// Embed accent colors (discord.js palette).
const COLOR_GREEN: u32 = 0x57F287;
const COLOR_RED: u32 = 0xED4245;
const COLOR_BLUE: u32 = 0x3498DB;
const COLOR_PURPLE: u32 = 0x9B59B6;
const COLOR_GOLD: u32 = 0xF1C40F;

/// Interaction message flag marking a reply visible only to the caller.
pub const EPHEMERAL_FLAG: u64 = 64;

/// The five global slash commands, in registration payload form.
pub fn command_definitions() -> Value {
    json!([
        { "name": "online", "type": 1, "description": "Start your attendance" },
        { "name": "offline", "type": 1, "description": "Stop your attendance" },
        { "name": "status", "type": 1, "description": "Check your attendance" },
        { "name": "history", "type": 1, "description": "View your recent sessions" },
        { "name": "help", "type": 1, "description": "How to use the attendance bot" }
    ])
}

fn embed(color: u32, description: String) -> Value {
    json!({
        "color": color,
        "description": description,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
}

/// Green confirmation for a successful clock-in.
pub fn online_embed(user_id: &str) -> Value {
    embed(
        COLOR_GREEN,
        format!("🟢 {} is now **ONLINE**", mention(user_id)),
    )
}

/// Red confirmation for a successful clock-out, with both timestamps and
/// the formatted session duration.
pub fn offline_embed(user_id: &str, receipt: &ClockOut) -> Value {
    embed(
        COLOR_RED,
        format!(
            "🔴 {} is now **OFFLINE**\n\n🟢 Online: {}\n🔴 Offline: {}\n⏱ Duration: {}",
            mention(user_id),
            discord_timestamp(receipt.started_at),
            discord_timestamp(receipt.ended_at),
            format_duration(receipt.duration_ms),
        ),
    )
}

/// Blue summary: accumulated total and the online flag.
pub fn status_embed(status: &Status) -> Value {
    json!({
        "color": COLOR_BLUE,
        "title": "📊 Attendance Status",
        "description": format!(
            "Total Time: {}\nCurrently Online: {}",
            format_duration(status.total_ms),
            if status.online { "Yes" } else { "No" },
        ),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
}

/// Purple list of recent sessions, newest first, numbered from 1.
pub fn history_embed(sessions: &[Session]) -> Value {
    let desc = sessions
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "**{}.** 🟢 {} → 🔴 {} | {}",
                i + 1,
                discord_timestamp(s.start),
                discord_timestamp(s.end),
                format_duration(s.duration),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    json!({
        "color": COLOR_PURPLE,
        "title": "🕒 Attendance History",
        "description": desc,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
}

/// Gold usage text covering both command forms.
pub fn help_embed() -> Value {
    json!({
        "color": COLOR_GOLD,
        "title": "📌 Attendance Bot Help",
        "description": "**Commands:**\n\
            `online` or `/online` → Start attendance\n\
            `offline` or `/offline` → Stop attendance\n\
            `/status` → Check your total time\n\
            `/history` → View online-offline timings\n\n\
            **Tip:** Text and slash commands both work!",
    })
}

/// Interaction callback carrying an embed.
pub fn embed_response(embed: Value) -> Value {
    json!({ "type": 4, "data": { "embeds": [embed] } })
}

/// Interaction callback carrying an embed only the caller can see.
pub fn ephemeral_embed_response(embed: Value) -> Value {
    json!({ "type": 4, "data": { "embeds": [embed], "flags": EPHEMERAL_FLAG } })
}

/// Interaction callback carrying plain text only the caller can see.
pub fn ephemeral_text_response(content: &str) -> Value {
    json!({ "type": 4, "data": { "content": content, "flags": EPHEMERAL_FLAG } })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_definitions_cover_all_five() {
        let defs = command_definitions();
        let names: Vec<&str> = defs
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["online", "offline", "status", "history", "help"]);
        for def in defs.as_array().unwrap() {
            assert_eq!(def["type"], 1);
            assert!(!def["description"].as_str().unwrap().is_empty());
        }
    }

    #[test]
    fn test_online_embed_mentions_user() {
        let embed = online_embed("42");
        assert_eq!(embed["color"], COLOR_GREEN);
        assert_eq!(
            embed["description"].as_str().unwrap(),
            "🟢 <@42> is now **ONLINE**"
        );
        assert!(embed["timestamp"].is_string());
    }

    #[test]
    fn test_offline_embed_shows_both_timestamps_and_duration() {
        let receipt = ClockOut {
            started_at: 0,
            ended_at: 5_400_000,
            duration_ms: 5_400_000,
        };
        let desc = offline_embed("42", &receipt)["description"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(desc.contains("🟢 Online: <t:0:t>"));
        assert!(desc.contains("🔴 Offline: <t:5400:t>"));
        assert!(desc.contains("⏱ Duration: 1h 30m"));
    }

    #[test]
    fn test_status_embed_offline_user() {
        let embed = status_embed(&Status {
            total_ms: 0,
            online: false,
        });
        let desc = embed["description"].as_str().unwrap();
        assert!(desc.contains("Total Time: 0h 0m"));
        assert!(desc.contains("Currently Online: No"));
    }

    #[test]
    fn test_history_embed_numbers_from_one() {
        let sessions = vec![
            Session {
                start: 6_000_000,
                end: 6_300_000,
                duration: 300_000,
            },
            Session {
                start: 1_000_000,
                end: 1_060_000,
                duration: 60_000,
            },
        ];
        let desc = history_embed(&sessions)["description"]
            .as_str()
            .unwrap()
            .to_string();
        let lines: Vec<&str> = desc.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("**1.** 🟢 <t:6000:t>"));
        assert!(lines[1].starts_with("**2.** 🟢 <t:1000:t>"));
        assert!(lines[1].ends_with("0h 1m"));
    }

    #[test]
    fn test_reply_envelopes() {
        let reply = embed_response(online_embed("1"));
        assert_eq!(reply["type"], 4);
        assert!(reply["data"].get("flags").is_none());

        let ephemeral = ephemeral_text_response("You are not online.");
        assert_eq!(ephemeral["data"]["flags"], EPHEMERAL_FLAG);
        assert_eq!(ephemeral["data"]["content"], "You are not online.");

        let help = ephemeral_embed_response(help_embed());
        assert_eq!(help["data"]["flags"], EPHEMERAL_FLAG);
    }
}
