//! Display helpers for durations, timestamps, and mentions.

const HOUR_MS: i64 = 3_600_000;
const MINUTE_MS: i64 = 60_000;

/// Format a millisecond duration as whole hours and minutes, e.g. "1h 30m".
/// Both components use floor division; seconds are discarded, never rounded.
pub fn format_duration(ms: i64) -> String {
    let hours = ms / HOUR_MS;
    let minutes = (ms % HOUR_MS) / MINUTE_MS;
    format!("{}h {}m", hours, minutes)
}

/// Discord short-time markup for a millisecond timestamp.
pub fn discord_timestamp(ms: i64) -> String {
    format!("<t:{}:t>", ms / 1000)
}

/// Discord user mention.
pub fn mention(user_id: &str) -> String {
    format!("<@{}>", user_id)
}
