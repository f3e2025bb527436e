//! Per-user attendance records.
//!
//! The serialized shape is a plain map of user ID to record, matching the
//! attendance file layout:
//! `{ "<userId>": { "total": int, "start": int|null, "sessions": [...] } }`

use serde::{Deserialize, Serialize};

/// One closed interval between a clock-in and the following clock-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Clock-in timestamp (Unix ms).
    pub start: i64,
    /// Clock-out timestamp (Unix ms). Always `>= start`.
    pub end: i64,
    /// `end - start`, stored redundantly for direct display.
    pub duration: i64,
}

/// Per-user aggregate of total time, the open-session marker, and the
/// closed-session history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Accumulated milliseconds across all closed sessions.
    pub total: i64,
    /// Open-session start (Unix ms). `None` means the user is offline.
    pub start: Option<i64>,
    /// Closed sessions, append-only, insertion order = chronological order.
    #[serde(default)]
    pub sessions: Vec<Session>,
}

impl AttendanceRecord {
    /// Whether the user currently has an open session.
    pub fn is_online(&self) -> bool {
        self.start.is_some()
    }

    /// Sum of closed-session durations. Always equals `total`.
    pub fn session_total(&self) -> i64 {
        self.sessions.iter().map(|s| s.duration).sum()
    }
}
