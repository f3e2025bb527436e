//! Attendance tracking core.
//!
//! Record/session types, the store abstraction with its file-backed
//! implementation, the clock-in/out state machine, and display formatting.

pub mod clock;
pub mod format;
pub mod record;
pub mod store;

pub use clock::{Clock, ClockError, ClockIn, ClockOut, Status, DEFAULT_HISTORY_LIMIT};
pub use record::{AttendanceRecord, Session};
pub use store::{AttendanceStore, FileStore, MemoryStore, StoreError};

/// Current Unix time in milliseconds.
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
