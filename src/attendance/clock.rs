//! Clock-in/out state machine over an attendance store.
//!
//! Each user is either OFFLINE (`start` unset) or ONLINE (`start` set).
//! Mutating transitions persist the whole store before returning, so a
//! reported success always has a durable counterpart. A failed save rolls
//! the in-memory record back to its pre-transition state.

use crate::attendance::record::{AttendanceRecord, Session};
use crate::attendance::store::{AttendanceStore, StoreError};

/// Number of sessions returned by a history query.
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

/// Error types for clock transitions and queries.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Clock-in while a session is already open.
    #[error("already online")]
    AlreadyOnline,
    /// Clock-out with no open session.
    #[error("not online")]
    NotOnline,
    /// History requested for a user with no closed sessions.
    #[error("no attendance history")]
    NoHistory,
    /// Persistence failed; the transition was rolled back.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Receipt for a successful clock-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockIn {
    pub started_at: i64,
}

/// Receipt for a successful clock-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockOut {
    pub started_at: i64,
    pub ended_at: i64,
    pub duration_ms: i64,
}

/// Point-in-time summary for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub total_ms: i64,
    pub online: bool,
}

/// The attendance state machine. Owns the store; all mutation goes through
/// the two transitions below.
pub struct Clock<S: AttendanceStore> {
    store: S,
}

impl<S: AttendanceStore> Clock<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Open a session for `user_id` at `now`.
    ///
    /// Fails with [`ClockError::AlreadyOnline`] if a session is already
    /// open; the existing `start` keeps the first call's timestamp.
    pub fn clock_in(&mut self, user_id: &str, now: i64) -> Result<ClockIn, ClockError> {
        self.store.ensure_user(user_id);
        let previous = self.store.get(user_id).unwrap_or_default();
        if previous.is_online() {
            return Err(ClockError::AlreadyOnline);
        }

        let mut record = previous.clone();
        record.start = Some(now);
        self.store.put(user_id, record);
        self.persist_or_rollback(user_id, previous)?;

        Ok(ClockIn { started_at: now })
    }

    /// Close the open session for `user_id` at `now`.
    ///
    /// Fails with [`ClockError::NotOnline`] if no session is open; nothing
    /// is appended and `total` is untouched.
    pub fn clock_out(&mut self, user_id: &str, now: i64) -> Result<ClockOut, ClockError> {
        self.store.ensure_user(user_id);
        let previous = self.store.get(user_id).unwrap_or_default();
        let started_at = previous.start.ok_or(ClockError::NotOnline)?;
        let duration = now - started_at;

        let mut record = previous.clone();
        record.sessions.push(Session {
            start: started_at,
            end: now,
            duration,
        });
        record.total += duration;
        record.start = None;
        self.store.put(user_id, record);
        self.persist_or_rollback(user_id, previous)?;

        Ok(ClockOut {
            started_at,
            ended_at: now,
            duration_ms: duration,
        })
    }

    /// Pure read: total accumulated time and the online flag. A user the
    /// store has never seen reads as offline with zero total.
    pub fn status(&self, user_id: &str) -> Status {
        let record = self.store.get(user_id).unwrap_or_default();
        Status {
            total_ms: record.total,
            online: record.is_online(),
        }
    }

    /// Pure read: the most recent `limit` closed sessions, newest first.
    ///
    /// Fails with [`ClockError::NoHistory`] when the user has no closed
    /// sessions, so callers can distinguish "nothing to show" from an
    /// empty page.
    pub fn history(&self, user_id: &str, limit: usize) -> Result<Vec<Session>, ClockError> {
        let record = self.store.get(user_id).unwrap_or_default();
        if record.sessions.is_empty() {
            return Err(ClockError::NoHistory);
        }
        let skip = record.sessions.len().saturating_sub(limit);
        Ok(record.sessions[skip..].iter().rev().copied().collect())
    }

    /// Save the store; on failure restore `previous` so memory and disk
    /// stay consistent and the caller never reports a lost transition.
    fn persist_or_rollback(
        &mut self,
        user_id: &str,
        previous: AttendanceRecord,
    ) -> Result<(), ClockError> {
        if let Err(err) = self.store.save() {
            self.store.put(user_id, previous);
            return Err(ClockError::Store(err));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::store::MemoryStore;

    fn clock() -> Clock<MemoryStore> {
        Clock::new(MemoryStore::new())
    }

    fn assert_total_invariant<S: AttendanceStore>(clock: &Clock<S>, user_id: &str) {
        let record = clock.store().get(user_id).unwrap();
        assert_eq!(record.total, record.session_total());
    }

    #[test]
    fn test_clock_in_then_out_records_session() {
        let mut clock = clock();
        let receipt = clock.clock_in("a", 0).unwrap();
        assert_eq!(receipt.started_at, 0);

        // 90 minutes online.
        let out = clock.clock_out("a", 5_400_000).unwrap();
        assert_eq!(out.started_at, 0);
        assert_eq!(out.ended_at, 5_400_000);
        assert_eq!(out.duration_ms, 5_400_000);

        let record = clock.store().get("a").unwrap();
        assert_eq!(record.total, 5_400_000);
        assert!(!record.is_online());
        assert_eq!(
            record.sessions,
            vec![Session {
                start: 0,
                end: 5_400_000,
                duration: 5_400_000
            }]
        );
        assert_total_invariant(&clock, "a");
    }

    #[test]
    fn test_double_clock_in_keeps_first_timestamp() {
        let mut clock = clock();
        clock.clock_in("c", 100).unwrap();

        let err = clock.clock_in("c", 200).unwrap_err();
        assert!(matches!(err, ClockError::AlreadyOnline));
        assert_eq!(clock.store().get("c").unwrap().start, Some(100));
    }

    #[test]
    fn test_clock_out_while_offline_is_a_reported_no_op() {
        let mut clock = clock();
        let err = clock.clock_out("a", 500).unwrap_err();
        assert!(matches!(err, ClockError::NotOnline));

        let record = clock.store().get("a").unwrap();
        assert_eq!(record.total, 0);
        assert!(record.sessions.is_empty());
    }

    #[test]
    fn test_total_matches_session_sum_over_many_transitions() {
        let mut clock = clock();
        let mut now = 0;
        for len in [60_000, 3_600_000, 1, 0, 90_000] {
            clock.clock_in("a", now).unwrap();
            now += len;
            clock.clock_out("a", now).unwrap();
            now += 10_000;
            assert_total_invariant(&clock, "a");
        }
        let record = clock.store().get("a").unwrap();
        assert_eq!(record.sessions.len(), 5);
        assert_eq!(record.total, 3_750_001);
    }

    #[test]
    fn test_status_for_unknown_user() {
        let clock = clock();
        let status = clock.status("b");
        assert_eq!(status.total_ms, 0);
        assert!(!status.online);
    }

    #[test]
    fn test_status_reflects_open_session() {
        let mut clock = clock();
        clock.clock_in("a", 10).unwrap();
        assert!(clock.status("a").online);
        // No total accrues until clock-out.
        assert_eq!(clock.status("a").total_ms, 0);
    }

    #[test]
    fn test_history_newest_first_and_capped() {
        let mut clock = clock();
        for i in 0..7i64 {
            let start = i * 1000;
            clock.clock_in("a", start).unwrap();
            clock.clock_out("a", start + 500).unwrap();
        }

        let sessions = clock.history("a", DEFAULT_HISTORY_LIMIT).unwrap();
        assert_eq!(sessions.len(), 5);
        // Newest first: starts 6000, 5000, 4000, 3000, 2000.
        let starts: Vec<i64> = sessions.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![6000, 5000, 4000, 3000, 2000]);
        for s in &sessions {
            assert!(s.end >= s.start);
        }
    }

    #[test]
    fn test_history_empty_is_distinct_from_success() {
        let mut clock = clock();
        let err = clock.history("a", 5).unwrap_err();
        assert!(matches!(err, ClockError::NoHistory));

        // An open session alone is not history.
        clock.clock_in("a", 0).unwrap();
        assert!(matches!(
            clock.history("a", 5),
            Err(ClockError::NoHistory)
        ));
    }

    /// Store whose `save()` always fails, for the persistence contract.
    struct FailingStore {
        inner: MemoryStore,
    }

    impl AttendanceStore for FailingStore {
        fn get(&self, user_id: &str) -> Option<crate::attendance::AttendanceRecord> {
            self.inner.get(user_id)
        }

        fn put(&mut self, user_id: &str, record: crate::attendance::AttendanceRecord) {
            self.inner.put(user_id, record);
        }

        fn save(&self) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk gone")))
        }
    }

    #[test]
    fn test_failed_save_rolls_back_clock_in() {
        let mut clock = Clock::new(FailingStore {
            inner: MemoryStore::new(),
        });

        let err = clock.clock_in("a", 100).unwrap_err();
        assert!(matches!(err, ClockError::Store(_)));
        assert!(!clock.store().get("a").unwrap().is_online());
    }

    #[test]
    fn test_failed_save_rolls_back_clock_out() {
        let mut inner = MemoryStore::new();
        inner.put(
            "a",
            crate::attendance::AttendanceRecord {
                total: 0,
                start: Some(100),
                sessions: Vec::new(),
            },
        );
        let mut clock = Clock::new(FailingStore { inner });

        let err = clock.clock_out("a", 200).unwrap_err();
        assert!(matches!(err, ClockError::Store(_)));

        let record = clock.store().get("a").unwrap();
        assert_eq!(record.start, Some(100));
        assert_eq!(record.total, 0);
        assert!(record.sessions.is_empty());
    }
}
