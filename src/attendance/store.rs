//! Attendance store implementations.
//!
//! The whole user map is serialized to a single JSON file after every
//! mutating transition. Writes go to a temp sibling followed by an atomic
//! rename so an external reader never observes a partial file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::attendance::record::AttendanceRecord;

/// Error types for attendance store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Corrupt attendance file {path}: {message}")]
    Corrupt { path: String, message: String },
}

/// Mapping of user ID to attendance record, plus a persistence contract:
/// after every successful `save()` the durable copy matches memory exactly.
///
/// The trait seam keeps the clock state machine testable without disk I/O
/// and leaves the persistence strategy swappable.
pub trait AttendanceStore {
    /// Fetch a copy of the record for `user_id`, if one exists.
    fn get(&self, user_id: &str) -> Option<AttendanceRecord>;

    /// Replace (or insert) the record for `user_id`.
    fn put(&mut self, user_id: &str, record: AttendanceRecord);

    /// Insert a zero-valued record for `user_id` if absent. No-op otherwise.
    fn ensure_user(&mut self, user_id: &str) {
        if self.get(user_id).is_none() {
            self.put(user_id, AttendanceRecord::default());
        }
    }

    /// Persist the whole mapping.
    fn save(&self) -> Result<(), StoreError>;
}

/// File-backed store. The durable file holds the entire mapping as pretty
/// JSON; every `save()` is a full rewrite.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    users: HashMap<String, AttendanceRecord>,
}

impl FileStore {
    /// Open the store, loading any existing attendance file.
    ///
    /// A missing file yields an empty store. An unreadable or malformed
    /// file is an error; callers are expected to abort startup rather than
    /// proceed with a clobbered empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let users = match fs::read_to_string(&path) {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(StoreError::Io(e)),
        };
        Ok(Self { path, users })
    }

    /// Path of the durable attendance file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of known users.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

impl AttendanceStore for FileStore {
    fn get(&self, user_id: &str) -> Option<AttendanceRecord> {
        self.users.get(user_id).cloned()
    }

    fn put(&mut self, user_id: &str, record: AttendanceRecord) {
        self.users.insert(user_id.to_string(), record);
    }

    fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&self.users)?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json)?;

        // Atomic rename
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

/// In-memory store with no durable backing. `save()` always succeeds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: HashMap<String, AttendanceRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AttendanceStore for MemoryStore {
    fn get(&self, user_id: &str) -> Option<AttendanceRecord> {
        self.users.get(user_id).cloned()
    }

    fn put(&mut self, user_id: &str, record: AttendanceRecord) {
        self.users.insert(user_id.to_string(), record);
    }

    fn save(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
