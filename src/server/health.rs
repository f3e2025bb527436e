//! Storage health checks backing the readiness probe.

use std::path::Path;

/// Touch + remove a temp file to verify the state directory is writable.
/// A store that cannot persist transitions must not report ready.
pub fn check_storage_writable(state_dir: &Path) -> bool {
    let probe = state_dir.join(".health_probe");
    match std::fs::File::create(&probe) {
        Ok(_) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}
