//! Scanning the checkpoint root.

use super::CheckpointError;
use parking_lot::Mutex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Mutual exclusion over the checkpoint root, shared by the trainer and all
/// workers.
pub type CheckpointLock = Arc<Mutex<()>>;

/// Create a new checkpoint lock.
pub fn checkpoint_lock() -> CheckpointLock {
    Arc::new(Mutex::new(()))
}

/// A published snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointInfo {
    /// Iteration id, the directory name.
    pub iteration: u64,
    /// Path to the snapshot directory.
    pub path: PathBuf,
}

/// Directory of snapshot `iteration` under `root`.
pub fn checkpoint_path(root: &Path, iteration: u64) -> PathBuf {
    root.join(iteration.to_string())
}

/// Iteration ids present under `root`, ascending.
///
/// Only directories whose names parse as non-negative integers count. A
/// missing root is treated as empty.
pub fn list_iterations(root: &Path) -> Result<Vec<u64>, CheckpointError> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut iterations = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(iteration) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<u64>().ok())
        {
            iterations.push(iteration);
        }
    }
    iterations.sort_unstable();
    Ok(iterations)
}

/// Newest snapshot under `root`, if any.
pub fn latest_checkpoint(root: &Path) -> Result<Option<CheckpointInfo>, CheckpointError> {
    Ok(list_iterations(root)?.last().map(|&iteration| CheckpointInfo {
        iteration,
        path: checkpoint_path(root, iteration),
    }))
}
