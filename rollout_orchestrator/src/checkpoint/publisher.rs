//! Trainer-side checkpoint publishing.
//!
//! Writes each snapshot into its own iteration directory while holding the
//! checkpoint lock, so workers never list a directory that is still being
//! created by this process, and prunes old snapshots.

use super::directory::{checkpoint_path, list_iterations, CheckpointInfo, CheckpointLock};
use super::CheckpointError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Configuration for the publisher.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Checkpoint root shared with the workers.
    pub checkpoint_dir: PathBuf,
    /// Number of recent snapshots to keep (0 = keep all).
    ///
    /// Evaluation workers wait for two snapshots to exist, so any non-zero
    /// value below 2 is raised to 2.
    pub keep_last_n: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from("./weights"),
            keep_last_n: 0,
        }
    }
}

impl PublisherConfig {
    /// Create a new config with specified checkpoint directory.
    pub fn new(checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            ..Default::default()
        }
    }

    /// Set the number of snapshots to keep.
    pub fn with_keep_last_n(mut self, n: usize) -> Self {
        self.keep_last_n = n;
        self
    }

    fn effective_keep(&self) -> usize {
        match self.keep_last_n {
            0 => 0,
            n => n.max(2),
        }
    }
}

/// Publishes numbered policy snapshots for the workers to pick up.
pub struct CheckpointPublisher {
    config: PublisherConfig,
    lock: CheckpointLock,
}

impl CheckpointPublisher {
    /// Create a new publisher.
    ///
    /// Creates the checkpoint directory if it doesn't exist.
    pub fn new(config: PublisherConfig, lock: CheckpointLock) -> Result<Self, CheckpointError> {
        fs::create_dir_all(&config.checkpoint_dir)?;
        Ok(Self { config, lock })
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Publish the snapshot for `iteration`.
    ///
    /// `write` receives the freshly created snapshot directory. Iteration ids
    /// must strictly increase; if `write` fails the directory is removed.
    pub fn publish<F>(&self, iteration: u64, write: F) -> Result<CheckpointInfo, CheckpointError>
    where
        F: FnOnce(&Path) -> io::Result<()>,
    {
        let root = &self.config.checkpoint_dir;
        let _guard = self.lock.lock();

        if let Some(&latest) = list_iterations(root)?.last() {
            if iteration <= latest {
                return Err(CheckpointError::NotNewer { iteration, latest });
            }
        }

        let path = checkpoint_path(root, iteration);
        fs::create_dir(&path)?;
        if let Err(e) = write(&path) {
            let _ = fs::remove_dir_all(&path);
            return Err(e.into());
        }
        log::info!("Published checkpoint {}", path.display());

        self.cleanup_old_checkpoints()?;
        Ok(CheckpointInfo { iteration, path })
    }

    /// List all snapshots, oldest first.
    pub fn list_checkpoints(&self) -> Result<Vec<CheckpointInfo>, CheckpointError> {
        let root = &self.config.checkpoint_dir;
        Ok(list_iterations(root)?
            .into_iter()
            .map(|iteration| CheckpointInfo {
                iteration,
                path: checkpoint_path(root, iteration),
            })
            .collect())
    }

    /// Cleanup old snapshots, keeping only the last N. Caller holds the lock.
    fn cleanup_old_checkpoints(&self) -> Result<(), CheckpointError> {
        let keep = self.config.effective_keep();
        if keep == 0 {
            return Ok(());
        }

        let iterations = list_iterations(&self.config.checkpoint_dir)?;
        let excess = iterations.len().saturating_sub(keep);
        for &iteration in &iterations[..excess] {
            let path = checkpoint_path(&self.config.checkpoint_dir, iteration);
            if let Err(e) = fs::remove_dir_all(&path) {
                log::warn!("Failed to prune checkpoint {}: {e}", path.display());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::checkpoint_lock;
    use tempfile::tempdir;

    fn write_weights(dir: &Path) -> io::Result<()> {
        fs::write(dir.join("weights.bin"), [1u8, 2, 3])
    }

    #[test]
    fn test_publisher_config() {
        let config = PublisherConfig::new("./test_weights").with_keep_last_n(3);
        assert_eq!(config.checkpoint_dir, PathBuf::from("./test_weights"));
        assert_eq!(config.keep_last_n, 3);
        assert_eq!(config.effective_keep(), 3);
        assert_eq!(PublisherConfig::default().with_keep_last_n(1).effective_keep(), 2);
        assert_eq!(PublisherConfig::default().effective_keep(), 0);
    }

    #[test]
    fn test_checkpoint_dir_creation() {
        let dir = tempdir().unwrap();
        let subdir = dir.path().join("nested/weights");
        let _publisher =
            CheckpointPublisher::new(PublisherConfig::new(&subdir), checkpoint_lock()).unwrap();
        assert!(subdir.exists());
    }

    #[test]
    fn test_publish_writes_numbered_directory() {
        let dir = tempdir().unwrap();
        let publisher =
            CheckpointPublisher::new(PublisherConfig::new(dir.path()), checkpoint_lock()).unwrap();

        let info = publisher.publish(500, write_weights).unwrap();
        assert_eq!(info.iteration, 500);
        assert_eq!(info.path, dir.path().join("500"));
        assert!(info.path.join("weights.bin").exists());
    }

    #[test]
    fn test_publish_rejects_non_increasing_iteration() {
        let dir = tempdir().unwrap();
        let publisher =
            CheckpointPublisher::new(PublisherConfig::new(dir.path()), checkpoint_lock()).unwrap();

        publisher.publish(10, write_weights).unwrap();
        let err = publisher.publish(10, write_weights).unwrap_err();
        assert!(matches!(
            err,
            CheckpointError::NotNewer {
                iteration: 10,
                latest: 10
            }
        ));
        assert!(publisher.publish(5, write_weights).is_err());
    }

    #[test]
    fn test_failed_write_leaves_no_snapshot() {
        let dir = tempdir().unwrap();
        let publisher =
            CheckpointPublisher::new(PublisherConfig::new(dir.path()), checkpoint_lock()).unwrap();

        let result = publisher.publish(1, |_| Err(io::Error::new(io::ErrorKind::Other, "disk full")));
        assert!(matches!(result, Err(CheckpointError::Io(_))));
        assert!(publisher.list_checkpoints().unwrap().is_empty());
    }

    #[test]
    fn test_keeps_last_n() {
        let dir = tempdir().unwrap();
        let publisher = CheckpointPublisher::new(
            PublisherConfig::new(dir.path()).with_keep_last_n(2),
            checkpoint_lock(),
        )
        .unwrap();

        for iteration in [0, 100, 200, 300] {
            publisher.publish(iteration, write_weights).unwrap();
        }
        let kept: Vec<u64> = publisher
            .list_checkpoints()
            .unwrap()
            .iter()
            .map(|c| c.iteration)
            .collect();
        assert_eq!(kept, vec![200, 300]);
    }
}
