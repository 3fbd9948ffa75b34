//! Worker-side checkpoint following.
//!
//! Each worker owns one synchronizer. It remembers the last iteration it
//! loaded and only reloads when a newer snapshot has been published.

use super::directory::{checkpoint_path, list_iterations, CheckpointLock};
use super::CheckpointError;
use crate::agent::Policy;
use crate::core::{SignalHandle, WorkerId};
use crate::error::AgentError;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Configuration for checkpoint following.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Checkpoint root. `None` disables weight loading.
    pub weights_dir: Option<PathBuf>,
    /// Wait between polls while no snapshot exists.
    pub poll_interval: Duration,
    /// Wait before the single retry of a not-found load.
    pub retry_delay: Duration,
    /// Wait between polls for the first-checkpoint barrier.
    pub first_checkpoint_poll: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            weights_dir: None,
            poll_interval: Duration::from_secs(1),
            retry_delay: Duration::from_secs(1),
            first_checkpoint_poll: Duration::from_secs(10),
        }
    }
}

impl SyncConfig {
    /// Follow checkpoints published under `weights_dir`.
    pub fn new(weights_dir: impl Into<PathBuf>) -> Self {
        Self {
            weights_dir: Some(weights_dir.into()),
            ..Default::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_first_checkpoint_poll(mut self, interval: Duration) -> Self {
        self.first_checkpoint_poll = interval;
        self
    }
}

/// Result of a successful [`CheckpointSynchronizer::sync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Weights of this iteration were loaded.
    Loaded(u64),
    /// The newest snapshot was already loaded.
    Unchanged(u64),
    /// No weights directory configured.
    Disabled,
}

/// Loads the newest published checkpoint into a worker's policy.
pub struct CheckpointSynchronizer {
    config: SyncConfig,
    lock: CheckpointLock,
    signals: SignalHandle,
    worker: WorkerId,
    last_loaded: Option<u64>,
}

impl CheckpointSynchronizer {
    /// Create a synchronizer starting from `last_loaded`.
    pub fn new(
        config: SyncConfig,
        lock: CheckpointLock,
        signals: SignalHandle,
        worker: WorkerId,
        last_loaded: Option<u64>,
    ) -> Self {
        Self {
            config,
            lock,
            signals,
            worker,
            last_loaded,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Iteration most recently loaded into the policy.
    pub fn last_loaded(&self) -> Option<u64> {
        self.last_loaded
    }

    /// Block until at least one snapshot exists, then make sure the newest
    /// one is loaded into `policy`.
    ///
    /// A not-found load (snapshot listed but not fully written) is retried
    /// exactly once after `retry_delay`. The checkpoint lock is held across
    /// listing and loading but released while waiting for a first snapshot.
    pub fn sync<P: Policy>(&mut self, policy: &mut P) -> Result<SyncStatus, CheckpointError> {
        let Some(root) = self.config.weights_dir.clone() else {
            log::info!("'weights_dir' was None, so not loading weights.");
            return Ok(SyncStatus::Disabled);
        };

        loop {
            if self.signals.is_killed() {
                return Err(CheckpointError::Cancelled);
            }

            {
                let _guard = self.lock.lock();
                if let Some(&latest) = list_iterations(&root)?.last() {
                    let previous = self.last_loaded;
                    return match previous {
                        Some(loaded) if loaded >= latest => {
                            if loaded > latest {
                                log::warn!(
                                    "{}: newest checkpoint {latest} is older than loaded {loaded}",
                                    self.worker
                                );
                            }
                            Ok(SyncStatus::Unchanged(loaded))
                        }
                        _ => {
                            let path = checkpoint_path(&root, latest);
                            self.load_with_retry(policy, &path)?;
                            self.last_loaded = Some(latest);
                            log::info!("Agent {}: Loaded weights: {}", self.worker, path.display());
                            Ok(SyncStatus::Loaded(latest))
                        }
                    };
                }
            }

            log::debug!("{}: Waiting for weights to become available.", self.worker);
            thread::sleep(self.config.poll_interval);
        }
    }

    /// Whether checkpoints remain that this evaluation worker has not yet
    /// evaluated.
    ///
    /// Blocks until at least two snapshots exist. Returns false only when
    /// the newest snapshot is the final one (`training_iterations`) and it
    /// has already been loaded.
    pub fn has_unevaluated(&self, training_iterations: u64) -> Result<bool, CheckpointError> {
        let root = self
            .config
            .weights_dir
            .as_deref()
            .ok_or(CheckpointError::NotConfigured)?;

        let latest = loop {
            if self.signals.is_killed() {
                return Err(CheckpointError::Cancelled);
            }
            let iterations = list_iterations(root)?;
            if iterations.len() > 1 {
                break iterations[iterations.len() - 1];
            }
            log::info!("{}: Waiting for first checkpoint.", self.worker);
            thread::sleep(self.config.first_checkpoint_poll);
        };

        let finished = self.last_loaded == Some(latest) && latest == training_iterations;
        Ok(!finished)
    }

    fn load_with_retry<P: Policy>(&self, policy: &mut P, path: &Path) -> Result<(), CheckpointError> {
        let load_error = |source: AgentError| CheckpointError::Load {
            path: path.to_path_buf(),
            source,
        };

        match policy.load_weights(path) {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                log::warn!(
                    "{}: {} not fully written yet, retrying once",
                    self.worker,
                    path.display()
                );
                thread::sleep(self.config.retry_delay);
                policy.load_weights(path).map_err(load_error)
            }
            Err(e) => Err(load_error(e)),
        }
    }
}
