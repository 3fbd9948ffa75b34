//! Per-worker rollout statistics.

use crate::core::{WorkerId, WorkerRole};

/// Statistics reported by a worker.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerStats {
    pub worker: WorkerId,
    pub role: WorkerRole,
    /// Episodes flushed into the shared buffers.
    pub episodes: usize,
    /// Transitions flushed into the shared buffers.
    pub transitions: usize,
    /// Polls spent waiting on the throttle gate.
    pub throttle_waits: usize,
    /// Checkpoint iteration currently loaded.
    pub checkpoint: Option<u64>,
}

impl WorkerStats {
    pub fn new(worker: WorkerId, role: WorkerRole) -> Self {
        Self {
            worker,
            role,
            episodes: 0,
            transitions: 0,
            throttle_waits: 0,
            checkpoint: None,
        }
    }

    /// Record a flushed episode of `transitions` steps.
    pub fn record_episode(&mut self, transitions: usize) {
        self.episodes += 1;
        self.transitions += transitions;
    }

    /// Average flushed episode length.
    pub fn avg_episode_length(&self) -> f32 {
        if self.episodes == 0 {
            0.0
        } else {
            self.transitions as f32 / self.episodes as f32
        }
    }
}

/// Totals across the latest report of several workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RolloutTotals {
    pub workers: usize,
    pub episodes: usize,
    pub transitions: usize,
    pub throttle_waits: usize,
}

impl RolloutTotals {
    pub fn from_stats<'a>(stats: impl IntoIterator<Item = &'a WorkerStats>) -> Self {
        stats.into_iter().fold(Self::default(), |acc, s| Self {
            workers: acc.workers + 1,
            episodes: acc.episodes + s.episodes,
            transitions: acc.transitions + s.transitions,
            throttle_waits: acc.throttle_waits + s.throttle_waits,
        })
    }
}
