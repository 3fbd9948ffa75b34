//! Error taxonomy for rollout workers and the pool.
//!
//! - Transient I/O races on checkpoints are retried inside the
//!   [`CheckpointSynchronizer`](crate::checkpoint::CheckpointSynchronizer)
//!   and only surface here once the retry also failed.
//! - [`GeneratorError::EpisodeComplete`] is a soft episode boundary and is
//!   never propagated out of a worker.
//! - Everything else is worker-fatal and ends the worker with a
//!   [`WorkerError`].
//! - Observing the kill switch is not an error; workers exit with
//!   [`WorkerExit::Killed`](crate::actors::WorkerExit::Killed).

use crate::actors::WorkerHandle;
use crate::checkpoint::CheckpointError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by a policy.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Weights are missing or incomplete at the given path.
    #[error("weights not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to build policy: {0}")]
    Build(String),
    #[error("failed to load weights from {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },
}

impl AgentError {
    /// Whether this is the "snapshot not fully written yet" race.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Failures reported by an environment.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("failed to launch environment: {0}")]
    Launch(String),
    #[error("environment step failed: {0}")]
    Step(String),
}

/// Outcome of pulling a transition that is not a transition.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// Soft end-of-episode signal; ends the episode normally.
    #[error("episode complete")]
    EpisodeComplete,
    #[error("episode generation failed: {0}")]
    Failed(String),
    #[error(transparent)]
    Env(#[from] EnvError),
    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl GeneratorError {
    #[inline]
    pub fn is_episode_complete(&self) -> bool {
        matches!(self, Self::EpisodeComplete)
    }
}

/// Worker-fatal errors. A worker returning one of these exited abnormally.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("policy error: {0}")]
    Agent(#[from] AgentError),
    #[error("environment error: {0}")]
    Env(#[from] EnvError),
    #[error("rollout error: {0}")]
    Generator(#[from] GeneratorError),
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("worker {worker} panicked: {message}")]
    Panicked { worker: String, message: String },
}

/// Errors from the worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("no worker named {0} was ever spun up")]
    UnknownWorker(String),
    #[error("worker {0} is already registered; use restart")]
    DuplicateWorker(String),
    #[error("failed to spawn worker {worker}: {source}")]
    Spawn {
        worker: String,
        #[source]
        source: io::Error,
    },
}

/// A spin-up that stopped partway.
///
/// `started` holds the workers that were already running when the launch
/// failed, so the caller can still kill and join them.
#[derive(Debug, Error)]
#[error("spin-up stopped after {} workers: {source}", started.len())]
pub struct SpinUpError {
    pub started: Vec<WorkerHandle>,
    #[source]
    pub source: PoolError,
}

impl From<PoolError> for SpinUpError {
    fn from(source: PoolError) -> Self {
        Self {
            started: Vec::new(),
            source,
        }
    }
}
