//! # Rollout Orchestrator
//!
//! Actor side of a learner/actor reinforcement-learning system: a pool of
//! rollout workers, each driving its own environment with its own policy,
//! publishing experience and diagnostic summaries to buffers drained by an
//! external trainer.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        RolloutOrchestrator                           │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  Thread train_env0    Thread train_env1    Thread eval_env0          │
//! │  ┌──────────────┐     ┌──────────────┐     ┌──────────────┐          │
//! │  │ env + policy │     │ env + policy │     │ env + policy │          │
//! │  │ ThrottleGate │     │ ThrottleGate │     │ (no throttle)│          │
//! │  │ Synchronizer │     │ Synchronizer │     │ Synchronizer │          │
//! │  └──────┬───────┘     └──────┬───────┘     └──────┬───────┘          │
//! │         │ whole episodes     │                    │                  │
//! │         └────────────────────┼────────────────────┘                  │
//! │                              ▼                                       │
//! │  ┌─────────────────────────────────┐   ┌──────────────────────────┐  │
//! │  │ SharedBuffers                   │   │ SharedSignals            │  │
//! │  │ transitions + summary mailbox   │   │ kill, global step,       │  │
//! │  └───────────────┬─────────────────┘   │ replay ratio, eval flags │  │
//! │                  ▼                     └────────────▲─────────────┘  │
//! │         ┌─────────────────┐                         │                │
//! │         │ external trainer│─────────────────────────┘                │
//! │         │                 │── publishes ──> <weights_dir>/<iter>/    │
//! │         └─────────────────┘                                          │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rollout_orchestrator::{OrchestratorConfig, RolloutOrchestrator};
//!
//! let config = OrchestratorConfig::new()
//!     .with_train_envs(8)
//!     .with_eval_envs(1)
//!     .with_weights_dir("./weights")
//!     .with_target_replay_ratio(4.0)
//!     .with_training_iterations(10_000);
//!
//! let mut orchestrator =
//!     RolloutOrchestrator::new(config, policy_factory, train_envs, eval_envs, generator)?;
//! let handles = orchestrator.spin_up()?;
//!
//! loop {
//!     let batch = orchestrator.drain_transitions();
//!     // train on batch, publish weights, update replay ratio ...
//! }
//!
//! orchestrator.kill();
//! orchestrator.join_all(handles);
//! ```

pub mod actors;
pub mod agent;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod environment;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod rollout;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use actors::{
    GateOutcome, RolloutWorker, ThrottleGate, WorkerContext, WorkerExit, WorkerHandle,
    WorkerLauncher, WorkerPool, WorkerRecord,
};
pub use agent::{Device, Policy, PolicyFactory};
pub use checkpoint::{
    CheckpointError, CheckpointLock, CheckpointPublisher, CheckpointSynchronizer,
    PublisherConfig, SyncConfig, SyncStatus,
};
pub use config::{ConfigError, OrchestratorConfig};
pub use crate::core::{
    MailboxStats, SharedBuffers, SharedSignals, SignalHandle, StoredTransition, WorkerId,
    WorkerRole,
};
pub use environment::{EnvFactory, Environment, LaunchedEnv};
pub use error::{AgentError, EnvError, GeneratorError, PoolError, SpinUpError, WorkerError};
pub use metrics::{RolloutTotals, WorkerStats};
pub use orchestrator::RolloutOrchestrator;
pub use rollout::{EpisodeGenerator, EpisodeRequest, RolloutEpisode};
