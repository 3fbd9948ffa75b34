//! Orchestrator facade.
//!
//! [`RolloutOrchestrator`] is the single construction point: it validates
//! the configuration, creates the shared signals, shared buffers and
//! checkpoint lock, and hands them to every worker it spins up. The trainer
//! talks to the running system only through the accessors here.

use crate::actors::{WorkerContext, WorkerExit, WorkerHandle, WorkerPool};
use crate::agent::{Policy, PolicyFactory};
use crate::checkpoint::{
    checkpoint_lock, CheckpointError, CheckpointLock, CheckpointPublisher, PublisherConfig,
};
use crate::config::{ConfigError, OrchestratorConfig};
use crate::core::{
    shared_buffers, shared_signals, SignalHandle, SharedRolloutBuffers, StoredTransition,
    WorkerId, WorkerRole,
};
use crate::environment::{EnvFactory, Environment};
use crate::error::{PoolError, SpinUpError, WorkerError};
use crate::rollout::EpisodeGenerator;
use std::sync::Arc;

/// Owns the shared state and the worker pool.
pub struct RolloutOrchestrator<P, E, G>
where
    P: Policy,
    G: EpisodeGenerator<E, P>,
{
    ctx: Arc<WorkerContext<P, E, G>>,
    pool: WorkerPool,
}

impl<P, E, G> RolloutOrchestrator<P, E, G>
where
    P: Policy + 'static,
    E: Environment + 'static,
    G: EpisodeGenerator<E, P> + 'static,
{
    /// Validate `config` and wire up the shared state.
    ///
    /// No worker is started until one of the `spin_up` methods is called.
    pub fn new(
        config: OrchestratorConfig,
        policy_factory: impl PolicyFactory<P> + 'static,
        train_env_factory: impl EnvFactory<E> + 'static,
        eval_env_factory: impl EnvFactory<E> + 'static,
        generator: G,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let ctx = Arc::new(WorkerContext {
            signals: shared_signals(config.target_replay_ratio),
            config: Arc::new(config),
            buffers: shared_buffers(),
            checkpoint_lock: checkpoint_lock(),
            policy_factory: Arc::new(policy_factory),
            train_env_factory: Arc::new(train_env_factory),
            eval_env_factory: Arc::new(eval_env_factory),
            generator: Arc::new(generator),
        });
        let pool = WorkerPool::new(ctx.clone());
        Ok(Self { ctx, pool })
    }

    /// Start `train_envs` training workers.
    pub fn spin_up_train(&mut self) -> Result<Vec<WorkerHandle>, SpinUpError> {
        let config = Arc::clone(&self.ctx.config);
        self.pool
            .spin_up(&config.train_prefix, config.train_envs, WorkerRole::Train)
    }

    /// Start `eval_envs` evaluation workers.
    pub fn spin_up_eval(&mut self) -> Result<Vec<WorkerHandle>, SpinUpError> {
        let config = Arc::clone(&self.ctx.config);
        self.pool
            .spin_up(&config.eval_prefix, config.eval_envs, WorkerRole::Eval)
    }

    /// Start every configured worker, training workers first.
    ///
    /// On failure the error carries every worker already started.
    pub fn spin_up(&mut self) -> Result<Vec<WorkerHandle>, SpinUpError> {
        let mut handles = self.spin_up_train()?;
        match self.spin_up_eval() {
            Ok(eval) => {
                handles.extend(eval);
                Ok(handles)
            }
            Err(mut e) => {
                handles.append(&mut e.started);
                e.started = handles;
                Err(e)
            }
        }
    }

    /// Re-launch a registered worker with its recorded role.
    pub fn restart(&mut self, id: &WorkerId) -> Result<WorkerHandle, PoolError> {
        self.pool.restart(id)
    }

    /// Wait for one worker, recording a failure on abnormal exit.
    pub fn join(&mut self, handle: WorkerHandle) -> Result<WorkerExit, WorkerError> {
        self.pool.join(handle)
    }

    pub fn join_all(
        &mut self,
        handles: Vec<WorkerHandle>,
    ) -> Vec<(WorkerId, Result<WorkerExit, WorkerError>)> {
        self.pool.join_all(handles)
    }

    /// Ask every worker to stop. Workers notice at their next transition,
    /// throttle poll or checkpoint poll.
    pub fn kill(&self) {
        log::info!("Kill requested for all rollout workers");
        self.ctx.signals.kill();
    }

    pub fn is_killed(&self) -> bool {
        self.ctx.signals.is_killed()
    }

    /// Trainer-side publisher sharing the workers' checkpoint lock.
    pub fn publisher(&self, keep_last_n: usize) -> Result<CheckpointPublisher, CheckpointError> {
        let root = self
            .ctx
            .config
            .weights_dir
            .clone()
            .ok_or(CheckpointError::NotConfigured)?;
        CheckpointPublisher::new(
            PublisherConfig::new(root).with_keep_last_n(keep_last_n),
            self.checkpoint_lock(),
        )
    }

    /// Take every pending transition.
    pub fn drain_transitions(&self) -> Vec<StoredTransition<G::Transition>> {
        self.ctx.buffers.drain_transitions()
    }

    /// Empty the summary mailbox so workers can refill it.
    pub fn drain_summaries(&self) -> Vec<P::Summary> {
        self.ctx.buffers.drain_summaries()
    }

    /// Advance the global step by `steps`, returning the new value.
    pub fn advance_global_step(&self, steps: i64) -> i64 {
        self.ctx.signals.advance_global_step(steps)
    }

    pub fn set_current_replay_ratio(&self, ratio: f64) {
        self.ctx.signals.set_current_replay_ratio(ratio);
    }

    /// Consume the eval-report flag.
    pub fn take_eval_report(&self) -> bool {
        self.ctx.signals.take_eval_report()
    }

    pub fn num_eval_episodes(&self) -> u64 {
        self.ctx.signals.num_eval_episodes()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.ctx.config
    }

    pub fn signals(&self) -> SignalHandle {
        Arc::clone(&self.ctx.signals)
    }

    pub fn buffers(&self) -> SharedRolloutBuffers<G::Transition, P::Summary> {
        Arc::clone(&self.ctx.buffers)
    }

    pub fn checkpoint_lock(&self) -> CheckpointLock {
        Arc::clone(&self.ctx.checkpoint_lock)
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}
