//! Rollout worker loop.
//!
//! A worker runs in its own named thread and owns one environment and one
//! policy, both constructed inside that thread:
//!
//! ```text
//! Initializing ──> RunningEpisode ──> Flushing ──┐
//!                      ▲                          │ next episode
//!                      └──────────────────────────┘
//!                      │ kill / fatal error
//!                      v
//!                  Terminated  (environment shut down on every path)
//! ```
//!
//! Each produced transition passes the kill check and the throttle gate
//! before it is kept. Transitions are buffered per episode and published to
//! the shared buffers in one locked append, so an episode that is
//! killed, fails or ends early leaves nothing behind.

use super::throttle::{GateOutcome, ThrottleGate};
use crate::agent::{Policy, PolicyFactory};
use crate::checkpoint::{CheckpointError, CheckpointLock, CheckpointSynchronizer, SyncStatus};
use crate::config::OrchestratorConfig;
use crate::core::{SharedRolloutBuffers, SignalHandle, WorkerId, WorkerRole};
use crate::environment::{EnvFactory, Environment, LaunchedEnv};
use crate::error::{PoolError, WorkerError};
use crate::metrics::WorkerStats;
use crate::rollout::{EpisodeGenerator, EpisodeRequest, RolloutEpisode};
use crossbeam_channel::{Receiver, Sender};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;

/// How a worker finished when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// All episodes (train) or all checkpoints (eval) were processed.
    Completed,
    /// The kill switch was observed.
    Killed,
}

/// Handle for a spawned worker thread.
pub struct WorkerHandle {
    pub id: WorkerId,
    pub role: WorkerRole,
    /// Thread handle; the thread's result is the worker's exit status.
    pub thread: JoinHandle<Result<WorkerExit, WorkerError>>,
    /// Channel to receive stats from the worker.
    pub stats_rx: Receiver<WorkerStats>,
}

impl WorkerHandle {
    pub fn new(
        id: WorkerId,
        role: WorkerRole,
        thread: JoinHandle<Result<WorkerExit, WorkerError>>,
        stats_rx: Receiver<WorkerStats>,
    ) -> Self {
        Self {
            id,
            role,
            thread,
            stats_rx,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Get the oldest unread stats report (non-blocking).
    pub fn get_stats(&self) -> Option<WorkerStats> {
        self.stats_rx.try_recv().ok()
    }

    /// Drain pending reports and return the newest one (non-blocking).
    pub fn latest_stats(&self) -> Option<WorkerStats> {
        self.stats_rx.try_iter().last()
    }

    /// Wait for the worker to finish. A panic becomes [`WorkerError::Panicked`].
    pub fn join(self) -> Result<WorkerExit, WorkerError> {
        let Self { id, thread, .. } = self;
        match thread.join() {
            Ok(result) => result,
            Err(payload) => Err(WorkerError::Panicked {
                worker: id.to_string(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

impl fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("finished", &self.is_finished())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

/// Everything a worker shares with the rest of the system.
pub struct WorkerContext<P, E, G>
where
    P: Policy,
    G: EpisodeGenerator<E, P>,
{
    pub config: Arc<OrchestratorConfig>,
    pub signals: SignalHandle,
    pub buffers: SharedRolloutBuffers<G::Transition, P::Summary>,
    pub checkpoint_lock: CheckpointLock,
    pub policy_factory: Arc<dyn PolicyFactory<P>>,
    pub train_env_factory: Arc<dyn EnvFactory<E>>,
    pub eval_env_factory: Arc<dyn EnvFactory<E>>,
    pub generator: Arc<G>,
}

impl<P, E, G> Clone for WorkerContext<P, E, G>
where
    P: Policy,
    G: EpisodeGenerator<E, P>,
{
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            signals: Arc::clone(&self.signals),
            buffers: Arc::clone(&self.buffers),
            checkpoint_lock: Arc::clone(&self.checkpoint_lock),
            policy_factory: Arc::clone(&self.policy_factory),
            train_env_factory: Arc::clone(&self.train_env_factory),
            eval_env_factory: Arc::clone(&self.eval_env_factory),
            generator: Arc::clone(&self.generator),
        }
    }
}

enum EpisodeOutcome {
    Flushed,
    /// The generator signalled the end early; nothing was published.
    Discarded,
    Killed,
}

/// One worker's rollout loop.
pub struct RolloutWorker<P, E, G>
where
    P: Policy,
    G: EpisodeGenerator<E, P>,
{
    id: WorkerId,
    role: WorkerRole,
    ctx: WorkerContext<P, E, G>,
    gate: ThrottleGate,
    stats: WorkerStats,
    stats_tx: Sender<WorkerStats>,
}

impl<P, E, G> RolloutWorker<P, E, G>
where
    P: Policy + 'static,
    E: Environment + 'static,
    G: EpisodeGenerator<E, P> + 'static,
{
    pub fn new(
        id: WorkerId,
        role: WorkerRole,
        ctx: WorkerContext<P, E, G>,
        stats_tx: Sender<WorkerStats>,
    ) -> Self {
        let gate = ThrottleGate::new(Arc::clone(&ctx.signals), ctx.config.throttle_poll());
        let stats = WorkerStats::new(id.clone(), role);
        Self {
            id,
            role,
            ctx,
            gate,
            stats,
            stats_tx,
        }
    }

    /// Spawn the worker in a thread named after its identity.
    pub fn spawn(self, stats_rx: Receiver<WorkerStats>) -> Result<WorkerHandle, PoolError> {
        let id = self.id.clone();
        let role = self.role;
        let thread = std::thread::Builder::new()
            .name(id.to_string())
            .spawn(move || self.run())
            .map_err(|source| PoolError::Spawn {
                worker: id.to_string(),
                source,
            })?;
        Ok(WorkerHandle::new(id, role, thread, stats_rx))
    }

    /// Run the worker to completion on the current thread.
    pub fn run(mut self) -> Result<WorkerExit, WorkerError> {
        let result = self.run_inner();
        match &result {
            Ok(exit) => log::info!("{}: exited ({exit:?})", self.id),
            Err(e) => log::error!("{}: failed: {e}", self.id),
        }
        result
    }

    fn run_inner(&mut self) -> Result<WorkerExit, WorkerError> {
        let config = Arc::clone(&self.ctx.config);

        let mut policy = self.ctx.policy_factory.create();
        policy.build(false, &config.device)?;
        let seed = fastrand::u64(..);
        policy.reseed(seed);
        log::info!(
            "{}: Agent built for inference on {:?} (seed {seed})",
            self.id,
            config.device
        );

        let env_factory = match self.role {
            WorkerRole::Train => Arc::clone(&self.ctx.train_env_factory),
            WorkerRole::Eval => Arc::clone(&self.ctx.eval_env_factory),
        };
        let mut env = LaunchedEnv::launch(
            env_factory.create(&self.id),
            self.role.is_eval(),
            self.id.clone(),
        )?;

        let mut sync = CheckpointSynchronizer::new(
            config.sync_config(),
            Arc::clone(&self.ctx.checkpoint_lock),
            Arc::clone(&self.ctx.signals),
            self.id.clone(),
            config.previous_loaded_iteration,
        );

        match self.role {
            WorkerRole::Train => self.run_train(&mut env, &mut policy, &mut sync),
            WorkerRole::Eval => self.run_eval(&mut env, &mut policy, &mut sync),
        }
    }

    fn run_train(
        &mut self,
        env: &mut E,
        policy: &mut P,
        sync: &mut CheckpointSynchronizer,
    ) -> Result<WorkerExit, WorkerError> {
        for ep in 0..self.ctx.config.train_episodes {
            if synchronize(sync, policy)?.is_none() {
                return Ok(WorkerExit::Killed);
            }
            log::info!("{}: Starting episode {ep}.", self.id);

            let request = self.episode_request(None);
            match self.run_episode(env, policy, request)? {
                EpisodeOutcome::Flushed => self.report(sync),
                EpisodeOutcome::Discarded => {}
                EpisodeOutcome::Killed => return Ok(WorkerExit::Killed),
            }
        }
        Ok(WorkerExit::Completed)
    }

    fn run_eval(
        &mut self,
        env: &mut E,
        policy: &mut P,
        sync: &mut CheckpointSynchronizer,
    ) -> Result<WorkerExit, WorkerError> {
        let config = Arc::clone(&self.ctx.config);
        loop {
            match sync.has_unevaluated(config.training_iterations) {
                Ok(true) => {}
                Ok(false) => break,
                Err(CheckpointError::Cancelled) => return Ok(WorkerExit::Killed),
                Err(e) => return Err(e.into()),
            }
            if synchronize(sync, policy)?.is_none() {
                return Ok(WorkerExit::Killed);
            }

            for _run in 0..config.num_eval_runs {
                for ep in 0..config.eval_episodes {
                    let seed = config.eval_from_seed + ep as u64;
                    log::info!("{}: Starting episode {ep}, seed {seed}.", self.id);

                    let request = self.episode_request(Some(seed));
                    match self.run_episode(env, policy, request)? {
                        EpisodeOutcome::Flushed => {}
                        EpisodeOutcome::Discarded => continue,
                        EpisodeOutcome::Killed => return Ok(WorkerExit::Killed),
                    }
                    self.ctx.signals.increment_eval_episodes();
                    self.report(sync);
                }
            }
            self.ctx.signals.set_eval_report_ready();
            log::info!(
                "{}: Finished evaluating checkpoint {:?}.",
                self.id,
                sync.last_loaded()
            );
        }
        Ok(WorkerExit::Completed)
    }

    fn episode_request(&self, eval_seed: Option<u64>) -> EpisodeRequest {
        EpisodeRequest {
            signals: Arc::clone(&self.ctx.signals),
            episode_length: self.ctx.config.episode_length,
            timesteps: self.ctx.config.timesteps,
            is_eval: self.role.is_eval(),
            eval_seed,
        }
    }

    /// Run one episode and publish it as a whole.
    ///
    /// An episode cut short by `EpisodeComplete` is dropped, not published.
    fn run_episode(
        &mut self,
        env: &mut E,
        policy: &mut P,
        request: EpisodeRequest,
    ) -> Result<EpisodeOutcome, WorkerError> {
        let is_eval = request.is_eval;
        let mut episode = self.ctx.generator.generate(request);
        let mut rollout = Vec::with_capacity(self.ctx.config.episode_length);

        loop {
            let transition = match episode.next_transition(env, policy) {
                None => break,
                Some(Ok(transition)) => transition,
                Some(Err(e)) if e.is_episode_complete() => {
                    log::debug!(
                        "{}: episode ended early after {} steps, discarding",
                        self.id,
                        rollout.len()
                    );
                    return Ok(EpisodeOutcome::Discarded);
                }
                Some(Err(e)) => return Err(e.into()),
            };

            match self.gate.wait(is_eval) {
                GateOutcome::Killed => return Ok(EpisodeOutcome::Killed),
                GateOutcome::Proceed { waits } => self.stats.throttle_waits += waits,
            }

            // Only refill the mailbox once the trainer emptied it.
            self.ctx.buffers.offer_summaries(|| policy.act_summaries());
            rollout.push(transition);
        }

        if self.ctx.signals.is_killed() {
            return Ok(EpisodeOutcome::Killed);
        }
        let flushed = self.ctx.buffers.flush_episode(&self.id, rollout, is_eval);
        self.stats.record_episode(flushed);
        Ok(EpisodeOutcome::Flushed)
    }

    fn report(&mut self, sync: &CheckpointSynchronizer) {
        let freq = self.ctx.config.log_freq;
        if freq == 0 || self.stats.episodes % freq != 0 {
            return;
        }
        self.stats.checkpoint = sync.last_loaded();
        log::debug!(
            "{}: {} episodes, {} transitions, {} throttle waits",
            self.id,
            self.stats.episodes,
            self.stats.transitions,
            self.stats.throttle_waits
        );
        let _ = self.stats_tx.try_send(self.stats.clone());
    }
}

/// Sync the policy with the newest checkpoint. `None` means killed while
/// waiting.
fn synchronize<P: Policy>(
    sync: &mut CheckpointSynchronizer,
    policy: &mut P,
) -> Result<Option<SyncStatus>, WorkerError> {
    match sync.sync(policy) {
        Ok(status) => Ok(Some(status)),
        Err(CheckpointError::Cancelled) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
