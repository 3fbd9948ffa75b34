//! Scripted policy, environment and generator used by unit tests.

use crate::actors::WorkerContext;
use crate::agent::{Device, Policy};
use crate::checkpoint::checkpoint_lock;
use crate::config::OrchestratorConfig;
use crate::core::{shared_buffers, shared_signals, SignalHandle, WorkerId};
use crate::environment::Environment;
use crate::error::{AgentError, EnvError, GeneratorError};
use crate::rollout::{EpisodeGenerator, EpisodeRequest, RolloutEpisode};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Policy that records loaded checkpoints and emits one summary per call.
pub struct MockPolicy {
    pub loads: Arc<Mutex<Vec<PathBuf>>>,
}

impl Policy for MockPolicy {
    type Summary = String;

    fn build(&mut self, training: bool, _device: &Device) -> Result<(), AgentError> {
        assert!(!training, "workers build policies for inference");
        Ok(())
    }

    fn load_weights(&mut self, path: &Path) -> Result<(), AgentError> {
        self.loads.lock().push(path.to_path_buf());
        Ok(())
    }

    fn act_summaries(&self) -> Vec<String> {
        vec!["q_values".to_owned()]
    }
}

/// Lifecycle counters shared by every environment of a factory.
#[derive(Default)]
pub struct EnvCounters {
    pub launches: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub eval_flags: Mutex<Vec<bool>>,
    pub workers: Mutex<Vec<WorkerId>>,
}

impl EnvCounters {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

pub struct MockEnv {
    counters: Arc<EnvCounters>,
    eval: bool,
}

impl Environment for MockEnv {
    fn set_eval(&mut self, eval: bool) {
        self.eval = eval;
    }

    fn launch(&mut self) -> Result<(), EnvError> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        self.counters.eval_flags.lock().push(self.eval);
        Ok(())
    }

    fn shutdown(&mut self) {
        self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Generator whose episodes follow a fixed script.
#[derive(Default)]
pub struct ScriptedGenerator {
    /// Steps per episode, capped by the requested episode length.
    pub steps: usize,
    /// Step at which a fatal error is produced.
    pub fail_at: Option<usize>,
    /// Step at which the episode ends early through `EpisodeComplete`.
    pub soft_end_at: Option<usize>,
    /// Step at which the generator sets the kill switch.
    pub kill_at: Option<usize>,
    pub step_delay: Duration,
    /// Eval seed of every started episode.
    pub seeds: Mutex<Vec<Option<u64>>>,
}

impl ScriptedGenerator {
    pub fn with_steps(steps: usize) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }
}

pub struct ScriptedEpisode {
    step: usize,
    limit: usize,
    fail_at: Option<usize>,
    soft_end_at: Option<usize>,
    kill_at: Option<usize>,
    step_delay: Duration,
    signals: SignalHandle,
}

impl RolloutEpisode<MockEnv, MockPolicy> for ScriptedEpisode {
    type Transition = usize;

    fn next_transition(
        &mut self,
        _env: &mut MockEnv,
        _policy: &mut MockPolicy,
    ) -> Option<Result<usize, GeneratorError>> {
        if self.step >= self.limit {
            return None;
        }
        if self.fail_at == Some(self.step) {
            return Some(Err(GeneratorError::Failed(format!("step {}", self.step))));
        }
        if self.soft_end_at == Some(self.step) {
            return Some(Err(GeneratorError::EpisodeComplete));
        }
        if self.kill_at == Some(self.step) {
            self.signals.kill();
        }
        if !self.step_delay.is_zero() {
            std::thread::sleep(self.step_delay);
        }
        self.step += 1;
        Some(Ok(self.step - 1))
    }
}

impl EpisodeGenerator<MockEnv, MockPolicy> for ScriptedGenerator {
    type Transition = usize;
    type Episode = ScriptedEpisode;

    fn generate(&self, request: EpisodeRequest) -> ScriptedEpisode {
        self.seeds.lock().push(request.eval_seed);
        ScriptedEpisode {
            step: 0,
            limit: self.steps.min(request.episode_length),
            fail_at: self.fail_at,
            soft_end_at: self.soft_end_at,
            kill_at: self.kill_at,
            step_delay: self.step_delay,
            signals: request.signals,
        }
    }
}

pub type MockContext = WorkerContext<MockPolicy, MockEnv, ScriptedGenerator>;

/// Handles for inspecting what workers built from a [`MockContext`] did.
pub struct Recorders {
    pub loads: Arc<Mutex<Vec<PathBuf>>>,
    pub train_envs: Arc<EnvCounters>,
    pub eval_envs: Arc<EnvCounters>,
    pub generator: Arc<ScriptedGenerator>,
}

pub fn policy_factory(loads: &Arc<Mutex<Vec<PathBuf>>>) -> impl Fn() -> MockPolicy + Send + Sync {
    let loads = Arc::clone(loads);
    move || MockPolicy {
        loads: Arc::clone(&loads),
    }
}

pub fn env_factory(counters: &Arc<EnvCounters>) -> impl Fn(&WorkerId) -> MockEnv + Send + Sync {
    let counters = Arc::clone(counters);
    move |worker: &WorkerId| {
        counters.workers.lock().push(worker.clone());
        MockEnv {
            counters: Arc::clone(&counters),
            eval: false,
        }
    }
}

/// Build a worker context around `config` and `generator`.
pub fn mock_context(config: OrchestratorConfig, generator: ScriptedGenerator) -> (MockContext, Recorders) {
    let recorded = Recorders {
        loads: Arc::new(Mutex::new(Vec::new())),
        train_envs: Arc::new(EnvCounters::default()),
        eval_envs: Arc::new(EnvCounters::default()),
        generator: Arc::new(generator),
    };
    let ctx = WorkerContext {
        signals: shared_signals(config.target_replay_ratio),
        config: Arc::new(config),
        buffers: shared_buffers(),
        checkpoint_lock: checkpoint_lock(),
        policy_factory: Arc::new(policy_factory(&recorded.loads)),
        train_env_factory: Arc::new(env_factory(&recorded.train_envs)),
        eval_env_factory: Arc::new(env_factory(&recorded.eval_envs)),
        generator: Arc::clone(&recorded.generator),
    };
    (ctx, recorded)
}

/// Create snapshot directories `iterations` under `root`.
pub fn make_checkpoints(root: &Path, iterations: &[u64]) {
    for it in iterations {
        std::fs::create_dir_all(root.join(it.to_string())).unwrap();
    }
}

/// Config with millisecond polling for tests.
pub fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig::default().with_poll_intervals(Duration::from_millis(2))
}
