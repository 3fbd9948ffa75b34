//! Orchestrator configuration.

use crate::agent::Device;
use crate::checkpoint::SyncConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read configuration: {0}")]
    Io(#[from] io::Error),
}

/// Configuration for the rollout orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Timesteps stacked into each transition.
    pub timesteps: usize,
    /// Maximum environment steps per episode.
    pub episode_length: usize,
    /// Number of training workers.
    pub train_envs: usize,
    /// Number of evaluation workers.
    pub eval_envs: usize,
    /// Episodes each training worker runs before exiting.
    pub train_episodes: usize,
    /// Episodes per evaluation run.
    pub eval_episodes: usize,
    /// Evaluation runs per checkpoint.
    pub num_eval_runs: usize,
    /// Iteration id of the final checkpoint the trainer will publish.
    pub training_iterations: u64,
    /// Base seed; eval episode `i` uses `eval_from_seed + i`.
    pub eval_from_seed: u64,
    /// Replay ratio training workers must stay below. `None` disables throttling.
    pub target_replay_ratio: Option<f64>,
    /// Checkpoint root. `None` disables weight loading.
    pub weights_dir: Option<PathBuf>,
    /// Iteration already loaded into the policy before spin-up.
    pub previous_loaded_iteration: Option<u64>,
    /// Compute target for worker policies.
    pub device: Device,
    /// Episodes between worker statistics reports. A worker built directly
    /// with `0` sends no reports; `validate` rejects it.
    pub log_freq: usize,
    pub throttle_poll_ms: u64,
    pub checkpoint_poll_ms: u64,
    pub checkpoint_retry_ms: u64,
    pub first_checkpoint_poll_ms: u64,
    /// Name prefix of training workers.
    pub train_prefix: String,
    /// Name prefix of evaluation workers.
    pub eval_prefix: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            timesteps: 1,
            episode_length: 100,
            train_envs: 1,
            eval_envs: 0,
            train_episodes: 1,
            eval_episodes: 10,
            num_eval_runs: 1,
            training_iterations: 0,
            eval_from_seed: 0,
            target_replay_ratio: None,
            weights_dir: None,
            previous_loaded_iteration: None,
            device: Device::Cpu,
            log_freq: 1,
            throttle_poll_ms: 1000,
            checkpoint_poll_ms: 1000,
            checkpoint_retry_ms: 1000,
            first_checkpoint_poll_ms: 10_000,
            train_prefix: "train_env".to_owned(),
            eval_prefix: "eval_env".to_owned(),
        }
    }
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// Check the configuration for values the workers cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.episode_length == 0 {
            return Err(ConfigError::Invalid("episode_length must be > 0".into()));
        }
        if self.num_eval_runs == 0 {
            return Err(ConfigError::Invalid("num_eval_runs must be > 0".into()));
        }
        if self.log_freq == 0 {
            return Err(ConfigError::Invalid("log_freq must be > 0".into()));
        }
        if let Some(ratio) = self.target_replay_ratio {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "target_replay_ratio must be positive and finite, got {ratio}"
                )));
            }
        }
        if self.eval_envs > 0 && self.weights_dir.is_none() {
            return Err(ConfigError::Invalid(
                "evaluation workers require weights_dir".into(),
            ));
        }
        if self.train_prefix == self.eval_prefix {
            return Err(ConfigError::Invalid(
                "train_prefix and eval_prefix must differ".into(),
            ));
        }
        Ok(())
    }

    pub fn with_timesteps(mut self, timesteps: usize) -> Self {
        self.timesteps = timesteps;
        self
    }

    pub fn with_episode_length(mut self, episode_length: usize) -> Self {
        self.episode_length = episode_length;
        self
    }

    pub fn with_train_envs(mut self, n: usize) -> Self {
        self.train_envs = n;
        self
    }

    pub fn with_eval_envs(mut self, n: usize) -> Self {
        self.eval_envs = n;
        self
    }

    pub fn with_train_episodes(mut self, n: usize) -> Self {
        self.train_episodes = n;
        self
    }

    pub fn with_eval_episodes(mut self, n: usize) -> Self {
        self.eval_episodes = n;
        self
    }

    pub fn with_num_eval_runs(mut self, n: usize) -> Self {
        self.num_eval_runs = n;
        self
    }

    pub fn with_training_iterations(mut self, iterations: u64) -> Self {
        self.training_iterations = iterations;
        self
    }

    pub fn with_eval_from_seed(mut self, seed: u64) -> Self {
        self.eval_from_seed = seed;
        self
    }

    pub fn with_target_replay_ratio(mut self, ratio: f64) -> Self {
        self.target_replay_ratio = Some(ratio);
        self
    }

    pub fn with_weights_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.weights_dir = Some(dir.into());
        self
    }

    pub fn with_previous_loaded_iteration(mut self, iteration: u64) -> Self {
        self.previous_loaded_iteration = Some(iteration);
        self
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn with_log_freq(mut self, episodes: usize) -> Self {
        self.log_freq = episodes;
        self
    }

    /// Set every polling interval at once.
    pub fn with_poll_intervals(mut self, interval: Duration) -> Self {
        let ms = interval.as_millis() as u64;
        self.throttle_poll_ms = ms;
        self.checkpoint_poll_ms = ms;
        self.checkpoint_retry_ms = ms;
        self.first_checkpoint_poll_ms = ms;
        self
    }

    pub fn throttle_poll(&self) -> Duration {
        Duration::from_millis(self.throttle_poll_ms)
    }

    /// Checkpoint-following settings for a worker.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            weights_dir: self.weights_dir.clone(),
            poll_interval: Duration::from_millis(self.checkpoint_poll_ms),
            retry_delay: Duration::from_millis(self.checkpoint_retry_ms),
            first_checkpoint_poll: Duration::from_millis(self.first_checkpoint_poll_ms),
        }
    }
}
