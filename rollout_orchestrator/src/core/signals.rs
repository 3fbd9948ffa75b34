//! Shared scalar signals between the trainer and every rollout worker.
//!
//! None of the cells is guarded by a lock. They only gate throughput
//! (throttling, cancellation, reporting), so every reader tolerates stale
//! values and all accesses use relaxed ordering.
//!
//! | Signal                 | Written by            | Read by        |
//! |------------------------|-----------------------|----------------|
//! | `kill`                 | orchestrator `kill()` | all workers    |
//! | `global_step`          | trainer               | train workers  |
//! | `current_replay_ratio` | trainer               | train workers  |
//! | `target_replay_ratio`  | configuration         | train workers  |
//! | `num_eval_episodes`    | eval workers          | trainer        |
//! | `eval_report_ready`    | eval workers          | trainer        |

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

/// Scalar cells shared by all workers.
#[derive(Debug)]
pub struct SharedSignals {
    kill: AtomicBool,
    global_step: AtomicI64,
    /// `f64` stored as its bit pattern.
    current_replay_ratio: AtomicU64,
    target_replay_ratio: Option<f64>,
    num_eval_episodes: AtomicU64,
    eval_report_ready: AtomicBool,
}

impl SharedSignals {
    /// Create signals with the given (immutable) replay-ratio target.
    pub fn new(target_replay_ratio: Option<f64>) -> Self {
        Self {
            kill: AtomicBool::new(false),
            global_step: AtomicI64::new(0),
            current_replay_ratio: AtomicU64::new(0.0f64.to_bits()),
            target_replay_ratio,
            num_eval_episodes: AtomicU64::new(0),
            eval_report_ready: AtomicBool::new(false),
        }
    }

    /// Ask every worker to stop at its next transition boundary.
    pub fn kill(&self) {
        self.kill.store(true, Ordering::Relaxed);
    }

    pub fn is_killed(&self) -> bool {
        self.kill.load(Ordering::Relaxed)
    }

    pub fn global_step(&self) -> i64 {
        self.global_step.load(Ordering::Relaxed)
    }

    pub fn set_global_step(&self, step: i64) {
        self.global_step.store(step, Ordering::Relaxed);
    }

    /// Advance the global step and return the new value.
    pub fn advance_global_step(&self, steps: i64) -> i64 {
        self.global_step.fetch_add(steps, Ordering::Relaxed) + steps
    }

    pub fn current_replay_ratio(&self) -> f64 {
        f64::from_bits(self.current_replay_ratio.load(Ordering::Relaxed))
    }

    pub fn set_current_replay_ratio(&self, ratio: f64) {
        self.current_replay_ratio
            .store(ratio.to_bits(), Ordering::Relaxed);
    }

    /// Configured replay-ratio target, if throttling is enabled.
    pub fn target_replay_ratio(&self) -> Option<f64> {
        self.target_replay_ratio
    }

    pub fn num_eval_episodes(&self) -> u64 {
        self.num_eval_episodes.load(Ordering::Relaxed)
    }

    /// Count one finished evaluation episode; returns the new total.
    pub fn increment_eval_episodes(&self) -> u64 {
        self.num_eval_episodes.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn eval_report_ready(&self) -> bool {
        self.eval_report_ready.load(Ordering::Relaxed)
    }

    pub fn set_eval_report_ready(&self) {
        self.eval_report_ready.store(true, Ordering::Relaxed);
    }

    /// Consume the eval-report flag, returning whether it was set.
    pub fn take_eval_report(&self) -> bool {
        self.eval_report_ready.swap(false, Ordering::Relaxed)
    }
}

impl Default for SharedSignals {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Thread-safe reference to the shared signals.
pub type SignalHandle = Arc<SharedSignals>;

/// Create a new shared signal set.
pub fn shared_signals(target_replay_ratio: Option<f64>) -> SignalHandle {
    Arc::new(SharedSignals::new(target_replay_ratio))
}
