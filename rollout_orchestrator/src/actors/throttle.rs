//! Replay-ratio backpressure.
//!
//! Training workers may only produce another transition while the learner
//! keeps up: the trainer publishes its current replay ratio and workers poll
//! it against the configured target. There is no wakeup channel; a blocked
//! worker sleeps a fixed interval and checks again.

use crate::core::SignalHandle;
use std::thread;
use std::time::Duration;

/// Result of waiting on the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// The worker may produce the next transition.
    Proceed {
        /// Polls spent blocked before proceeding.
        waits: usize,
    },
    /// The kill switch was set while waiting.
    Killed,
}

/// Decides whether a worker may produce one more transition.
#[derive(Debug, Clone)]
pub struct ThrottleGate {
    signals: SignalHandle,
    poll_interval: Duration,
}

impl ThrottleGate {
    pub fn new(signals: SignalHandle, poll_interval: Duration) -> Self {
        Self {
            signals,
            poll_interval,
        }
    }

    /// Single non-blocking check.
    ///
    /// Evaluation workers always proceed. Training workers proceed when no
    /// target is configured, when learning has not started (global step at
    /// or below zero), or when the current ratio exceeds the target.
    pub fn may_proceed(&self, is_eval: bool) -> bool {
        if is_eval {
            return true;
        }
        match self.signals.target_replay_ratio() {
            None => true,
            Some(target) => {
                self.signals.global_step() <= 0 || self.signals.current_replay_ratio() > target
            }
        }
    }

    /// Poll until the gate opens or the kill switch is set.
    ///
    /// The kill switch is checked before every poll, so a killed worker never
    /// proceeds.
    pub fn wait(&self, is_eval: bool) -> GateOutcome {
        let mut waits = 0;
        loop {
            if self.signals.is_killed() {
                return GateOutcome::Killed;
            }
            if self.may_proceed(is_eval) {
                return GateOutcome::Proceed { waits };
            }
            if let Some(target) = self.signals.target_replay_ratio() {
                log::debug!(
                    "Agent. Waiting for replay_ratio {} to be more than {}",
                    self.signals.current_replay_ratio(),
                    target
                );
            }
            waits += 1;
            thread::sleep(self.poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared_signals;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn gate(target: Option<f64>, step: i64, ratio: f64) -> ThrottleGate {
        let signals = shared_signals(target);
        signals.set_global_step(step);
        signals.set_current_replay_ratio(ratio);
        ThrottleGate::new(signals, Duration::from_millis(1))
    }

    #[test]
    fn test_ratio_above_target_proceeds() {
        assert!(gate(Some(0.5), 10, 0.6).may_proceed(false));
    }

    #[test]
    fn test_ratio_below_target_blocks() {
        assert!(!gate(Some(0.5), 10, 0.4).may_proceed(false));
    }

    #[test]
    fn test_ratio_equal_to_target_blocks() {
        assert!(!gate(Some(0.5), 10, 0.5).may_proceed(false));
    }

    #[test]
    fn test_learning_not_started_proceeds() {
        assert!(gate(Some(0.5), 0, 0.0).may_proceed(false));
        assert!(gate(Some(0.5), -3, 0.1).may_proceed(false));
    }

    #[test]
    fn test_no_target_proceeds() {
        assert!(gate(None, 100, 0.0).may_proceed(false));
    }

    #[test]
    fn test_wait_returns_once_trainer_catches_up() {
        let g = gate(Some(0.5), 10, 0.1);
        let signals = Arc::clone(&g.signals);
        let trainer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            signals.set_current_replay_ratio(0.9);
        });

        match g.wait(false) {
            GateOutcome::Proceed { waits } => assert!(waits > 0),
            GateOutcome::Killed => panic!("gate reported kill"),
        }
        trainer.join().unwrap();
    }

    #[test]
    fn test_wait_observes_kill() {
        let g = gate(Some(0.5), 10, 0.1);
        let signals = Arc::clone(&g.signals);
        let killer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            signals.kill();
        });
        assert_eq!(g.wait(false), GateOutcome::Killed);
        killer.join().unwrap();
    }

    #[test]
    fn test_kill_wins_over_open_gate() {
        let g = gate(None, 0, 0.0);
        g.signals.kill();
        assert_eq!(g.wait(true), GateOutcome::Killed);
    }

    proptest! {
        #[test]
        fn prop_eval_always_proceeds(
            target in proptest::option::of(0.01f64..10.0),
            step in -100i64..100_000,
            ratio in 0.0f64..10.0,
        ) {
            prop_assert!(gate(target, step, ratio).may_proceed(true));
        }

        #[test]
        fn prop_unstarted_learning_always_proceeds(
            target in 0.01f64..10.0,
            step in -100i64..=0,
            ratio in 0.0f64..10.0,
        ) {
            prop_assert!(gate(Some(target), step, ratio).may_proceed(false));
        }

        #[test]
        fn prop_started_learning_follows_ratio(
            target in 0.01f64..10.0,
            step in 1i64..100_000,
            ratio in 0.0f64..10.0,
        ) {
            prop_assert_eq!(gate(Some(target), step, ratio).may_proceed(false), ratio > target);
        }
    }
}
