//! Rollout workers and the pool that manages them.
//!
//! - [`RolloutWorker`]: one environment, one policy, one thread
//! - [`ThrottleGate`]: replay-ratio backpressure for training workers
//! - [`WorkerPool`]: named spin-up, restart and the failure table

pub mod pool;
pub mod throttle;
pub mod worker;


pub use pool::{aggregate_stats, collect_stats, WorkerLauncher, WorkerPool, WorkerRecord};
pub use throttle::{GateOutcome, ThrottleGate};
pub use worker::{RolloutWorker, WorkerContext, WorkerExit, WorkerHandle};
