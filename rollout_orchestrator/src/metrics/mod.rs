//! Worker statistics.
//!
//! Workers report a [`WorkerStats`] snapshot every `log_freq` episodes over
//! a bounded channel; the pool collects and aggregates them without blocking.

pub mod worker_stats;

pub use worker_stats::{RolloutTotals, WorkerStats};
