//! Core types shared by every worker and by the trainer.

pub mod shared_buffers;
pub mod signals;
pub mod transition;
pub mod worker_id;

pub use shared_buffers::{shared_buffers, MailboxStats, SharedBuffers, SharedRolloutBuffers};
pub use signals::{shared_signals, SharedSignals, SignalHandle};
pub use transition::StoredTransition;
pub use worker_id::{WorkerId, WorkerRole};
