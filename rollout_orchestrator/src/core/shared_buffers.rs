//! Buffers shared between rollout workers and the trainer.
//!
//! # Design
//!
//! A single mutex guards both the transition queue and the summary mailbox,
//! so every read-modify-write sequence is atomic with respect to all workers:
//!
//! ```text
//! Worker 0 ─┐  flush_episode (whole episode)
//! Worker 1 ─┼──────────────────────────────> transitions ──> drain_transitions()
//! Worker N ─┘                                                       │
//!              offer_summaries (only if empty)                      v
//!           ─────────────────────────────────> summaries ───> drain_summaries()
//!                                                                Trainer
//! ```
//!
//! Transitions from one worker appear in generation order, grouped by
//! episode. No order is promised across workers.

use super::transition::StoredTransition;
use super::worker_id::WorkerId;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct BufferState<T, S> {
    transitions: Vec<StoredTransition<T>>,
    summaries: Vec<S>,
}

/// Counters for the single-slot summary mailbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailboxStats {
    /// Summary batches written into an empty mailbox.
    pub accepted: usize,
    /// Offers turned away because the mailbox was still full.
    pub dropped: usize,
}

/// Pending transitions plus a single-slot summary mailbox.
pub struct SharedBuffers<T, S> {
    state: Mutex<BufferState<T, S>>,
    accepted: AtomicUsize,
    dropped: AtomicUsize,
}

impl<T, S> SharedBuffers<T, S> {
    /// Create empty buffers.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BufferState {
                transitions: Vec::new(),
                summaries: Vec::new(),
            }),
            accepted: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Publish a completed episode.
    ///
    /// All transitions are appended under one lock acquisition, so a reader
    /// never observes part of an episode. Returns the number appended.
    pub fn flush_episode<I>(&self, worker: &WorkerId, episode: I, is_eval: bool) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let mut guard = self.state.lock();
        let before = guard.transitions.len();
        guard.transitions.extend(
            episode
                .into_iter()
                .map(|payload| StoredTransition::new(worker.clone(), payload, is_eval)),
        );
        guard.transitions.len() - before
    }

    /// Offer a batch of summaries to the mailbox.
    ///
    /// `produce` is only invoked when the mailbox is empty, i.e. after the
    /// trainer drained the previous batch. Returns true if a non-empty batch
    /// was written.
    pub fn offer_summaries<F>(&self, produce: F) -> bool
    where
        F: FnOnce() -> Vec<S>,
    {
        let mut guard = self.state.lock();
        if !guard.summaries.is_empty() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        let batch = produce();
        if batch.is_empty() {
            return false;
        }
        guard.summaries.extend(batch);
        self.accepted.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Take every pending transition, leaving the queue empty.
    pub fn drain_transitions(&self) -> Vec<StoredTransition<T>> {
        std::mem::take(&mut self.state.lock().transitions)
    }

    /// Take the mailbox contents, re-opening it for the next batch.
    pub fn drain_summaries(&self) -> Vec<S> {
        std::mem::take(&mut self.state.lock().summaries)
    }

    pub fn transition_count(&self) -> usize {
        self.state.lock().transitions.len()
    }

    pub fn summary_count(&self) -> usize {
        self.state.lock().summaries.len()
    }

    /// Whether no transitions are pending.
    pub fn is_empty(&self) -> bool {
        self.transition_count() == 0
    }

    pub fn mailbox_stats(&self) -> MailboxStats {
        MailboxStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl<T: Clone, S> SharedBuffers<T, S> {
    /// Copy the pending transitions without draining them.
    pub fn snapshot_transitions(&self) -> Vec<StoredTransition<T>> {
        self.state.lock().transitions.clone()
    }
}

impl<T, S> Default for SharedBuffers<T, S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe shared buffers.
pub type SharedRolloutBuffers<T, S> = Arc<SharedBuffers<T, S>>;

/// Create new shared buffers.
pub fn shared_buffers<T, S>() -> SharedRolloutBuffers<T, S> {
    Arc::new(SharedBuffers::new())
}
