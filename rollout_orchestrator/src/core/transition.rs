//! Transition records as they are stored in the shared buffers.

use super::worker_id::WorkerId;

/// A transition tagged on ingestion with its origin.
///
/// The payload is opaque to the orchestrator; only the trainer interprets it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTransition<T> {
    /// Worker that generated the transition.
    pub worker: WorkerId,
    /// Payload produced by the episode generator.
    pub payload: T,
    /// Whether the transition came from an evaluation episode.
    pub is_eval: bool,
}

impl<T> StoredTransition<T> {
    pub fn new(worker: WorkerId, payload: T, is_eval: bool) -> Self {
        Self {
            worker,
            payload,
            is_eval,
        }
    }
}
