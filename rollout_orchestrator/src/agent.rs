//! Policy capability driven by rollout workers.
//!
//! The policy's internals are opaque. Workers never share a policy: every
//! worker asks a [`PolicyFactory`] for a fresh, independent instance and
//! builds it in inference mode inside its own thread.

use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Compute target a policy is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    /// GPU by ordinal.
    Gpu(usize),
}

/// Decision-making policy used to act in an environment.
pub trait Policy {
    /// Diagnostic record emitted by [`act_summaries`](Policy::act_summaries).
    type Summary: Send + 'static;

    /// Build the policy for training or inference on `device`.
    fn build(&mut self, training: bool, device: &Device) -> Result<(), AgentError>;

    /// Load weights from a checkpoint directory.
    ///
    /// Must return [`AgentError::NotFound`] when the directory exists but its
    /// contents are missing or incomplete.
    fn load_weights(&mut self, path: &Path) -> Result<(), AgentError>;

    /// Diagnostics accumulated while acting.
    fn act_summaries(&self) -> Vec<Self::Summary>;

    /// Reseed any internal randomness. Called once per worker.
    fn reseed(&mut self, _seed: u64) {}
}

/// Constructs independent policy instances, one per worker.
pub trait PolicyFactory<P>: Send + Sync {
    fn create(&self) -> P;
}

impl<P, F> PolicyFactory<P> for F
where
    F: Fn() -> P + Send + Sync,
{
    fn create(&self) -> P {
        self()
    }
}
