//! Worker identity and role.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which rollout loop a worker runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerRole {
    /// Produces experience for the learner, throttled by the replay ratio.
    Train,
    /// Evaluates every published checkpoint until the final one.
    Eval,
}

impl WorkerRole {
    /// Whether transitions produced under this role are tagged as eval.
    #[inline]
    pub fn is_eval(self) -> bool {
        matches!(self, Self::Eval)
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Train => f.write_str("train"),
            Self::Eval => f.write_str("eval"),
        }
    }
}

/// Unique worker name: role prefix followed by the worker index.
///
/// Used as the restart key in the pool and as the origin tag of every
/// transition the worker publishes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(String);

impl WorkerId {
    /// Derive the identity of worker `index` under `prefix`.
    pub fn new(prefix: &str, index: usize) -> Self {
        Self(format!("{prefix}{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerId {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for WorkerId {
    fn from(name: String) -> Self {
        Self(name)
    }
}
