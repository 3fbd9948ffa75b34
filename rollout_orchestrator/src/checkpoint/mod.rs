//! Policy checkpoint exchange between the trainer and rollout workers.
//!
//! ## Layout
//!
//! ```text
//! <weights_dir>/
//!     0/        one immutable snapshot per published iteration
//!     500/
//!     1000/     "latest" = numerically largest directory name
//! ```
//!
//! The trainer publishes snapshots with a [`CheckpointPublisher`]; each
//! worker follows them with its own [`CheckpointSynchronizer`]. Both sides
//! hold the same [`CheckpointLock`] while listing or writing the root.
//!
//! ## Example
//!
//! ```rust,ignore
//! let lock = checkpoint_lock();
//! let publisher = CheckpointPublisher::new(PublisherConfig::new("./weights"), lock.clone())?;
//! publisher.publish(500, |dir| save_model(dir))?;
//!
//! let mut sync = CheckpointSynchronizer::new(config, lock, signals, worker, None);
//! sync.sync(&mut policy)?;
//! ```

pub mod directory;
pub mod publisher;
pub mod synchronizer;

pub use directory::{
    checkpoint_lock, checkpoint_path, latest_checkpoint, list_iterations, CheckpointInfo,
    CheckpointLock,
};
pub use publisher::{CheckpointPublisher, PublisherConfig};
pub use synchronizer::{CheckpointSynchronizer, SyncConfig, SyncStatus};

use crate::error::AgentError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for checkpoint operations.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint IO error: {0}")]
    Io(#[from] io::Error),
    /// Loading failed, including after the single not-found retry.
    #[error("failed to load checkpoint {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: AgentError,
    },
    #[error("checkpoint {iteration} is not newer than the latest published {latest}")]
    NotNewer { iteration: u64, latest: u64 },
    #[error("no weights directory configured")]
    NotConfigured,
    /// The kill switch was observed while waiting for checkpoints.
    #[error("cancelled while waiting for checkpoints")]
    Cancelled,
}
