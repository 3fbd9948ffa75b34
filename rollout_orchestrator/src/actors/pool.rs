//! Worker pool with a failure table.
//!
//! The pool starts named workers through a [`WorkerLauncher`], remembers the
//! role each identity was started with, and counts abnormal exits per
//! identity. It does not restart anything on its own: the caller inspects
//! the failure table and decides whether to call [`WorkerPool::restart`].

use super::worker::{RolloutWorker, WorkerContext, WorkerExit, WorkerHandle};
use crate::agent::Policy;
use crate::core::{WorkerId, WorkerRole};
use crate::environment::Environment;
use crate::error::{PoolError, SpinUpError, WorkerError};
use crate::metrics::{RolloutTotals, WorkerStats};
use crate::rollout::EpisodeGenerator;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Capacity of each worker's stats channel.
const STATS_CHANNEL_CAPACITY: usize = 100;

/// Starts one worker for an identity and role.
pub trait WorkerLauncher: Send + Sync {
    fn launch(&self, id: WorkerId, role: WorkerRole) -> Result<WorkerHandle, PoolError>;
}

impl<P, E, G> WorkerLauncher for WorkerContext<P, E, G>
where
    P: Policy + 'static,
    E: Environment + 'static,
    G: EpisodeGenerator<E, P> + 'static,
{
    fn launch(&self, id: WorkerId, role: WorkerRole) -> Result<WorkerHandle, PoolError> {
        let (stats_tx, stats_rx) = crossbeam_channel::bounded(STATS_CHANNEL_CAPACITY);
        RolloutWorker::new(id, role, self.clone(), stats_tx).spawn(stats_rx)
    }
}

/// Per-identity bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerRecord {
    /// Role the identity was spun up with; restarts reuse it.
    pub role: WorkerRole,
    /// Abnormal exits observed.
    pub failures: usize,
    /// Times the identity has been started.
    pub launches: usize,
}

/// Spawns and tracks rollout workers.
pub struct WorkerPool {
    launcher: Arc<dyn WorkerLauncher>,
    records: BTreeMap<WorkerId, WorkerRecord>,
}

impl WorkerPool {
    pub fn new(launcher: Arc<dyn WorkerLauncher>) -> Self {
        Self {
            launcher,
            records: BTreeMap::new(),
        }
    }

    /// Start `count` workers named `prefix0..prefix{count-1}`.
    ///
    /// Each identity is registered with zero failures once it has started.
    /// Identities that are already registered are rejected before anything
    /// starts. If a launch fails, the workers started so far are handed back
    /// in the error.
    pub fn spin_up(
        &mut self,
        prefix: &str,
        count: usize,
        role: WorkerRole,
    ) -> Result<Vec<WorkerHandle>, SpinUpError> {
        let ids: Vec<WorkerId> = (0..count).map(|i| WorkerId::new(prefix, i)).collect();
        if let Some(taken) = ids.iter().find(|id| self.records.contains_key(*id)) {
            return Err(PoolError::DuplicateWorker(taken.to_string()).into());
        }

        let mut handles = Vec::with_capacity(count);
        for id in ids {
            match self.launcher.launch(id.clone(), role) {
                Ok(handle) => {
                    self.records.insert(
                        id,
                        WorkerRecord {
                            role,
                            failures: 0,
                            launches: 1,
                        },
                    );
                    handles.push(handle);
                }
                Err(source) => {
                    log::error!("Failed to launch {role} worker {id}: {source}");
                    return Err(SpinUpError {
                        started: handles,
                        source,
                    });
                }
            }
        }
        log::info!("Spun up {count} {role} workers with prefix '{prefix}'");
        Ok(handles)
    }

    /// Start a previously registered identity again with its recorded role.
    pub fn restart(&mut self, id: &WorkerId) -> Result<WorkerHandle, PoolError> {
        let role = self
            .role_of(id)
            .ok_or_else(|| PoolError::UnknownWorker(id.to_string()))?;
        log::info!("Restarting {role} worker {id}");
        let handle = self.launcher.launch(id.clone(), role)?;
        if let Some(record) = self.records.get_mut(id) {
            record.launches += 1;
        }
        Ok(handle)
    }

    /// Count an abnormal exit of `id`. Returns the new failure count.
    pub fn record_failure(&mut self, id: &WorkerId) -> Option<usize> {
        let record = self.records.get_mut(id)?;
        record.failures += 1;
        log::warn!("Worker {id} failed ({} failures so far)", record.failures);
        Some(record.failures)
    }

    /// Wait for a worker and record a failure if it exited abnormally.
    pub fn join(&mut self, handle: WorkerHandle) -> Result<WorkerExit, WorkerError> {
        let id = handle.id.clone();
        let result = handle.join();
        if result.is_err() {
            self.record_failure(&id);
        }
        result
    }

    /// Join every handle, in order.
    pub fn join_all(
        &mut self,
        handles: Vec<WorkerHandle>,
    ) -> Vec<(WorkerId, Result<WorkerExit, WorkerError>)> {
        handles
            .into_iter()
            .map(|h| {
                let id = h.id.clone();
                (id, self.join(h))
            })
            .collect()
    }

    pub fn record(&self, id: &WorkerId) -> Option<&WorkerRecord> {
        self.records.get(id)
    }

    pub fn failures(&self, id: &WorkerId) -> Option<usize> {
        self.records.get(id).map(|r| r.failures)
    }

    pub fn role_of(&self, id: &WorkerId) -> Option<WorkerRole> {
        self.records.get(id).map(|r| r.role)
    }

    /// Snapshot of the failure table.
    pub fn failure_table(&self) -> BTreeMap<WorkerId, usize> {
        self.records
            .iter()
            .map(|(id, r)| (id.clone(), r.failures))
            .collect()
    }

    /// Number of registered identities.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Collect the newest stats report from each handle (non-blocking).
pub fn collect_stats(handles: &[WorkerHandle]) -> Vec<WorkerStats> {
    handles.iter().filter_map(WorkerHandle::latest_stats).collect()
}

/// Aggregate the newest stats of each handle.
pub fn aggregate_stats(handles: &[WorkerHandle]) -> RolloutTotals {
    RolloutTotals::from_stats(&collect_stats(handles))
}
