//! Registry of active transfers: job id -> abort flag + pipeline task.
//!
//! All synchronization lives inside this type; callers never lock anything
//! themselves. At most one entry per job id exists at any time, which is what
//! enforces the one-active-transfer-per-job invariant.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use crate::job::JobId;
use tokio::task::JoinHandle;

/// Handle to one running transfer.
pub(crate) struct ActiveTransfer {
    /// Cooperative cancellation flag checked by every worker before each
    /// write step.
    pub abort: Arc<AtomicBool>,
    /// The pipeline task; awaiting it guarantees all workers have stopped
    /// and progress is persisted.
    pub task: JoinHandle<()>,
}

#[derive(Default)]
pub(crate) struct TransferRegistry {
    jobs: Mutex<HashMap<JobId, ActiveTransfer>>,
}

impl TransferRegistry {
    /// Atomically claim the id and launch a transfer. `spawn` receives the
    /// fresh abort flag and must return the pipeline task. Returns false
    /// without spawning when a transfer for the id is already active.
    pub(crate) fn activate<F>(&self, id: JobId, spawn: F) -> bool
    where
        F: FnOnce(Arc<AtomicBool>) -> JoinHandle<()>,
    {
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.contains_key(&id) {
            return false;
        }
        let abort = Arc::new(AtomicBool::new(false));
        let task = spawn(Arc::clone(&abort));
        jobs.insert(id, ActiveTransfer { abort, task });
        true
    }

    /// Take ownership of the active transfer (pause/stop path). The caller
    /// signals the abort flag and awaits the task.
    pub(crate) fn deactivate(&self, id: JobId) -> Option<ActiveTransfer> {
        self.jobs.lock().unwrap().remove(&id)
    }

    /// Drop the entry when the pipeline finishes on its own. No-op if a
    /// pause/stop already took it.
    pub(crate) fn release(&self, id: JobId) {
        self.jobs.lock().unwrap().remove(&id);
    }

    pub(crate) fn is_active(&self, id: JobId) -> bool {
        self.jobs.lock().unwrap().contains_key(&id)
    }

    pub(crate) fn active_jobs(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.jobs.lock().unwrap().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
