//! Download engine: job lifecycle controller and transfer registry.
//!
//! Owns the set of active transfers and enforces the job state machine.
//! Callers drive it with `create_job` / `start` / `pause` / `stop` /
//! `resume` and observe it through the event channel returned by `new`.

mod aggregator;
mod events;
mod pipeline;
mod registry;
mod worker;

#[cfg(test)]
mod tests;

pub use events::JobEvent;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::mpsc;

use crate::config::FdmConfig;
use crate::job::{JobId, JobRecord, JobStatus, NewJob};
use crate::store::JobStore;
use crate::transport::{CurlTransport, Transport};

use events::EventSender;
use registry::TransferRegistry;

/// State shared between the engine facade and its pipeline tasks.
pub(crate) struct EngineShared {
    pub store: JobStore,
    pub transport: Arc<dyn Transport>,
    pub config: FdmConfig,
    pub events: EventSender,
    pub registry: TransferRegistry,
}

/// The lifecycle controller. Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct DownloadEngine {
    shared: Arc<EngineShared>,
}

impl DownloadEngine {
    /// Build an engine over an explicit transport. Returns the engine and the
    /// receiving half of the observer channel.
    pub fn new(
        store: JobStore,
        transport: Arc<dyn Transport>,
        config: FdmConfig,
    ) -> (Self, mpsc::Receiver<JobEvent>) {
        let (events, rx) = EventSender::channel(config.event_channel_capacity);
        let shared = Arc::new(EngineShared {
            store,
            transport,
            config,
            events,
            registry: TransferRegistry::default(),
        });
        (Self { shared }, rx)
    }

    /// Build an engine with the curl transport configured from `config`.
    pub fn with_curl(store: JobStore, config: FdmConfig) -> (Self, mpsc::Receiver<JobEvent>) {
        let transport = Arc::new(CurlTransport::new(config.curl_options()));
        Self::new(store, transport, config)
    }

    pub fn store(&self) -> &JobStore {
        &self.shared.store
    }

    /// Persist a new Pending job and return the stored record.
    pub async fn create_job(&self, new: NewJob) -> Result<JobRecord> {
        let id = self.shared.store.create_job(&new).await?;
        let Some(record) = self.shared.store.get_job(id).await? else {
            bail!("job {id} vanished after creation");
        };
        tracing::info!(job_id = id, url = %record.url, "job created");
        Ok(record)
    }

    /// Start (or restart) a job's transfer. Returns false as a no-op when a
    /// transfer for this id is already running, so a double start never
    /// spawns a second worker set.
    pub async fn start(&self, id: JobId) -> Result<bool> {
        if self.shared.registry.is_active(id) {
            tracing::debug!(job_id = id, "start ignored, transfer already active");
            return Ok(false);
        }
        let Some(mut job) = self.shared.store.get_job(id).await? else {
            bail!("no such job: {id}");
        };

        if job.status.is_terminal() {
            // Explicit restart: the previous attempt's outcome and progress
            // are discarded.
            job.downloaded_bytes = 0;
            job.range_count = 0;
            job.completed_ranges.clear();
            job.completed_at = None;
        } else if job.status == JobStatus::Downloading {
            // Stale Downloading row without an active transfer (e.g. after a
            // crash); treat like a paused job and continue from its progress.
            tracing::info!(job_id = id, "recovering stale downloading job");
        }
        job.status = JobStatus::Downloading;
        job.last_error = None;
        self.shared.store.update_job(&job).await?;

        let shared = Arc::clone(&self.shared);
        let launched = self.shared.registry.activate(id, move |abort| {
            tokio::spawn(pipeline::run_transfer(shared, job, abort))
        });
        if !launched {
            tracing::debug!(job_id = id, "start raced an active transfer, ignored");
        }
        Ok(launched)
    }

    /// Pause an active transfer: signal cancellation, wait until every worker
    /// has stopped and progress is persisted, then record Paused. No-op when
    /// the job has no active transfer.
    pub async fn pause(&self, id: JobId) -> Result<bool> {
        self.halt(id, JobStatus::Paused).await
    }

    /// Cancel an active transfer. Same joining discipline as `pause`, but the
    /// job ends Cancelled; partial file content stays on disk.
    pub async fn stop(&self, id: JobId) -> Result<bool> {
        self.halt(id, JobStatus::Cancelled).await
    }

    /// Resume a Paused job. Loads the persisted record and re-enters `start`,
    /// which picks the restart point from the persisted progress.
    pub async fn resume(&self, id: JobId) -> Result<bool> {
        let Some(job) = self.shared.store.get_job(id).await? else {
            bail!("no such job: {id}");
        };
        if job.status != JobStatus::Paused {
            tracing::debug!(job_id = id, status = job.status.as_str(), "resume ignored");
            return Ok(false);
        }
        self.start(id).await
    }

    /// True while a transfer for the job is running.
    pub fn is_active(&self, id: JobId) -> bool {
        self.shared.registry.is_active(id)
    }

    /// Ids of all jobs with a running transfer.
    pub fn active_jobs(&self) -> Vec<JobId> {
        self.shared.registry.active_jobs()
    }

    async fn halt(&self, id: JobId, target: JobStatus) -> Result<bool> {
        let Some(active) = self.shared.registry.deactivate(id) else {
            tracing::debug!(job_id = id, "no active transfer to halt");
            return Ok(false);
        };
        active.abort.store(true, Ordering::Relaxed);
        if let Err(err) = active.task.await {
            tracing::warn!(job_id = id, "transfer task join failed: {err}");
        }

        let Some(mut job) = self.shared.store.get_job(id).await? else {
            return Ok(false);
        };
        // The pipeline may have reached its own terminal state (completed or
        // failed) before the abort landed; that outcome stands.
        if job.status == JobStatus::Downloading && job.status.can_transition_to(target) {
            job.status = target;
            self.shared.store.update_job(&job).await?;
            tracing::info!(job_id = id, status = target.as_str(), "transfer halted");
            match target {
                JobStatus::Cancelled => self.shared.events.completed(&job).await,
                _ => self.shared.events.progress(&job),
            }
        }
        Ok(true)
    }
}
