//! Progress aggregation: the single writer of a job's aggregate state.
//!
//! Workers send value messages; this loop is the only code that mutates the
//! job record while a transfer runs. It keeps `downloaded_bytes` monotone,
//! persists best-effort, and emits observer snapshots.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use super::events::EventSender;
use super::worker::{WorkerMessage, WorkerOutcome};
use crate::job::JobRecord;
use crate::planner::RangeBitmap;
use crate::store::JobStore;

/// Verdict of the aggregation loop, consumed by the pipeline.
#[derive(Debug)]
pub(crate) enum TransferVerdict {
    /// Every worker finished cleanly and the byte count is complete.
    Complete,
    /// The abort flag was set by a user pause/stop; progress is persisted,
    /// the final status is the controller's to decide.
    Aborted,
    /// A worker failed while no cancellation was requested.
    Failed(String),
}

/// State for one aggregation run.
pub(crate) struct Aggregation {
    pub job: JobRecord,
    pub bitmap: RangeBitmap,
    /// Ranges in the active plan; 0 on the single-stream path.
    pub range_count: usize,
    /// Bytes already on disk when this attempt started (completed ranges on a
    /// multi-range resume, or the restart offset of a single-stream resume).
    pub baseline: u64,
}

/// Drains worker messages until every worker has sent its `Done` and dropped
/// its sender. On the first failure the abort flag is raised so sibling
/// workers stop on their own cancellation instead of being waited out.
pub(crate) async fn run_aggregator(
    store: &JobStore,
    events: &EventSender,
    abort: &AtomicBool,
    mut agg: Aggregation,
    mut reports: mpsc::Receiver<WorkerMessage>,
) -> (JobRecord, RangeBitmap, TransferVerdict) {
    // Per-range local high-water marks for this attempt. Ranges completed in
    // a previous attempt never report; they are covered by the baseline.
    let mut written = vec![0u64; agg.range_count.max(1)];
    let mut failure: Option<String> = None;

    while let Some(msg) = reports.recv().await {
        match msg {
            WorkerMessage::Progress {
                range_index,
                written: w,
            } => {
                if let Some(slot) = written.get_mut(range_index) {
                    *slot = (*slot).max(w);
                }
                let sum = clamped_sum(&agg, &written);
                if sum > agg.job.downloaded_bytes {
                    agg.job.downloaded_bytes = sum;
                    persist_progress(store, &agg.job).await;
                    events.progress(&agg.job);
                }
            }
            WorkerMessage::Done {
                range_index,
                outcome,
            } => match outcome {
                WorkerOutcome::Finished { written: w } => {
                    if let Some(slot) = written.get_mut(range_index) {
                        *slot = (*slot).max(w);
                    }
                    let sum = clamped_sum(&agg, &written);
                    agg.job.downloaded_bytes = agg.job.downloaded_bytes.max(sum);
                    if agg.range_count > 0 {
                        agg.bitmap.set_completed(range_index);
                        agg.job.completed_ranges = agg.bitmap.to_bytes(agg.range_count);
                    }
                    persist_progress(store, &agg.job).await;
                    events.progress(&agg.job);
                }
                WorkerOutcome::Cancelled => {
                    tracing::debug!(job_id = agg.job.id, range = range_index, "worker cancelled");
                }
                WorkerOutcome::Failed(err) => {
                    if abort.load(Ordering::Relaxed) {
                        // Cancellation already in progress; its outcome takes
                        // precedence over a racing transport error.
                        tracing::debug!(
                            job_id = agg.job.id,
                            range = range_index,
                            "worker error during cancellation: {err}"
                        );
                    } else if failure.is_none() {
                        tracing::warn!(
                            job_id = agg.job.id,
                            range = range_index,
                            "worker failed: {err}"
                        );
                        failure = Some(err.to_string());
                        // Stop the remaining workers; each observes the flag
                        // at its next write step.
                        abort.store(true, Ordering::Relaxed);
                    }
                }
            },
        }
    }

    let verdict = if let Some(msg) = failure {
        TransferVerdict::Failed(msg)
    } else if abort.load(Ordering::Relaxed) {
        TransferVerdict::Aborted
    } else {
        TransferVerdict::Complete
    };
    (agg.job, agg.bitmap, verdict)
}

/// Aggregate byte count, never above the known total even if a stream
/// overruns its range.
fn clamped_sum(agg: &Aggregation, written: &[u64]) -> u64 {
    let sum = agg.baseline + written.iter().sum::<u64>();
    match agg.job.total_bytes {
        Some(total) => sum.min(total),
        None => sum,
    }
}

/// Durable progress is best-effort: a store hiccup must not kill a transfer.
async fn persist_progress(store: &JobStore, job: &JobRecord) {
    if store.update_job(job).await.is_err() {
        tracing::warn!(job_id = job.id, "durable progress update failed");
    }
}
