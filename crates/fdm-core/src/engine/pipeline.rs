//! Transfer pipeline for one job: probe, plan, spawn workers, aggregate,
//! finish. One pipeline task runs per active job; it owns the job record for
//! the duration of the attempt and always leaves a persisted status behind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use super::aggregator::{run_aggregator, Aggregation, TransferVerdict};
use super::worker::{run_worker, WorkerMessage, WorkerTask};
use super::EngineShared;
use crate::job::{clamp_parallelism, JobRecord, JobStatus};
use crate::planner::{plan_ranges, should_split, ChunkRange, RangeBitmap};
use crate::storage::{self, PartFile};
use crate::store::db::unix_timestamp;
use crate::transport::FetchRange;

/// Entry point spawned by the controller. Never panics the runtime: every
/// outcome is folded into a persisted job status before the registry entry is
/// released.
pub(crate) async fn run_transfer(
    shared: Arc<EngineShared>,
    job: JobRecord,
    abort: Arc<AtomicBool>,
) {
    let id = job.id;
    if let Err(err) = drive(&shared, job, &abort).await {
        // drive() converts transfer failures into a Failed record itself; an
        // error here means even that bookkeeping could not be persisted.
        tracing::error!(job_id = id, "transfer bookkeeping failed: {err:#}");
    }
    shared.registry.release(id);
}

/// How the worker phase ended.
enum RunEnd {
    Complete { file: PartFile },
    Aborted,
    Failed(String),
}

async fn drive(
    shared: &EngineShared,
    mut job: JobRecord,
    abort: &Arc<AtomicBool>,
) -> Result<()> {
    match prepare_and_run(shared, &mut job, abort).await {
        Ok(RunEnd::Complete { file }) => finish_complete(shared, job, file).await,
        Ok(RunEnd::Aborted) => {
            tracing::info!(job_id = job.id, "transfer stopped on request");
            Ok(())
        }
        Ok(RunEnd::Failed(msg)) => fail_job(shared, job, &msg).await,
        Err(err) => {
            let msg = format!("{err:#}");
            fail_job(shared, job, &msg).await
        }
    }
}

async fn prepare_and_run(
    shared: &EngineShared,
    job: &mut JobRecord,
    abort: &Arc<AtomicBool>,
) -> Result<RunEnd> {
    // Headers probe. Size and range support decide the plan shape.
    let probe = {
        let transport = Arc::clone(&shared.transport);
        let url = job.url.clone();
        tokio::task::spawn_blocking(move || transport.probe(&url))
            .await
            .context("probe task join")?
    };
    let probe = match probe {
        Ok(p) => p,
        Err(e) => return Ok(RunEnd::Failed(format!("probe failed: {e}"))),
    };
    if let Some(total) = probe.total_bytes {
        // A changed remote size invalidates any persisted progress: offsets
        // from the old content would corrupt the new one.
        if job.total_bytes.is_some_and(|t| t != total)
            && (job.downloaded_bytes > 0 || job.range_count > 0)
        {
            tracing::info!(job_id = job.id, "remote size changed, restarting from scratch");
            discard_resume_state(job);
        }
        job.total_bytes = Some(total);
    }

    let dest = job.dest_path();
    let part = storage::part_path(&dest);
    tokio::fs::create_dir_all(&job.save_dir)
        .await
        .with_context(|| format!("create destination dir: {}", job.save_dir.display()))?;

    // Resume state is only valid while the part file is still on disk.
    let part_exists = tokio::fs::try_exists(&part).await.unwrap_or(false);
    if !part_exists && (job.downloaded_bytes > 0 || job.range_count > 0) {
        tracing::info!(job_id = job.id, "part file missing, restarting from scratch");
        discard_resume_state(job);
    }
    if let Some(total) = job.total_bytes {
        if job.downloaded_bytes > total {
            tracing::warn!(job_id = job.id, "persisted progress exceeds total, restarting");
            discard_resume_state(job);
        }
    }

    let parallelism = clamp_parallelism(job.parallelism);
    let threshold = shared.config.progress_threshold_bytes.max(1);

    // Plan the attempt: reuse a persisted multi-range plan, split fresh, or
    // fall back to one stream.
    let mut ranges: Vec<ChunkRange> = Vec::new();
    let mut bitmap = RangeBitmap::default();
    let mut single_resume_from: u64 = 0;
    if job.range_count > 1 {
        match job.total_bytes {
            Some(total) if probe.accepts_ranges => {
                ranges = plan_ranges(total, job.range_count);
                bitmap = RangeBitmap::from_bytes(&job.completed_ranges, ranges.len());
            }
            _ => {
                // A ranged plan cannot continue without range support (or a
                // size); the file has holes, so the only safe move is a full
                // single-stream restart.
                tracing::info!(job_id = job.id, "cannot resume ranged plan, restarting");
                discard_resume_state(job);
            }
        }
    } else if job.downloaded_bytes == 0
        && should_split(job.total_bytes, parallelism, probe.accepts_ranges)
    {
        let total = job.total_bytes.unwrap_or(0);
        ranges = plan_ranges(total, parallelism);
        bitmap = RangeBitmap::new(ranges.len());
        job.range_count = ranges.len() as u32;
        job.completed_ranges = bitmap.to_bytes(ranges.len());
    }
    if ranges.is_empty() {
        // Single stream. Restart offset survives only when the server still
        // honors ranges; otherwise the whole body comes again from zero.
        if job.downloaded_bytes > 0 && probe.accepts_ranges {
            single_resume_from = job.downloaded_bytes;
        } else if job.downloaded_bytes > 0 {
            tracing::info!(job_id = job.id, "server lacks range support, restarting");
            discard_resume_state(job);
        }
        job.range_count = 0;
        job.completed_ranges.clear();
    }

    // Worker assignments and the byte count already settled on disk.
    let range_count = ranges.len();
    let mut baseline: u64 = 0;
    let mut tasks: Vec<WorkerTask> = Vec::new();
    if range_count > 0 {
        for (i, r) in ranges.iter().enumerate() {
            if bitmap.is_completed(i) {
                baseline += r.len();
            } else {
                tasks.push(WorkerTask {
                    range_index: i,
                    url: job.url.clone(),
                    range: Some(FetchRange::Bounded {
                        start: r.start,
                        end: r.end,
                    }),
                    write_base: r.start,
                    expected_len: Some(r.len()),
                    report_threshold: threshold,
                });
            }
        }
    } else {
        baseline = single_resume_from;
        let remaining = job.total_bytes.map(|t| t - single_resume_from);
        if remaining != Some(0) {
            tasks.push(WorkerTask {
                range_index: 0,
                url: job.url.clone(),
                range: (single_resume_from > 0).then_some(FetchRange::From {
                    start: single_resume_from,
                }),
                write_base: single_resume_from,
                expected_len: remaining,
                report_threshold: threshold,
            });
        }
    }

    // Persist the plan so a crash mid-transfer still resumes; best-effort.
    if shared.store.update_job(job).await.is_err() {
        tracing::warn!(job_id = job.id, "persisting transfer plan failed");
    }

    let resuming = part_exists && baseline > 0;
    let file = if resuming {
        PartFile::open_resume(&part)?
    } else {
        let f = PartFile::create(&part)?;
        if let Some(total) = job.total_bytes {
            if total > 0 {
                f.preallocate(total)?;
            }
        }
        f
    };

    if abort.load(Ordering::Relaxed) {
        return Ok(RunEnd::Aborted);
    }

    tracing::info!(
        job_id = job.id,
        workers = tasks.len(),
        total = job.total_bytes,
        resumed_bytes = baseline,
        "starting transfer"
    );

    // One thread per incomplete range; reports flow to the aggregator task.
    let (tx, rx) = mpsc::channel::<WorkerMessage>(64);
    let mut handles = Vec::with_capacity(tasks.len());
    for task in tasks {
        let transport = Arc::clone(&shared.transport);
        let file = file.clone();
        let abort = Arc::clone(abort);
        let tx = tx.clone();
        let name = format!("fdm-worker-{}-{}", job.id, task.range_index);
        let handle = std::thread::Builder::new()
            .name(name)
            .spawn(move || run_worker(task, transport.as_ref(), &file, &abort, &tx))
            .context("spawn worker thread")?;
        handles.push(handle);
    }
    drop(tx);

    let agg = Aggregation {
        job: job.clone(),
        bitmap,
        range_count,
        baseline,
    };
    let (updated, bitmap, verdict) =
        run_aggregator(&shared.store, &shared.events, abort, agg, rx).await;
    *job = updated;

    // The report channel closing means every worker sent its Done; joining
    // afterwards is bookkeeping, not synchronization.
    tokio::task::spawn_blocking(move || {
        for h in handles {
            let _ = h.join();
        }
    })
    .await
    .context("worker join task")?;

    match verdict {
        TransferVerdict::Complete => {
            // A worker that died without reporting (a bug, not a transport
            // failure) must not look like success.
            let complete = if range_count > 0 {
                bitmap.all_completed(range_count)
            } else {
                match job.total_bytes {
                    Some(total) => job.downloaded_bytes == total,
                    None => true,
                }
            };
            if complete {
                Ok(RunEnd::Complete { file })
            } else {
                Ok(RunEnd::Failed("transfer ended with missing bytes".into()))
            }
        }
        TransferVerdict::Aborted => {
            if file.sync().is_err() {
                tracing::warn!(job_id = job.id, "sync after abort failed");
            }
            if shared.store.update_job(job).await.is_err() {
                tracing::warn!(job_id = job.id, "persisting progress after abort failed");
            }
            Ok(RunEnd::Aborted)
        }
        TransferVerdict::Failed(msg) => Ok(RunEnd::Failed(msg)),
    }
}

/// All bytes are on disk: sync, rename into place, record completion.
async fn finish_complete(shared: &EngineShared, mut job: JobRecord, file: PartFile) -> Result<()> {
    let dest = job.dest_path();
    file.sync().context("sync completed file")?;
    file.finalize(&dest).context("finalize completed file")?;

    match job.total_bytes {
        Some(total) => job.downloaded_bytes = total,
        // Unknown-size stream: the total is whatever cleanly arrived.
        None => job.total_bytes = Some(job.downloaded_bytes),
    }
    job.status = JobStatus::Completed;
    job.completed_at = Some(unix_timestamp());
    job.last_error = None;
    shared
        .store
        .update_job(&job)
        .await
        .context("persist completed status")?;
    tracing::info!(job_id = job.id, "job completed: {}", dest.display());
    shared.events.completed(&job).await;
    Ok(())
}

/// Terminal failure: capture the error, persist, announce.
async fn fail_job(shared: &EngineShared, mut job: JobRecord, msg: &str) -> Result<()> {
    tracing::warn!(job_id = job.id, "job failed: {msg}");
    job.status = JobStatus::Failed;
    job.last_error = Some(msg.to_string());
    shared
        .store
        .update_job(&job)
        .await
        .context("persist failed status")?;
    shared.events.completed(&job).await;
    Ok(())
}

fn discard_resume_state(job: &mut JobRecord) {
    job.downloaded_bytes = 0;
    job.range_count = 0;
    job.completed_ranges.clear();
}
