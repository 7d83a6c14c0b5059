//! `fdm run [ids..]` – execute pending jobs with live progress.

use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use tokio::sync::mpsc;

use fdm_core::config::FdmConfig;
use fdm_core::engine::{DownloadEngine, JobEvent};
use fdm_core::job::{JobId, JobStatus};
use fdm_core::store::JobStore;

pub async fn run_transfers(store: JobStore, cfg: &FdmConfig, ids: Vec<i64>) -> Result<()> {
    let pending: Vec<JobId> = if ids.is_empty() {
        store
            .list_jobs()
            .await?
            .into_iter()
            .filter(|j| j.status == JobStatus::Pending)
            .map(|j| j.id)
            .collect()
    } else {
        ids
    };
    if pending.is_empty() {
        println!("No pending jobs.");
        return Ok(());
    }

    let (engine, events) = DownloadEngine::with_curl(store, cfg.clone());
    let mut started = BTreeSet::new();
    for id in pending {
        if engine.start(id).await? {
            started.insert(id);
        } else {
            tracing::warn!(job_id = id, "job not started");
        }
    }

    watch(&engine, events, started).await
}

/// Consume engine events until every watched job reaches a terminal state.
/// Ctrl-C pauses all active transfers and returns.
pub(crate) async fn watch(
    engine: &DownloadEngine,
    mut events: mpsc::Receiver<JobEvent>,
    mut remaining: BTreeSet<JobId>,
) -> Result<()> {
    let mut last_percent: HashMap<JobId, u64> = HashMap::new();
    while !remaining.is_empty() {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nPausing active transfers...");
                for id in engine.active_jobs() {
                    engine.pause(id).await?;
                    println!("Paused job {id}");
                }
                break;
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    JobEvent::Progress(job) => {
                        if job.status != JobStatus::Downloading {
                            continue;
                        }
                        let percent = (job.progress_fraction() * 100.0) as u64;
                        let shown = last_percent.entry(job.id).or_insert(u64::MAX);
                        if *shown != percent {
                            *shown = percent;
                            match job.total_bytes {
                                Some(total) => println!(
                                    "job {}: {percent}% ({}/{} bytes)",
                                    job.id, job.downloaded_bytes, total
                                ),
                                None => println!(
                                    "job {}: {} bytes",
                                    job.id, job.downloaded_bytes
                                ),
                            }
                        }
                    }
                    JobEvent::Completed(job) => {
                        remaining.remove(&job.id);
                        match job.status {
                            JobStatus::Completed => {
                                println!("job {}: completed -> {}", job.id, job.dest_path().display());
                            }
                            JobStatus::Failed => {
                                println!(
                                    "job {}: failed ({})",
                                    job.id,
                                    job.last_error.as_deref().unwrap_or("unknown error")
                                );
                            }
                            status => println!("job {}: {}", job.id, status.as_str()),
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
