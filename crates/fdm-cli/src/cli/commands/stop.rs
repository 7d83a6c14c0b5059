//! `fdm stop <id>` – cancel a downloading job; partial data stays on disk.

use anyhow::{bail, Result};
use fdm_core::job::JobStatus;
use fdm_core::store::JobStore;

pub async fn run_stop(store: &JobStore, id: i64) -> Result<()> {
    let Some(mut job) = store.get_job(id).await? else {
        bail!("no such job: {id}");
    };
    if job.status == JobStatus::Downloading {
        job.status = JobStatus::Cancelled;
        store.update_job(&job).await?;
        println!("Cancelled job {id}");
    } else {
        println!("Job {id} is {}, nothing to cancel", job.status.as_str());
    }
    Ok(())
}
