//! `fdm pause <id>` – pause a downloading job.
//!
//! Inside `fdm run`, Ctrl-C pauses through the engine. This command covers a
//! job left in Downloading by an interrupted process, so it can be resumed.

use anyhow::{bail, Result};
use fdm_core::job::JobStatus;
use fdm_core::store::JobStore;

pub async fn run_pause(store: &JobStore, id: i64) -> Result<()> {
    let Some(mut job) = store.get_job(id).await? else {
        bail!("no such job: {id}");
    };
    if job.status == JobStatus::Downloading {
        job.status = JobStatus::Paused;
        store.update_job(&job).await?;
        println!("Paused job {id}");
    } else {
        println!("Job {id} is {}, nothing to pause", job.status.as_str());
    }
    Ok(())
}
