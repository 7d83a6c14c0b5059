//! `fdm remove <id>` – delete a job record. Files on disk are kept.

use anyhow::Result;
use fdm_core::store::JobStore;

pub async fn run_remove(store: &JobStore, id: i64) -> Result<()> {
    store.delete_job(id).await?;
    println!("Removed job {id}");
    Ok(())
}
