//! `fdm resume <id>` – resume a paused job and wait for it to finish.

use std::collections::BTreeSet;

use anyhow::{bail, Result};
use fdm_core::config::FdmConfig;
use fdm_core::engine::DownloadEngine;
use fdm_core::store::JobStore;

use super::transfers::watch;

pub async fn run_resume(store: JobStore, cfg: &FdmConfig, id: i64) -> Result<()> {
    let (engine, events) = DownloadEngine::with_curl(store, cfg.clone());
    if !engine.resume(id).await? {
        bail!("job {id} is not paused");
    }
    println!("Resumed job {id}");
    watch(&engine, events, BTreeSet::from([id])).await
}
