//! `fdm add <url>` – create a new download job.

use anyhow::Result;
use std::path::PathBuf;

use std::collections::BTreeSet;

use fdm_core::config::FdmConfig;
use fdm_core::job::{parse_tag_list, NewJob};
use fdm_core::naming;
use fdm_core::store::JobStore;

pub async fn run_add(
    store: &JobStore,
    cfg: &FdmConfig,
    url: &str,
    dir: Option<PathBuf>,
    file_name: Option<String>,
    threads: u32,
    tags: &[String],
) -> Result<()> {
    let save_dir = match dir.or_else(|| cfg.download_dir.clone()) {
        Some(d) => d,
        None => std::env::current_dir()?,
    };
    let file_name = file_name.unwrap_or_else(|| naming::file_name_for_url(url));
    // Each --tag may itself carry a comma-separated list.
    let tags: BTreeSet<String> = tags.iter().flat_map(|t| parse_tag_list(t)).collect();
    let new = NewJob {
        url: url.to_string(),
        save_dir,
        file_name: file_name.clone(),
        parallelism: threads,
        tags,
    };
    let id = store.create_job(&new).await?;
    println!("Added job {id}: {url} -> {file_name}");
    Ok(())
}
