//! `fdm status` – show all jobs, optionally filtered by tag.

use anyhow::Result;
use fdm_core::store::JobStore;

pub async fn run_status(store: &JobStore, tags: &[String], json: bool) -> Result<()> {
    let jobs = store.list_jobs_by_tags(tags).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }

    if jobs.is_empty() {
        println!("No jobs in database.");
        return Ok(());
    }

    println!(
        "{:<6} {:<12} {:<9} {:<12} {:<20} {}",
        "ID", "STATUS", "PROGRESS", "SIZE", "TAGS", "URL"
    );
    for j in jobs {
        let size = j
            .total_bytes
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let progress = match j.total_bytes {
            Some(_) => format!("{:.0}%", j.progress_fraction() * 100.0),
            None => "-".to_string(),
        };
        let tags = j.tags.iter().cloned().collect::<Vec<_>>().join(",");
        println!(
            "{:<6} {:<12} {:<9} {:<12} {:<20} {}",
            j.id,
            j.status.as_str(),
            progress,
            size,
            tags,
            j.url
        );
    }
    Ok(())
}
