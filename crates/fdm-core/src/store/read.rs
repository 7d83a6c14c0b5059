//! Job read operations: get, list, and tag filtering.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::BTreeSet;
use std::path::PathBuf;

use super::db::JobStore;
use crate::job::{JobId, JobRecord, JobStatus};

impl JobStore {
    /// Fetch a single job with its tags.
    pub async fn get_job(&self, id: JobId) -> Result<Option<JobRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, url, save_dir, file_name, total_bytes, downloaded_bytes,
                   status, parallelism, range_count, completed_ranges,
                   created_at, completed_at, last_error
            FROM jobs
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut record = record_from_row(&row);
        record.tags = self.load_tags(record.id).await?;
        Ok(Some(record))
    }

    /// List all jobs, newest first.
    pub async fn list_jobs(&self) -> Result<Vec<JobRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, url, save_dir, file_name, total_bytes, downloaded_bytes,
                   status, parallelism, range_count, completed_ranges,
                   created_at, completed_at, last_error
            FROM jobs
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut record = record_from_row(&row);
            record.tags = self.load_tags(record.id).await?;
            out.push(record);
        }
        Ok(out)
    }

    /// List jobs carrying any of `tags`, newest first. An empty tag list
    /// returns all jobs.
    pub async fn list_jobs_by_tags(&self, tags: &[String]) -> Result<Vec<JobRecord>> {
        if tags.is_empty() {
            return self.list_jobs().await;
        }

        let placeholders = (0..tags.len())
            .map(|_| "?")
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r#"
            SELECT DISTINCT j.id, j.url, j.save_dir, j.file_name, j.total_bytes,
                   j.downloaded_bytes, j.status, j.parallelism, j.range_count,
                   j.completed_ranges, j.created_at, j.completed_at, j.last_error
            FROM jobs j
            JOIN tags t ON t.job_id = j.id
            WHERE t.tag IN ({placeholders})
            ORDER BY j.created_at DESC, j.id DESC
            "#
        );
        let mut query = sqlx::query(&sql);
        for tag in tags {
            query = query.bind(tag);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut record = record_from_row(&row);
            record.tags = self.load_tags(record.id).await?;
            out.push(record);
        }
        Ok(out)
    }

    async fn load_tags(&self, id: JobId) -> Result<BTreeSet<String>> {
        let rows = sqlx::query(r#"SELECT tag FROM tags WHERE job_id = ?1"#)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>("tag")).collect())
    }
}

fn record_from_row(row: &SqliteRow) -> JobRecord {
    let save_dir: String = row.get("save_dir");
    let total_bytes: Option<i64> = row.get("total_bytes");
    let downloaded_bytes: i64 = row.get("downloaded_bytes");
    let status: String = row.get("status");
    let parallelism: i64 = row.get("parallelism");
    let range_count: i64 = row.get("range_count");

    JobRecord {
        id: row.get("id"),
        url: row.get("url"),
        save_dir: PathBuf::from(save_dir),
        file_name: row.get("file_name"),
        total_bytes: total_bytes.map(|n| n.max(0) as u64),
        downloaded_bytes: downloaded_bytes.max(0) as u64,
        status: JobStatus::from_str(&status),
        parallelism: parallelism.clamp(1, 10) as u32,
        range_count: range_count.max(0) as u32,
        completed_ranges: row.get("completed_ranges"),
        created_at: row.get("created_at"),
        completed_at: row.get("completed_at"),
        last_error: row.get("last_error"),
        tags: BTreeSet::new(),
    }
}
