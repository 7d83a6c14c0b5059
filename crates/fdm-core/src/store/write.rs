//! Job write operations: create, update, delete.

use anyhow::Result;

use super::db::{unix_timestamp, JobStore};
use crate::job::{clamp_parallelism, normalize_tags, JobId, JobRecord, JobStatus, NewJob};

impl JobStore {
    /// Insert a new Pending job and its tags; returns the assigned id.
    ///
    /// Parallelism is clamped to [1, 10] and tags normalized here so every
    /// record entering the store already satisfies the model invariants.
    pub async fn create_job(&self, new: &NewJob) -> Result<JobId> {
        let now = unix_timestamp();
        let parallelism = clamp_parallelism(new.parallelism) as i64;
        let tags = normalize_tags(&new.tags);

        let mut tx = self.pool.begin().await?;
        let id = sqlx::query(
            r#"
            INSERT INTO jobs (
                url, save_dir, file_name, total_bytes, downloaded_bytes,
                status, parallelism, range_count, completed_ranges,
                created_at, updated_at, completed_at, last_error
            ) VALUES (?1, ?2, ?3, NULL, 0, ?4, ?5, 0, x'', ?6, ?6, NULL, NULL)
            "#,
        )
        .bind(&new.url)
        .bind(new.save_dir.to_string_lossy().as_ref())
        .bind(&new.file_name)
        .bind(JobStatus::Pending.as_str())
        .bind(parallelism)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for tag in &tags {
            sqlx::query(r#"INSERT OR IGNORE INTO tags (job_id, tag) VALUES (?1, ?2)"#)
                .bind(id)
                .bind(tag)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(id)
    }

    /// Write back every mutable field of an existing job record.
    ///
    /// Tags are fixed at creation and not touched here; the identity fields
    /// (id, url, created_at) never change.
    pub async fn update_job(&self, job: &JobRecord) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE jobs
            SET save_dir = ?1,
                file_name = ?2,
                total_bytes = ?3,
                downloaded_bytes = ?4,
                status = ?5,
                parallelism = ?6,
                range_count = ?7,
                completed_ranges = ?8,
                updated_at = ?9,
                completed_at = ?10,
                last_error = ?11
            WHERE id = ?12
            "#,
        )
        .bind(job.save_dir.to_string_lossy().as_ref())
        .bind(&job.file_name)
        .bind(job.total_bytes.map(|n| n as i64))
        .bind(job.downloaded_bytes as i64)
        .bind(job.status.as_str())
        .bind(job.parallelism as i64)
        .bind(job.range_count as i64)
        .bind(&job.completed_ranges)
        .bind(now)
        .bind(job.completed_at)
        .bind(&job.last_error)
        .bind(job.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Permanently remove a job row and its tags.
    ///
    /// File cleanup is handled by higher layers, never here.
    pub async fn delete_job(&self, id: JobId) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(r#"DELETE FROM tags WHERE job_id = ?1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(r#"DELETE FROM jobs WHERE id = ?1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
