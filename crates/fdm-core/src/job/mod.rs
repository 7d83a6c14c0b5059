//! Job data model: the persisted download record and its derived views.

mod status;
mod tags;

pub use status::JobStatus;
pub use tags::{normalize_tags, parse_tag_list};

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;

/// Job identifier, assigned by the store on creation.
pub type JobId = i64;

/// Requested worker parallelism is clamped to this range.
pub const MIN_PARALLELISM: u32 = 1;
pub const MAX_PARALLELISM: u32 = 10;

/// Clamp a requested worker count into [1, 10].
pub fn clamp_parallelism(requested: u32) -> u32 {
    requested.clamp(MIN_PARALLELISM, MAX_PARALLELISM)
}

/// Request to create a new job. Parallelism is clamped and tags normalized
/// by the store before the record is persisted.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub url: String,
    pub save_dir: PathBuf,
    pub file_name: String,
    pub parallelism: u32,
    pub tags: BTreeSet<String>,
}

/// Full persisted job record. This is also the snapshot carried by observer
/// events; consumers get a value copy, never a shared handle.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub url: String,
    pub save_dir: PathBuf,
    pub file_name: String,
    /// Total size in bytes; None until response headers reveal it.
    pub total_bytes: Option<u64>,
    /// Aggregate bytes downloaded, non-decreasing while a transfer is active.
    pub downloaded_bytes: u64,
    pub status: JobStatus,
    /// Requested worker count, already clamped to [1, 10].
    pub parallelism: u32,
    /// Number of ranges in the persisted multi-range plan (0 = none).
    pub range_count: u32,
    /// Completion bitmap for the persisted plan, one bit per range.
    #[serde(skip)]
    pub completed_ranges: Vec<u8>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
    pub last_error: Option<String>,
    pub tags: BTreeSet<String>,
}

impl JobRecord {
    /// Fraction complete in [0.0, 1.0]; 0.0 while the total is unknown.
    pub fn progress_fraction(&self) -> f64 {
        match self.total_bytes {
            Some(total) if total > 0 => {
                (self.downloaded_bytes as f64 / total as f64).min(1.0)
            }
            Some(_) => 1.0,
            None => 0.0,
        }
    }

    /// Final destination path: save_dir joined with file_name.
    pub fn dest_path(&self) -> PathBuf {
        self.save_dir.join(&self.file_name)
    }
}
