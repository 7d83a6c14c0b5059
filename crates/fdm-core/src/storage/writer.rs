//! Positioned-write handle for in-progress download files.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(unix)]
use std::os::unix::fs::FileExt;
#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Writer for a `.part` download file. Cheap to clone and safe to share across
/// worker threads; each `write_at` is an independent pwrite that never moves a
/// shared cursor, so concurrent workers writing disjoint ranges cannot corrupt
/// each other.
#[derive(Clone)]
pub struct PartFile {
    file: Arc<File>,
    part_path: PathBuf,
}

impl PartFile {
    /// Create (or truncate) the part file for a fresh transfer.
    pub fn create(part_path: &Path) -> Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(part_path)
            .with_context(|| format!("create part file: {}", part_path.display()))?;
        Ok(PartFile {
            file: Arc::new(file),
            part_path: part_path.to_path_buf(),
        })
    }

    /// Open an existing part file for resume (read+write, no truncation).
    pub fn open_resume(part_path: &Path) -> Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .open(part_path)
            .with_context(|| format!("open part file for resume: {}", part_path.display()))?;
        Ok(PartFile {
            file: Arc::new(file),
            part_path: part_path.to_path_buf(),
        })
    }

    /// Preallocate `size` bytes. On Unix tries `posix_fallocate` for real block
    /// allocation; falls back to `set_len` on failure or non-Unix.
    pub fn preallocate(&self, size: u64) -> Result<()> {
        #[cfg(unix)]
        {
            let r = unsafe { libc::posix_fallocate(self.file.as_raw_fd(), 0, size as libc::off_t) };
            if r == 0 {
                return Ok(());
            }
            tracing::debug!(errno = r, "posix_fallocate failed, falling back to set_len");
        }
        self.file.set_len(size).context("preallocate part file")?;
        Ok(())
    }

    /// Write `data` at `offset` without touching the file's logical cursor.
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> std::io::Result<()> {
        let n = self.file.write_at(data, offset)?;
        if n != data.len() {
            return Err(std::io::Error::other(format!(
                "short write: {} of {}",
                n,
                data.len()
            )));
        }
        Ok(())
    }

    /// Non-Unix fallback: seek + write on a cloned descriptor.
    #[cfg(not(unix))]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> std::io::Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        let mut f = self.file.try_clone()?;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(data)?;
        Ok(())
    }

    /// Sync file data to disk. Call before `finalize` for durability.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all().context("sync part file")?;
        Ok(())
    }

    /// Path to the part file on disk.
    pub fn part_path(&self) -> &Path {
        &self.part_path
    }

    /// Atomically rename the part file to `final_path`, consuming the writer.
    /// Fails if `final_path` is on a different filesystem.
    pub fn finalize(self, final_path: &Path) -> Result<()> {
        let part_path = self.part_path.clone();
        drop(self.file);
        std::fs::rename(&part_path, final_path).with_context(|| {
            format!(
                "rename {} to {}",
                part_path.display(),
                final_path.display()
            )
        })?;
        Ok(())
    }
}
