//! Chunk range type and partition planning.

/// One contiguous byte interval of a job's content, fetched by one worker.
/// Offsets are inclusive on both ends, matching the HTTP Range header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    /// First byte offset (inclusive).
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl ChunkRange {
    /// Length of this range in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// True when the transfer should be split into concurrent ranged GETs.
///
/// Falls back to a single stream when the total size is unknown, only one
/// worker was requested, or the server does not advertise range support.
pub fn should_split(total_bytes: Option<u64>, parallelism: u32, accepts_ranges: bool) -> bool {
    match total_bytes {
        Some(total) => total > 0 && parallelism > 1 && accepts_ranges,
        None => false,
    }
}

/// Partitions `[0, total_bytes)` into `count` contiguous inclusive ranges.
///
/// Every range except the last has length `total_bytes / count`; the last
/// absorbs the remainder so the union is exact and gapless. When
/// `total_bytes < count` the count is reduced to `total_bytes` so no range is
/// empty. Returns an empty plan for a zero-byte resource.
pub fn plan_ranges(total_bytes: u64, count: u32) -> Vec<ChunkRange> {
    if total_bytes == 0 || count == 0 {
        return Vec::new();
    }
    let count = u64::from(count).min(total_bytes);
    let chunk = total_bytes / count;

    let mut out = Vec::with_capacity(count as usize);
    for i in 0..count {
        let start = i * chunk;
        let end = if i == count - 1 {
            total_bytes - 1
        } else {
            (i + 1) * chunk - 1
        };
        out.push(ChunkRange { start, end });
    }
    out
}
