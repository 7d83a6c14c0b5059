//! Disk I/O for in-flight downloads.
//!
//! Downloads stream into a `.part` file next to the destination, written with
//! positioned writes so concurrent workers stay independent, then renamed
//! atomically on completion.

mod writer;

pub use writer::PartFile;

/// Suffix for in-progress files before the atomic rename.
pub const PART_SUFFIX: &str = ".part";

/// Path for the part file: appends `.part` to the final path
/// (`file.iso` → `file.iso.part`).
pub fn part_path(final_path: &std::path::Path) -> std::path::PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(PART_SUFFIX);
    std::path::PathBuf::from(o)
}
