//! Range planning: partition a known-size transfer into worker ranges and
//! track per-range completion for resume.

mod bitmap;
mod range;

pub use bitmap::RangeBitmap;
pub use range::{plan_ranges, should_split, ChunkRange};
