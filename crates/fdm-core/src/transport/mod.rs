//! HTTP transport consumed by the engine.
//!
//! The engine only needs two capabilities: probe a URL for size and range
//! support, and stream a (possibly ranged) GET body into a sink. Everything
//! else about HTTP stays behind this seam, so tests can substitute an
//! in-memory transport and the engine logic never touches libcurl directly.

mod curl_client;
mod parse;

pub use curl_client::{CurlOptions, CurlTransport};

use thiserror::Error;

/// Transport-level failure: non-success status or connection breakdown.
/// `Aborted` is the expected control-flow signal when the sink stops a
/// transfer (cancellation), not a user-visible error.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP {0}")]
    Status(u32),
    #[error("connection: {0}")]
    Connection(String),
    #[error("transfer aborted by caller")]
    Aborted,
}

/// Byte range for a GET request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRange {
    /// `bytes=start-end`, both inclusive. Used by chunk workers.
    Bounded { start: u64, end: u64 },
    /// `bytes=start-`, open tail. Used when resuming a single-stream job.
    From { start: u64 },
}

impl FetchRange {
    /// Range value in the `start-end` form libcurl expects (no `bytes=` prefix).
    pub fn curl_value(&self) -> String {
        match self {
            FetchRange::Bounded { start, end } => format!("{start}-{end}"),
            FetchRange::From { start } => format!("{start}-"),
        }
    }
}

/// Result of a metadata probe: the headers the planner cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    /// Total size in bytes, if the server sent `Content-Length`.
    pub total_bytes: Option<u64>,
    /// True if the server advertised `Accept-Ranges: bytes`.
    pub accepts_ranges: bool,
}

/// Sink receiving body increments. Return `false` to abort the transfer;
/// the fetch then returns `TransportError::Aborted`.
pub type BodySink<'a> = dyn FnMut(&[u8]) -> bool + 'a;

/// Blocking HTTP client. Implementations must be shareable across worker
/// threads; each call may run on any thread.
pub trait Transport: Send + Sync {
    /// HEAD request returning size and range support.
    fn probe(&self, url: &str) -> Result<ProbeResult, TransportError>;

    /// GET request streaming the body into `sink` as it arrives.
    ///
    /// With a `range`, the server must answer `206 Partial Content`; a server
    /// that ignores the range and replies 200 would corrupt positioned writes,
    /// so that is reported as a status error.
    fn fetch(
        &self,
        url: &str,
        range: Option<FetchRange>,
        sink: &mut BodySink<'_>,
    ) -> Result<(), TransportError>;
}

/// Status acceptance: ranged requests require 206, plain requests any 2xx.
pub(crate) fn status_acceptable(code: u32, ranged: bool) -> bool {
    if ranged {
        code == 206
    } else {
        (200..300).contains(&code)
    }
}
