//! Chunk worker: one blocking range fetch, positioned writes, throttled
//! progress reports.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::storage::PartFile;
use crate::transport::{FetchRange, Transport, TransportError};

/// Error from a single worker. Storage failures are kept separate from
/// transport failures so the captured job error names the real culprit.
#[derive(Debug, Error)]
pub(crate) enum WorkerError {
    #[error(transparent)]
    Transport(TransportError),
    #[error("storage: {0}")]
    Storage(std::io::Error),
    #[error("length mismatch: expected {expected} bytes, got {received}")]
    Length { expected: u64, received: u64 },
}

/// How a worker ended.
#[derive(Debug)]
pub(crate) enum WorkerOutcome {
    /// Stream ended cleanly with the expected byte count.
    Finished { written: u64 },
    /// Stopped because the abort flag was set.
    Cancelled,
    Failed(WorkerError),
}

/// Message sent from a worker thread to the aggregator. `written` is the
/// worker's local high-water mark: cumulative bytes within its own range.
#[derive(Debug)]
pub(crate) enum WorkerMessage {
    Progress { range_index: usize, written: u64 },
    Done { range_index: usize, outcome: WorkerOutcome },
}

/// One worker's assignment.
#[derive(Debug, Clone)]
pub(crate) struct WorkerTask {
    /// Index of the planned range this worker fills (0 for a single stream).
    pub range_index: usize,
    pub url: String,
    /// Range header for the GET; None on the fresh single-stream path.
    pub range: Option<FetchRange>,
    /// Absolute file offset of the first received byte.
    pub write_base: u64,
    /// Exact byte count the stream must deliver; None when the size is
    /// unknown and clean EOF decides completion.
    pub expected_len: Option<u64>,
    /// Send a progress report after this many unreported bytes.
    pub report_threshold: u64,
}

/// Runs one chunk transfer to completion, cancellation, or error. Called on a
/// dedicated thread; reports flow through `reports` and the final `Done`
/// message is always sent before the thread exits, so the channel closing
/// means every worker has observably stopped.
pub(crate) fn run_worker(
    task: WorkerTask,
    transport: &dyn Transport,
    file: &PartFile,
    abort: &AtomicBool,
    reports: &mpsc::Sender<WorkerMessage>,
) {
    let mut written: u64 = 0;
    let mut unreported: u64 = 0;
    let mut storage_error: Option<std::io::Error> = None;

    let fetch_result = transport.fetch(&task.url, task.range, &mut |data| {
        if abort.load(Ordering::Relaxed) {
            return false;
        }
        if let Err(e) = file.write_at(task.write_base + written, data) {
            storage_error = Some(e);
            return false;
        }
        written += data.len() as u64;
        unreported += data.len() as u64;
        if unreported >= task.report_threshold {
            let _ = reports.blocking_send(WorkerMessage::Progress {
                range_index: task.range_index,
                written,
            });
            unreported = 0;
        }
        true
    });

    if unreported > 0 {
        let _ = reports.blocking_send(WorkerMessage::Progress {
            range_index: task.range_index,
            written,
        });
    }

    let outcome = match fetch_result {
        Ok(()) => match task.expected_len {
            Some(expected) if written != expected => WorkerOutcome::Failed(WorkerError::Length {
                expected,
                received: written,
            }),
            _ => WorkerOutcome::Finished { written },
        },
        Err(TransportError::Aborted) => match storage_error {
            Some(e) => WorkerOutcome::Failed(WorkerError::Storage(e)),
            None => WorkerOutcome::Cancelled,
        },
        Err(e) => WorkerOutcome::Failed(WorkerError::Transport(e)),
    };

    let label = match &outcome {
        WorkerOutcome::Finished { .. } => "finished",
        WorkerOutcome::Cancelled => "cancelled",
        WorkerOutcome::Failed(_) => "failed",
    };
    tracing::debug!(range = task.range_index, written, outcome = label, "worker done");
    let _ = reports.blocking_send(WorkerMessage::Done {
        range_index: task.range_index,
        outcome,
    });
}
