//! Observer notifications: a channel of job snapshots consumed by the caller.

use crate::job::JobRecord;
use tokio::sync::mpsc;

/// Event emitted by the engine. Both variants carry a full value snapshot of
/// the job at emission time; consumers never share mutable state with the
/// engine.
#[derive(Debug, Clone)]
pub enum JobEvent {
    /// Progress update while a transfer is running (also emitted when a job
    /// is paused, with the Paused snapshot).
    Progress(JobRecord),
    /// Terminal transition: Completed, Failed, or Cancelled.
    Completed(JobRecord),
}

impl JobEvent {
    pub fn job(&self) -> &JobRecord {
        match self {
            JobEvent::Progress(j) | JobEvent::Completed(j) => j,
        }
    }
}

/// Sending half used inside the engine.
///
/// Progress events are lossy under backpressure (a slow consumer drops
/// intermediate snapshots, never blocks a transfer); terminal events are
/// delivered as long as the receiver is alive.
#[derive(Clone)]
pub(crate) struct EventSender {
    tx: mpsc::Sender<JobEvent>,
}

impl EventSender {
    pub(crate) fn channel(capacity: usize) -> (Self, mpsc::Receiver<JobEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    pub(crate) fn progress(&self, job: &JobRecord) {
        let _ = self.tx.try_send(JobEvent::Progress(job.clone()));
    }

    pub(crate) async fn completed(&self, job: &JobRecord) {
        let _ = self.tx.send(JobEvent::Completed(job.clone())).await;
    }
}
