//! Job lifecycle states and the allowed transition table.

use serde::{Deserialize, Serialize};

/// High-level job state, stored as a string in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Downloading,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Downloading => "downloading",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "pending" => JobStatus::Pending,
            "downloading" => JobStatus::Downloading,
            "paused" => JobStatus::Paused,
            "completed" => JobStatus::Completed,
            "cancelled" => JobStatus::Cancelled,
            _ => JobStatus::Failed,
        }
    }

    /// Completed, Failed, and Cancelled end the transfer attempt; none of them
    /// auto-transitions. A fresh `start` is required to run the job again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// True if `self -> next` is an allowed automatic transition.
    ///
    /// Terminal states only re-enter Downloading through an explicit restart,
    /// which is modeled here as an allowed edge so the controller can reuse
    /// the same check.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Pending, Downloading) => true,
            (Paused, Downloading) => true,
            (Downloading, Paused) => true,
            (Downloading, Cancelled) => true,
            (Downloading, Completed) => true,
            (Downloading, Failed) => true,
            // Explicit restart from a terminal attempt.
            (Completed | Failed | Cancelled, Downloading) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_string_roundtrip() {
        for s in [
            JobStatus::Pending,
            JobStatus::Downloading,
            JobStatus::Paused,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            assert_eq!(JobStatus::from_str(s.as_str()), s);
        }
        assert_eq!(JobStatus::from_str("garbage"), JobStatus::Failed);
    }

    #[test]
    fn terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Downloading.is_terminal());
        assert!(!JobStatus::Paused.is_terminal());
    }

    #[test]
    fn transition_table_matches_state_machine() {
        use JobStatus::*;
        assert!(Pending.can_transition_to(Downloading));
        assert!(Paused.can_transition_to(Downloading));
        assert!(Downloading.can_transition_to(Paused));
        assert!(Downloading.can_transition_to(Cancelled));
        assert!(Downloading.can_transition_to(Completed));
        assert!(Downloading.can_transition_to(Failed));

        // No automatic exits from terminal states other than explicit restart.
        assert!(!Completed.can_transition_to(Paused));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Cancelled.can_transition_to(Paused));
        assert!(Completed.can_transition_to(Downloading));

        // Pausing something that never started makes no sense.
        assert!(!Pending.can_transition_to(Paused));
        assert!(!Paused.can_transition_to(Completed));
    }
}
