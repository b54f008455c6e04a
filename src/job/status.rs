use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a single job.
///
/// Each variant lists its own successors; `CANCELLED` and `FINISHED` have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Prospective,
    NotStarted,
    Pending,
    Cancelled,
    Finished,
}

impl JobStatus {
    pub fn permitted_transitions(self) -> &'static [JobStatus] {
        match self {
            JobStatus::Prospective => &[JobStatus::NotStarted, JobStatus::Cancelled],
            JobStatus::NotStarted => &[JobStatus::Pending, JobStatus::Cancelled],
            JobStatus::Pending => &[JobStatus::Cancelled, JobStatus::Finished],
            JobStatus::Cancelled => &[],
            JobStatus::Finished => &[],
        }
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        self.permitted_transitions().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.permitted_transitions().is_empty()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Prospective => "prospective",
            JobStatus::NotStarted => "not_started",
            JobStatus::Pending => "pending",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Finished => "finished",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a job leaves `NOT_STARTED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    /// Waits for an explicit confirmation.
    Manual,
    /// Starts on its computed date.
    #[default]
    Automatic,
}

impl JobMode {
    pub fn requires_confirmation(self) -> bool {
        matches!(self, JobMode::Manual)
    }
}
