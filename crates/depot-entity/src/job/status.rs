//! Job status enumeration and lifecycle rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting to be claimed by a runner.
    Queued,
    /// Claimed and currently executing.
    Started,
    /// Handler completed normally.
    Finished,
    /// Handler raised an unrecovered error.
    Failed,
    /// Cancellation was requested and honored.
    Cancelled,
}

impl JobStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [JobStatus; 5] = [
        Self::Queued,
        Self::Started,
        Self::Finished,
        Self::Failed,
        Self::Cancelled,
    ];

    /// Check if the job is in a terminal state. No transition is defined
    /// out of a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Cancelled)
    }

    /// Check whether a transition from this status to `target` is defined.
    pub fn can_transition_to(&self, target: JobStatus) -> bool {
        matches!(
            (self, target),
            (Self::Queued, Self::Started)
                | (Self::Started, Self::Finished)
                | (Self::Started, Self::Failed)
                | (Self::Queued, Self::Cancelled)
                | (Self::Started, Self::Cancelled)
        )
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Started => "started",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which existing statuses a submission may coalesce onto.
///
/// Coalescing returns an existing equivalent job's code instead of creating
/// a duplicate row when that job is currently in one of the named statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coalesce {
    /// Never coalesce; always create a new job.
    None,
    /// Coalesce onto an equivalent job that is still queued.
    Queued,
    /// Coalesce onto an equivalent job that is queued or already executing.
    QueuedOrStarted,
}

impl Coalesce {
    /// The statuses an existing job may be in for this strategy to reuse it.
    pub fn statuses(&self) -> &'static [JobStatus] {
        match self {
            Self::None => &[],
            Self::Queued => &[JobStatus::Queued],
            Self::QueuedOrStarted => &[JobStatus::Queued, JobStatus::Started],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Started.is_terminal());
        assert!(JobStatus::Finished.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_defined_transitions() {
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Started));
        assert!(JobStatus::Started.can_transition_to(JobStatus::Finished));
        assert!(JobStatus::Started.can_transition_to(JobStatus::Failed));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Cancelled));
        assert!(JobStatus::Started.can_transition_to(JobStatus::Cancelled));
    }

    #[test]
    fn test_no_transition_out_of_terminal() {
        for terminal in [JobStatus::Finished, JobStatus::Failed, JobStatus::Cancelled] {
            for target in JobStatus::ALL {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn test_coalesce_statuses() {
        assert!(Coalesce::None.statuses().is_empty());
        assert_eq!(Coalesce::Queued.statuses(), &[JobStatus::Queued]);
        assert_eq!(
            Coalesce::QueuedOrStarted.statuses(),
            &[JobStatus::Queued, JobStatus::Started]
        );
    }
}
