//! Immutable point-in-time views of a job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::Job;
use super::status::JobStatus;

/// Reference to a generated data entry attached to a job snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDataRef {
    /// The data entry's code.
    pub code: String,
    /// The logical use label (e.g. `"report"`).
    pub use_code: String,
    /// Media type of the payload.
    pub media_type_code: String,
    /// Suggested download filename.
    pub filename: String,
}

/// A read-only copy of a job's status and metadata.
///
/// Snapshots are what the orchestrator hands to callers; mutating one has
/// no effect on the persisted job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// External job identifier.
    pub code: String,
    /// Job type identifier.
    pub job_type_code: String,
    /// Nickname of the owning user, if any.
    pub owner_nickname: Option<String>,
    /// Lifecycle status at snapshot time.
    pub status: JobStatus,
    /// Progress through execution, 0–100.
    pub progress_percent: Option<i32>,
    /// When the job entered the queue.
    pub queue_timestamp: DateTime<Utc>,
    /// When a runner claimed the job.
    pub start_timestamp: Option<DateTime<Utc>>,
    /// When the handler completed normally.
    pub finish_timestamp: Option<DateTime<Utc>>,
    /// When the handler failed.
    pub fail_timestamp: Option<DateTime<Utc>>,
    /// When cancellation was recorded.
    pub cancel_timestamp: Option<DateTime<Utc>>,
    /// Generated data entries produced by this job.
    pub generated_data: Vec<GeneratedDataRef>,
}

impl JobSnapshot {
    /// Build a snapshot from a persisted job and its generated data refs.
    pub fn from_job(job: &Job, generated_data: Vec<GeneratedDataRef>) -> Self {
        Self {
            code: job.code.clone(),
            job_type_code: job.job_type_code.clone(),
            owner_nickname: job.owner_nickname.clone(),
            status: job.status,
            progress_percent: job.progress_percent,
            queue_timestamp: job.queue_timestamp,
            start_timestamp: job.start_timestamp,
            finish_timestamp: job.finish_timestamp,
            fail_timestamp: job.fail_timestamp,
            cancel_timestamp: job.cancel_timestamp,
            generated_data,
        }
    }
}
