//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use depot_core::result::AppResult;
use depot_core::AppError;

use super::spec::JobSpecification;
use super::status::JobStatus;

/// A persisted background job.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Surrogate primary key.
    pub id: i64,
    /// External 36-character identifier.
    pub code: String,
    /// Job type identifier (e.g. `"spreadsheet-export"`).
    pub job_type_code: String,
    /// Nickname of the owning user, if any.
    pub owner_nickname: Option<String>,
    /// The serialized specification parameters (a JSON object).
    pub specification: Value,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Progress through the current execution, 0–100.
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
    /// When the retention sweep may remove this job once terminal.
    pub expiry_timestamp: DateTime<Utc>,
    /// When the row was created.
    pub create_timestamp: DateTime<Utc>,
    /// When the row was last updated.
    pub modify_timestamp: DateTime<Utc>,
}

impl Job {
    /// Reconstruct the specification this job was submitted with.
    pub fn to_specification(&self) -> JobSpecification {
        JobSpecification {
            job_type_code: self.job_type_code.clone(),
            owner_nickname: self.owner_nickname.clone(),
            parameters: self.specification.clone(),
            supplied_data_codes: Vec::new(),
        }
    }

    /// Whether this job describes the same work as `spec` for coalescing.
    pub fn matches_specification(&self, spec: &JobSpecification) -> bool {
        self.job_type_code == spec.job_type_code
            && self.owner_nickname == spec.owner_nickname
            && self.specification == spec.parameters
    }

    /// Verify the cross-field invariants that must hold on every write.
    ///
    /// - a finish timestamp requires a start timestamp;
    /// - a finish timestamp requires progress of exactly 100;
    /// - a progress value requires a start or finish timestamp;
    /// - the status must agree with the timestamps that are set.
    pub fn check_invariants(&self) -> AppResult<()> {
        if self.finish_timestamp.is_some() && self.start_timestamp.is_none() {
            return Err(AppError::internal(format!(
                "job [{}] finished without a start timestamp",
                self.code
            )));
        }

        if self.finish_timestamp.is_some() && self.progress_percent != Some(100) {
            return Err(AppError::internal(format!(
                "job [{}] finished with progress {:?}",
                self.code, self.progress_percent
            )));
        }

        if self.progress_percent.is_some()
            && self.start_timestamp.is_none()
            && self.finish_timestamp.is_none()
        {
            return Err(AppError::internal(format!(
                "job [{}] has progress but was never started",
                self.code
            )));
        }

        if let Some(p) = self.progress_percent {
            if !(0..=100).contains(&p) {
                return Err(AppError::internal(format!(
                    "job [{}] has progress {p} outside 0..=100",
                    self.code
                )));
            }
        }

        let status_ok = match self.status {
            JobStatus::Queued => {
                self.start_timestamp.is_none()
                    && self.finish_timestamp.is_none()
                    && self.fail_timestamp.is_none()
                    && self.cancel_timestamp.is_none()
            }
            JobStatus::Started => {
                self.start_timestamp.is_some()
                    && self.finish_timestamp.is_none()
                    && self.fail_timestamp.is_none()
                    && self.cancel_timestamp.is_none()
            }
            JobStatus::Finished => {
                self.finish_timestamp.is_some()
                    && self.fail_timestamp.is_none()
                    && self.cancel_timestamp.is_none()
            }
            JobStatus::Failed => self.fail_timestamp.is_some() && self.cancel_timestamp.is_none(),
            JobStatus::Cancelled => self.cancel_timestamp.is_some(),
        };

        if !status_ok {
            return Err(AppError::internal(format!(
                "job [{}] status {} disagrees with its timestamps",
                self.code, self.status
            )));
        }

        Ok(())
    }
}

/// A claim record binding a queued job to exactly one runner.
///
/// The unique constraint on `code` is what makes claiming atomic: two
/// runners racing for the same job cannot both insert an assignment.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobAssignment {
    /// Surrogate primary key.
    pub id: i64,
    /// The code of the claimed job.
    pub code: String,
    /// Identifier of the runner holding the claim.
    pub runner_id: String,
    /// When the claim was taken.
    pub create_timestamp: DateTime<Utc>,
}
