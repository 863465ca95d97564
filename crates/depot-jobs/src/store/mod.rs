//! Persistence seam for the orchestrator.
//!
//! The orchestration logic is storage-agnostic above this trait; the
//! database-distributed and in-process implementations below provide the
//! same atomicity guarantees by different means (advisory-locked
//! transactions and `SKIP LOCKED` claims versus a single mutex).

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use depot_core::result::AppResult;
use depot_core::types::pagination::PageRequest;
use depot_entity::data::kind::{JobDataEncoding, JobDataKind};
use depot_entity::data::model::JobData;
use depot_entity::job::model::Job;
use depot_entity::job::spec::JobSpecification;
use depot_entity::job::status::JobStatus;

pub use memory::MemoryJobStore;
pub use pg::PgJobStore;

/// Durable state behind the job orchestrator.
///
/// Status transitions are guarded: a `mark_*` call reports whether it
/// changed anything, and a job already in a terminal state is never moved
/// out of it.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Atomically return an equivalent existing job in one of
    /// `coalesce_statuses`, or insert a new QUEUED row under `code`.
    /// The boolean is `true` when a new row was created.
    async fn create_coalescing(
        &self,
        code: &str,
        spec: &JobSpecification,
        coalesce_statuses: &[JobStatus],
        expiry_timestamp: DateTime<Utc>,
    ) -> AppResult<(Job, bool)>;

    /// Find a job by its external code.
    async fn find_by_code(&self, code: &str) -> AppResult<Option<Job>>;

    /// Claim the oldest unclaimed QUEUED job for `runner_id`, recording the
    /// assignment and transitioning it to STARTED. At most one runner can
    /// win a given job.
    async fn claim_next(&self, runner_id: &str) -> AppResult<Option<Job>>;

    /// STARTED → FINISHED with progress 100. `false` when not STARTED.
    async fn mark_finished(&self, code: &str) -> AppResult<bool>;

    /// STARTED → FAILED. `false` when not STARTED.
    async fn mark_failed(&self, code: &str) -> AppResult<bool>;

    /// QUEUED or STARTED → CANCELLED. `false` when already terminal.
    async fn mark_cancelled(&self, code: &str) -> AppResult<bool>;

    /// Record a progress update while STARTED; ignored otherwise.
    async fn set_progress(&self, code: &str, progress_percent: i32) -> AppResult<bool>;

    /// Jobs filtered by optional owner and statuses (empty = all), most
    /// recently queued first.
    async fn search(
        &self,
        owner_nickname: Option<&str>,
        statuses: &[JobStatus],
        page: &PageRequest,
    ) -> AppResult<Vec<Job>>;

    /// Count of jobs matching the same filters as [`Self::search`].
    async fn count(&self, owner_nickname: Option<&str>, statuses: &[JobStatus])
        -> AppResult<u64>;

    /// Terminal jobs whose expiry timestamp has passed.
    async fn find_expired(&self) -> AppResult<Vec<Job>>;

    /// Delete a job and its assignment.
    async fn delete_job(&self, code: &str) -> AppResult<bool>;

    /// Insert a job data row.
    async fn create_data(
        &self,
        code: &str,
        use_code: &str,
        kind: JobDataKind,
        media_type_code: &str,
        encoding: JobDataEncoding,
        job_code: Option<&str>,
    ) -> AppResult<JobData>;

    /// Find a data row by code.
    async fn find_data_by_code(&self, code: &str) -> AppResult<Option<JobData>>;

    /// Generated data rows owned by a job.
    async fn find_generated_by_job(&self, job_code: &str) -> AppResult<Vec<JobData>>;

    /// Supplied data rows never attached to a job, older than the moment.
    async fn find_orphaned_supplied(&self, older_than: DateTime<Utc>)
        -> AppResult<Vec<JobData>>;

    /// Delete a data row.
    async fn delete_data(&self, code: &str) -> AppResult<bool>;
}
