//! PostgreSQL-backed job store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use depot_core::result::AppResult;
use depot_core::types::pagination::PageRequest;
use depot_database::repositories::job::JobRepository;
use depot_database::repositories::job_data::JobDataRepository;
use depot_entity::data::kind::{JobDataEncoding, JobDataKind};
use depot_entity::data::model::JobData;
use depot_entity::job::model::Job;
use depot_entity::job::spec::JobSpecification;
use depot_entity::job::status::JobStatus;

use super::JobStore;

/// Job store delegating to the PostgreSQL repositories.
#[derive(Debug, Clone)]
pub struct PgJobStore {
    jobs: JobRepository,
    data: JobDataRepository,
}

impl PgJobStore {
    /// Create a store over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            jobs: JobRepository::new(pool.clone()),
            data: JobDataRepository::new(pool),
        }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create_coalescing(
        &self,
        code: &str,
        spec: &JobSpecification,
        coalesce_statuses: &[JobStatus],
        expiry_timestamp: DateTime<Utc>,
    ) -> AppResult<(Job, bool)> {
        self.jobs
            .create_coalescing(code, spec, coalesce_statuses, expiry_timestamp)
            .await
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Option<Job>> {
        self.jobs.find_by_code(code).await
    }

    async fn claim_next(&self, runner_id: &str) -> AppResult<Option<Job>> {
        self.jobs.claim_next(runner_id).await
    }

    async fn mark_finished(&self, code: &str) -> AppResult<bool> {
        self.jobs.mark_finished(code).await
    }

    async fn mark_failed(&self, code: &str) -> AppResult<bool> {
        self.jobs.mark_failed(code).await
    }

    async fn mark_cancelled(&self, code: &str) -> AppResult<bool> {
        self.jobs.mark_cancelled(code).await
    }

    async fn set_progress(&self, code: &str, progress_percent: i32) -> AppResult<bool> {
        self.jobs.set_progress(code, progress_percent).await
    }

    async fn search(
        &self,
        owner_nickname: Option<&str>,
        statuses: &[JobStatus],
        page: &PageRequest,
    ) -> AppResult<Vec<Job>> {
        self.jobs.search(owner_nickname, statuses, page).await
    }

    async fn count(
        &self,
        owner_nickname: Option<&str>,
        statuses: &[JobStatus],
    ) -> AppResult<u64> {
        self.jobs.count(owner_nickname, statuses).await
    }

    async fn find_expired(&self) -> AppResult<Vec<Job>> {
        self.jobs.find_expired().await
    }

    async fn delete_job(&self, code: &str) -> AppResult<bool> {
        self.jobs.delete_by_code(code).await
    }

    async fn create_data(
        &self,
        code: &str,
        use_code: &str,
        kind: JobDataKind,
        media_type_code: &str,
        encoding: JobDataEncoding,
        job_code: Option<&str>,
    ) -> AppResult<JobData> {
        self.data
            .create(code, use_code, kind, media_type_code, encoding, job_code)
            .await
    }

    async fn find_data_by_code(&self, code: &str) -> AppResult<Option<JobData>> {
        self.data.find_by_code(code).await
    }

    async fn find_generated_by_job(&self, job_code: &str) -> AppResult<Vec<JobData>> {
        self.data.find_generated_by_job(job_code).await
    }

    async fn find_orphaned_supplied(
        &self,
        older_than: DateTime<Utc>,
    ) -> AppResult<Vec<JobData>> {
        self.data.find_orphaned_supplied(older_than).await
    }

    async fn delete_data(&self, code: &str) -> AppResult<bool> {
        self.data.delete_by_code(code).await
    }
}
