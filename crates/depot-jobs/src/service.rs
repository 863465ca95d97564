//! The job orchestration service.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing;

use depot_core::config::{JobsConfig, StorageConfig};
use depot_core::result::AppResult;
use depot_core::traits::datastore::DataStore;
use depot_core::types::code;
use depot_core::types::pagination::{PageRequest, PageResponse};
use depot_core::AppError;
use depot_entity::data::kind::{JobDataEncoding, JobDataKind};
use depot_entity::data::model::JobData;
use depot_entity::job::model::Job;
use depot_entity::job::snapshot::{GeneratedDataRef, JobSnapshot};
use depot_entity::job::spec::JobSpecification;
use depot_entity::job::status::{Coalesce, JobStatus};
use depot_storage::chunk::split_into_parts;
use depot_storage::{MemoryDataStore, PgDataStore};

use crate::cancel::CancelMap;
use crate::store::{JobStore, MemoryJobStore, PgJobStore};

/// Interval between polls while awaiting a job's completion.
const AWAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The scheduling state machine over jobs, their data, and their blobs.
///
/// Handlers never talk to the stores directly; everything flows through
/// this service so that lifecycle transitions stay status-guarded and
/// coalescing stays atomic.
#[derive(Debug)]
pub struct JobService {
    store: Arc<dyn JobStore>,
    data_store: Arc<dyn DataStore>,
    cancels: CancelMap,
    work_available: Arc<Notify>,
    part_size_bytes: usize,
    ttl: chrono::Duration,
}

impl JobService {
    /// Create a service over explicit store implementations.
    pub fn new(
        store: Arc<dyn JobStore>,
        data_store: Arc<dyn DataStore>,
        storage: &StorageConfig,
        jobs: &JobsConfig,
    ) -> Self {
        Self {
            store,
            data_store,
            cancels: CancelMap::new(),
            work_available: Arc::new(Notify::new()),
            part_size_bytes: storage.part_size_bytes,
            ttl: chrono::Duration::seconds(jobs.ttl_seconds as i64),
        }
    }

    /// Create a PostgreSQL-backed service over a connection pool.
    pub fn postgres(pool: PgPool, storage: &StorageConfig, jobs: &JobsConfig) -> Self {
        let blob_repo = depot_database::repositories::blob::BlobRepository::new(pool.clone());
        Self::new(
            Arc::new(PgJobStore::new(pool)),
            Arc::new(PgDataStore::new(blob_repo)),
            storage,
            jobs,
        )
    }

    /// Create a fully in-process service; state lives for the lifetime of
    /// the value.
    pub fn in_memory(storage: &StorageConfig, jobs: &JobsConfig) -> Self {
        Self::new(
            Arc::new(MemoryJobStore::new()),
            Arc::new(MemoryDataStore::new()),
            storage,
            jobs,
        )
    }

    /// Notifier signalled whenever a new job becomes available to claim.
    pub fn work_notifier(&self) -> Arc<Notify> {
        Arc::clone(&self.work_available)
    }

    // ------------------------------
    // SUBMISSION AND QUERIES

    /// Submit a specification for asynchronous execution.
    ///
    /// If an equivalent job exists in a status named by `coalesce`, its code
    /// is returned and no new work is scheduled; the caller cannot tell the
    /// difference except through the returned job's already-advanced state.
    pub async fn submit(&self, spec: &JobSpecification, coalesce: Coalesce) -> AppResult<String> {
        spec.validate()?;

        for data_code in &spec.supplied_data_codes {
            if self.store.find_data_by_code(data_code).await?.is_none() {
                return Err(AppError::validation(format!(
                    "supplied data [{data_code}] is not known"
                )));
            }
        }

        let code = code::generate_code();
        let expiry_timestamp = Utc::now() + self.ttl;

        let (job, created) = self
            .store
            .create_coalescing(&code, spec, coalesce.statuses(), expiry_timestamp)
            .await?;

        if created {
            tracing::info!(
                code = %job.code,
                job_type = %job.job_type_code,
                owner = job.owner_nickname.as_deref().unwrap_or("-"),
                "Queued job"
            );
            self.work_available.notify_waiters();
        } else {
            tracing::debug!(
                code = %job.code,
                job_type = %job.job_type_code,
                status = %job.status,
                "Submission coalesced onto existing job"
            );
        }

        Ok(job.code)
    }

    /// Snapshot a job by code, if it exists.
    pub async fn try_get_job(&self, job_code: &str) -> AppResult<Option<JobSnapshot>> {
        let Some(job) = self.store.find_by_code(job_code).await? else {
            return Ok(None);
        };
        Ok(Some(self.snapshot(&job).await?))
    }

    /// Snapshot a job by code; unknown codes are a NotFound error.
    pub async fn get_job(&self, job_code: &str) -> AppResult<JobSnapshot> {
        self.try_get_job(job_code)
            .await?
            .ok_or_else(|| AppError::not_found(format!("no job with code [{job_code}]")))
    }

    /// Page through jobs, most recently queued first.
    ///
    /// `statuses: Some(&[])` is an explicit empty set and short-circuits to
    /// an empty page without touching storage; `None` means all statuses.
    pub async fn find_jobs(
        &self,
        owner_nickname: Option<&str>,
        statuses: Option<&[JobStatus]>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<JobSnapshot>> {
        if matches!(statuses, Some(s) if s.is_empty()) {
            return Ok(PageResponse::empty(page.offset));
        }

        let statuses = statuses.unwrap_or(&[]);
        let jobs = self.store.search(owner_nickname, statuses, page).await?;
        let total = self.store.count(owner_nickname, statuses).await?;

        let mut items = Vec::with_capacity(jobs.len());
        for job in &jobs {
            items.push(self.snapshot(job).await?);
        }

        Ok(PageResponse::new(items, page.offset, total))
    }

    /// Count of jobs matching the [`Self::find_jobs`] filters.
    pub async fn total_jobs(
        &self,
        owner_nickname: Option<&str>,
        statuses: Option<&[JobStatus]>,
    ) -> AppResult<u64> {
        if matches!(statuses, Some(s) if s.is_empty()) {
            return Ok(0);
        }
        self.store
            .count(owner_nickname, statuses.unwrap_or(&[]))
            .await
    }

    /// Block until the job leaves the QUEUED/STARTED states, or the timeout
    /// elapses. Returns whether the job finished in time.
    pub async fn await_job_finished(&self, job_code: &str, timeout: Duration) -> AppResult<bool> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let job = self
                .store
                .find_by_code(job_code)
                .await?
                .ok_or_else(|| AppError::not_found(format!("no job with code [{job_code}]")))?;

            if job.status.is_terminal() {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(AWAIT_POLL_INTERVAL).await;
        }
    }

    // ------------------------------
    // CANCELLATION AND PROGRESS

    /// Request cancellation of a job.
    ///
    /// Idempotent: the CANCELLED status is recorded immediately if the job
    /// is non-terminal, and the executing handler (if any) is signalled to
    /// stop at its next checkpoint. A request against a terminal job has no
    /// effect and returns `false`.
    pub async fn request_cancel(&self, job_code: &str) -> AppResult<bool> {
        if self.store.find_by_code(job_code).await?.is_none() {
            return Err(AppError::not_found(format!(
                "no job with code [{job_code}]"
            )));
        }

        let changed = self.store.mark_cancelled(job_code).await?;

        if changed {
            self.cancels.cancel(job_code);
            tracing::info!(code = job_code, "Cancelled job");
        }

        Ok(changed)
    }

    /// Record a handler progress update; values outside 0–100 are rejected.
    /// Updates against a job that is no longer STARTED are ignored.
    pub async fn set_job_progress(&self, job_code: &str, progress_percent: i32) -> AppResult<bool> {
        if !(0..=100).contains(&progress_percent) {
            return Err(AppError::validation(format!(
                "bad progress percent value [{progress_percent}]"
            )));
        }

        let changed = self.store.set_progress(job_code, progress_percent).await?;
        if changed {
            tracing::debug!(code = job_code, progress_percent, "Job progress");
        }
        Ok(changed)
    }

    // ------------------------------
    // RUNNER SURFACE

    /// Claim the oldest queued job for a runner, registering a cancellation
    /// token for the execution. Called by the runner pool only.
    pub async fn claim_next_job(
        &self,
        runner_id: &str,
    ) -> AppResult<Option<(Job, CancellationToken)>> {
        let Some(job) = self.store.claim_next(runner_id).await? else {
            return Ok(None);
        };

        tracing::info!(
            code = %job.code,
            job_type = %job.job_type_code,
            runner_id,
            "Started job"
        );

        let token = self.cancels.register(&job.code);
        Ok(Some((job, token)))
    }

    /// Record normal handler completion. Returns `false` when the job had
    /// already left the STARTED state (e.g. cancelled mid-run), in which
    /// case the recorded status is left untouched.
    pub async fn complete_job(&self, job_code: &str) -> AppResult<bool> {
        let changed = self.store.mark_finished(job_code).await?;
        self.cancels.remove(job_code);

        if changed {
            tracing::info!(code = job_code, "Finished job");
        }
        Ok(changed)
    }

    /// Record a handler failure. The error never propagates to submitters;
    /// it is observable only as the FAILED status.
    pub async fn fail_job(&self, job_code: &str) -> AppResult<bool> {
        let changed = self.store.mark_failed(job_code).await?;
        self.cancels.remove(job_code);

        if changed {
            tracing::warn!(code = job_code, "Failed job");
        }
        Ok(changed)
    }

    /// Drop the cancellation token of a job whose execution ended without a
    /// terminal write from the runner (cancelled mid-run).
    pub fn release_cancel_token(&self, job_code: &str) {
        self.cancels.remove(job_code);
    }

    // ------------------------------
    // DATA INPUT AND OUTPUT

    /// Store caller-supplied input bytes prior to submission.
    pub async fn store_supplied_data(
        &self,
        use_code: &str,
        media_type_code: &str,
        encoding: JobDataEncoding,
        payload: Bytes,
    ) -> AppResult<JobData> {
        code::ensure_use_code(use_code)?;
        if media_type_code.is_empty() {
            return Err(AppError::validation("the media type code is required"));
        }

        let data_code = code::generate_code();
        let chunks = split_into_parts(payload, self.part_size_bytes);
        let length = self.data_store.put(&data_code, chunks).await?;

        let data = self
            .store
            .create_data(
                &data_code,
                use_code,
                JobDataKind::Supplied,
                media_type_code,
                encoding,
                None,
            )
            .await?;

        tracing::info!(code = %data.code, use_code, bytes = length, "Stored supplied job data");
        Ok(data)
    }

    /// Store bytes generated by a running job.
    pub async fn store_generated_data(
        &self,
        job_code: &str,
        use_code: &str,
        media_type_code: &str,
        encoding: JobDataEncoding,
        payload: Bytes,
    ) -> AppResult<JobData> {
        code::ensure_use_code(use_code)?;
        if media_type_code.is_empty() {
            return Err(AppError::validation("the media type code is required"));
        }

        if self.store.find_by_code(job_code).await?.is_none() {
            return Err(AppError::not_found(format!(
                "no job with code [{job_code}]"
            )));
        }

        let data_code = code::generate_code();
        let chunks = split_into_parts(payload, self.part_size_bytes);
        let length = self.data_store.put(&data_code, chunks).await?;

        let data = self
            .store
            .create_data(
                &data_code,
                use_code,
                JobDataKind::Generated,
                media_type_code,
                encoding,
                Some(job_code),
            )
            .await?;

        tracing::info!(
            code = %data.code,
            job = job_code,
            use_code,
            bytes = length,
            "Stored generated job data"
        );
        Ok(data)
    }

    /// Look up a data entry by code, if it exists.
    pub async fn try_get_data(&self, data_code: &str) -> AppResult<Option<JobData>> {
        self.store.find_data_by_code(data_code).await
    }

    /// Fetch a data entry together with its payload bytes; unknown codes
    /// are a NotFound error.
    pub async fn get_data_payload(&self, data_code: &str) -> AppResult<(JobData, Bytes)> {
        let data = self
            .store
            .find_data_by_code(data_code)
            .await?
            .ok_or_else(|| AppError::not_found(format!("no job data with code [{data_code}]")))?;

        let payload = self.data_store.get(&data.code).await?;
        Ok((data, payload))
    }

    /// Suggest a download filename for a data entry. Purely a presentation
    /// helper; nothing is persisted.
    pub async fn derive_data_filename(&self, data_code: &str) -> AppResult<String> {
        let data = self
            .store
            .find_data_by_code(data_code)
            .await?
            .ok_or_else(|| AppError::not_found(format!("no job data with code [{data_code}]")))?;

        let owning_job = match &data.job_code {
            Some(job_code) => self.store.find_by_code(job_code).await?,
            None => None,
        };

        let descriptor = owning_job
            .as_ref()
            .map(|job| job.job_type_code.clone())
            .unwrap_or_else(|| data.use_code.clone());

        let timestamp = owning_job
            .as_ref()
            .map(|job| job.finish_timestamp.unwrap_or(job.queue_timestamp))
            .unwrap_or_else(Utc::now);

        Ok(format!(
            "depot_{}_{}_{}.{}",
            descriptor,
            timestamp.format("%Y%m%d%H%M%S"),
            &data.code[..4],
            data.filename_extension()
        ))
    }

    // ------------------------------
    // RETENTION SWEEP

    /// Remove terminal jobs past their expiry together with their generated
    /// data, then supplied data that was never attached to a job, then blob
    /// heads no data row references. Externally triggered; there is no
    /// implicit timer. Returns the number of jobs removed.
    pub async fn clear_expired_jobs(&self) -> AppResult<u64> {
        let mut removed = 0u64;

        for job in self.store.find_expired().await? {
            for data in self.store.find_generated_by_job(&job.code).await? {
                if let Err(e) = self.data_store.remove(&data.code).await {
                    tracing::error!(code = %data.code, error = %e, "Unable to remove job data payload");
                    continue;
                }
                self.store.delete_data(&data.code).await?;
            }

            if self.store.delete_job(&job.code).await? {
                removed += 1;
                tracing::info!(code = %job.code, job_type = %job.job_type_code, "Purged expired job");
            }
        }

        // Supplied data may be stored and never referenced by a submission;
        // cull entries older than the TTL.
        let cutoff = Utc::now() - self.ttl;
        for data in self.store.find_orphaned_supplied(cutoff).await? {
            if let Err(e) = self.data_store.remove(&data.code).await {
                tracing::error!(code = %data.code, error = %e, "Unable to remove orphaned payload");
                continue;
            }
            self.store.delete_data(&data.code).await?;
            tracing::info!(code = %data.code, "Purged orphaned supplied job data");
        }

        // Blob heads can outlive their data rows if a removal failed part
        // way; sweep any old head no row references.
        let ttl_std = self.ttl.to_std().unwrap_or_default();
        for blob_code in self.data_store.keys(ttl_std).await? {
            if self.store.find_data_by_code(&blob_code).await?.is_none() {
                self.data_store.remove(&blob_code).await?;
                tracing::info!(code = %blob_code, "Purged unreferenced blob");
            }
        }

        Ok(removed)
    }

    // ------------------------------

    async fn snapshot(&self, job: &Job) -> AppResult<JobSnapshot> {
        let mut generated = Vec::new();

        for data in self.store.find_generated_by_job(&job.code).await? {
            let filename = self.derive_data_filename(&data.code).await?;
            generated.push(GeneratedDataRef {
                code: data.code,
                use_code: data.use_code,
                media_type_code: data.media_type_code,
                filename,
            });
        }

        Ok(JobSnapshot::from_job(job, generated))
    }
}
