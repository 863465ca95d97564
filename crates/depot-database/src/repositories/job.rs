//! Job repository implementation.
//!
//! The two operations here that need stronger-than-read-committed atomicity
//! (the coalescing submit and the queued-job claim) each run inside their
//! own transaction; everything else is a single statement.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing;

use depot_core::error::{AppError, ErrorKind};
use depot_core::result::AppResult;
use depot_core::types::pagination::PageRequest;
use depot_entity::job::model::Job;
use depot_entity::job::spec::JobSpecification;
use depot_entity::job::status::JobStatus;

/// Advisory lock key serializing coalescing submits across processes.
/// Held transactionally, so it is released with the submit transaction.
const JOB_SUBMIT_LOCK_KEY: i64 = 0x6a6f_625f_7375_626d;

/// Repository for job rows and queue operations.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: PgPool,
}

/// Statuses as their enum labels, for binding as a `text[]` parameter that
/// the SQL casts to `job_status[]`.
fn status_labels(statuses: &[JobStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

impl JobRepository {
    /// Create a new job repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a job by its external code.
    pub async fn find_by_code(&self, code: &str) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job", e))
    }

    /// Atomically coalesce onto an equivalent existing job or insert a new
    /// QUEUED row.
    ///
    /// The whole check-then-insert runs in one transaction holding the job
    /// submit advisory lock, so two racing submits of the same identity
    /// cannot both insert. Returns the job and whether it was newly created.
    pub async fn create_coalescing(
        &self,
        code: &str,
        spec: &JobSpecification,
        coalesce_statuses: &[JobStatus],
        expiry_timestamp: DateTime<Utc>,
    ) -> AppResult<(Job, bool)> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin submit transaction", e)
        })?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(JOB_SUBMIT_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to take submit lock", e)
            })?;

        if !coalesce_statuses.is_empty() {
            // Candidates ordered most-recently-active first so the best job
            // is reused when several are equivalent.
            let candidates = sqlx::query_as::<_, Job>(
                "SELECT * FROM jobs \
                 WHERE job_type_code = $1 AND status = ANY($2::job_status[]) \
                 ORDER BY start_timestamp DESC NULLS LAST, queue_timestamp DESC, id DESC",
            )
            .bind(&spec.job_type_code)
            .bind(status_labels(coalesce_statuses))
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find coalescible jobs", e)
            })?;

            if let Some(existing) = candidates
                .into_iter()
                .find(|job| job.matches_specification(spec))
            {
                tx.commit().await.map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to commit submit", e)
                })?;
                tracing::debug!(
                    code = %existing.code,
                    job_type = %existing.job_type_code,
                    "Coalesced submission onto existing job"
                );
                return Ok((existing, false));
            }
        }

        let job = sqlx::query_as::<_, Job>(
            "INSERT INTO jobs \
             (code, job_type_code, owner_nickname, specification, status, queue_timestamp, expiry_timestamp) \
             VALUES ($1, $2, $3, $4, 'queued', NOW(), $5) RETURNING *",
        )
        .bind(code)
        .bind(&spec.job_type_code)
        .bind(&spec.owner_nickname)
        .bind(&spec.parameters)
        .bind(expiry_timestamp)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert job", e))?;

        // Attach any referenced supplied data to the new job.
        for data_code in &spec.supplied_data_codes {
            let attached = sqlx::query(
                "UPDATE job_data SET job_code = $1 \
                 WHERE code = $2 AND kind = 'supplied' AND job_code IS NULL",
            )
            .bind(code)
            .bind(data_code)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to attach supplied data", e)
            })?;

            if attached.rows_affected() == 0 {
                return Err(AppError::validation(format!(
                    "supplied data [{data_code}] is missing or already attached to a job"
                )));
            }
        }

        tx.commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit submit", e))?;

        Ok((job, true))
    }

    /// Claim the oldest unclaimed QUEUED job for `runner_id`.
    ///
    /// The `FOR UPDATE SKIP LOCKED` subquery plus the unique assignment
    /// insert guarantee at most one runner wins a given job.
    pub async fn claim_next(&self, runner_id: &str) -> AppResult<Option<Job>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin claim transaction", e)
        })?;

        let job = sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = 'started', start_timestamp = NOW(), \
             progress_percent = 0, modify_timestamp = NOW() \
             WHERE id IN ( \
                SELECT id FROM jobs WHERE status = 'queued' \
                ORDER BY queue_timestamp ASC, id ASC \
                FOR UPDATE SKIP LOCKED \
                LIMIT 1 \
             ) RETURNING *",
        )
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim job", e))?;

        let Some(job) = job else {
            tx.rollback().await.ok();
            return Ok(None);
        };

        sqlx::query("INSERT INTO job_assignments (code, runner_id) VALUES ($1, $2)")
            .bind(&job.code)
            .bind(runner_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to record job assignment", e)
            })?;

        tx.commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit claim", e))?;

        tracing::debug!(code = %job.code, runner_id, "Claimed job");
        Ok(Some(job))
    }

    /// Mark a started job as finished. Returns `false` if the job was no
    /// longer in the STARTED state (e.g. cancelled mid-run).
    pub async fn mark_finished(&self, code: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'finished', finish_timestamp = NOW(), \
             progress_percent = 100, modify_timestamp = NOW() \
             WHERE code = $1 AND status = 'started'",
        )
        .bind(code)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to finish job", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark a started job as failed. Returns `false` if the job was no
    /// longer in the STARTED state.
    pub async fn mark_failed(&self, code: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'failed', fail_timestamp = NOW(), \
             modify_timestamp = NOW() \
             WHERE code = $1 AND status = 'started'",
        )
        .bind(code)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to fail job", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark a non-terminal job as cancelled. Returns `false` if the job was
    /// already terminal, making cancellation requests idempotent.
    pub async fn mark_cancelled(&self, code: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'cancelled', cancel_timestamp = NOW(), \
             modify_timestamp = NOW() \
             WHERE code = $1 AND status IN ('queued', 'started')",
        )
        .bind(code)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to cancel job", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a progress update for a started job. Updates outside the
    /// STARTED state are ignored (late progress after cancellation).
    pub async fn set_progress(&self, code: &str, progress_percent: i32) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET progress_percent = $2, modify_timestamp = NOW() \
             WHERE code = $1 AND status = 'started'",
        )
        .bind(code)
        .bind(progress_percent)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to set job progress", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Page through jobs for an optional owner and status filter, most
    /// recently queued first. An empty status slice means no status filter.
    pub async fn search(
        &self,
        owner_nickname: Option<&str>,
        statuses: &[JobStatus],
        page: &PageRequest,
    ) -> AppResult<Vec<Job>> {
        sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs \
             WHERE ($1::text IS NULL OR owner_nickname = $1) \
             AND (cardinality($2::text[]) = 0 OR status = ANY($2::job_status[])) \
             ORDER BY queue_timestamp DESC, id DESC \
             LIMIT $3 OFFSET $4",
        )
        .bind(owner_nickname)
        .bind(status_labels(statuses))
        .bind(page.limit as i64)
        .bind(page.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to search jobs", e))
    }

    /// Count jobs matching the same filters as [`Self::search`].
    pub async fn count(
        &self,
        owner_nickname: Option<&str>,
        statuses: &[JobStatus],
    ) -> AppResult<u64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM jobs \
             WHERE ($1::text IS NULL OR owner_nickname = $1) \
             AND (cardinality($2::text[]) = 0 OR status = ANY($2::job_status[]))",
        )
        .bind(owner_nickname)
        .bind(status_labels(statuses))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count jobs", e))?;

        Ok(total as u64)
    }

    /// Find terminal jobs whose expiry has passed; candidates for the sweep.
    pub async fn find_expired(&self) -> AppResult<Vec<Job>> {
        sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs \
             WHERE status IN ('finished', 'failed', 'cancelled') \
             AND expiry_timestamp < NOW()",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find expired jobs", e))
    }

    /// Delete a job row; the assignment cascades.
    pub async fn delete_by_code(&self, code: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM jobs WHERE code = $1")
            .bind(code)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete job", e))?;

        Ok(result.rows_affected() > 0)
    }
}
