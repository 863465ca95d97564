//! Job data repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use depot_core::error::{AppError, ErrorKind};
use depot_core::result::AppResult;
use depot_entity::data::kind::{JobDataEncoding, JobDataKind};
use depot_entity::data::model::JobData;

/// Repository for job data rows.
#[derive(Debug, Clone)]
pub struct JobDataRepository {
    pool: PgPool,
}

impl JobDataRepository {
    /// Create a new job data repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new data entry and return it.
    pub async fn create(
        &self,
        code: &str,
        use_code: &str,
        kind: JobDataKind,
        media_type_code: &str,
        encoding: JobDataEncoding,
        job_code: Option<&str>,
    ) -> AppResult<JobData> {
        sqlx::query_as::<_, JobData>(
            "INSERT INTO job_data (code, use_code, kind, media_type_code, encoding, job_code) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(code)
        .bind(use_code)
        .bind(kind)
        .bind(media_type_code)
        .bind(encoding)
        .bind(job_code)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create job data", e))
    }

    /// Find a data entry by its code.
    pub async fn find_by_code(&self, code: &str) -> AppResult<Option<JobData>> {
        sqlx::query_as::<_, JobData>("SELECT * FROM job_data WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job data", e))
    }

    /// All generated entries owned by a job, oldest first.
    pub async fn find_generated_by_job(&self, job_code: &str) -> AppResult<Vec<JobData>> {
        sqlx::query_as::<_, JobData>(
            "SELECT * FROM job_data WHERE job_code = $1 AND kind = 'generated' ORDER BY id ASC",
        )
        .bind(job_code)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find generated job data", e)
        })
    }

    /// Supplied entries never attached to a job and older than the given
    /// moment; candidates for the sweep.
    pub async fn find_orphaned_supplied(
        &self,
        older_than: DateTime<Utc>,
    ) -> AppResult<Vec<JobData>> {
        sqlx::query_as::<_, JobData>(
            "SELECT * FROM job_data \
             WHERE kind = 'supplied' AND job_code IS NULL AND create_timestamp < $1",
        )
        .bind(older_than)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find orphaned job data", e)
        })
    }

    /// Delete a data entry row.
    pub async fn delete_by_code(&self, code: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM job_data WHERE code = $1")
            .bind(code)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete job data", e)
            })?;

        Ok(result.rows_affected() > 0)
    }
}
