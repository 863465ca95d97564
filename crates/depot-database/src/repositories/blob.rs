//! Blob head/part repository implementation.
//!
//! Unlike the other repositories, writes here span multiple rows (one head
//! plus its parts), so each write operation drives its own transaction.

use bytes::Bytes;
use sqlx::PgPool;

use depot_core::error::{AppError, ErrorKind};
use depot_core::result::AppResult;
use depot_entity::blob::model::{BlobHead, BlobPartPayload};

/// Repository for chunked blob storage rows.
#[derive(Debug, Clone)]
pub struct BlobRepository {
    pool: PgPool,
}

impl BlobRepository {
    /// Create a new blob repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a head with one part per chunk, atomically.
    ///
    /// The head length is written as the sum of the chunk lengths and each
    /// part takes its ordering from the shared sequence. Zero chunks is
    /// legal and produces a zero-length head.
    pub async fn create_with_parts(&self, code: &str, chunks: &[Bytes]) -> AppResult<BlobHead> {
        let total: i64 = chunks.iter().map(|c| c.len() as i64).sum();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin blob transaction", e)
        })?;

        let head = sqlx::query_as::<_, BlobHead>(
            "INSERT INTO blob_heads (code, length) VALUES ($1, $2) RETURNING *",
        )
        .bind(code)
        .bind(total)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert blob head", e))?;

        for chunk in chunks {
            sqlx::query("INSERT INTO blob_parts (head_id, payload, length) VALUES ($1, $2, $3)")
                .bind(head.id)
                .bind(&chunk[..])
                .bind(chunk.len() as i64)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to insert blob part", e)
                })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit blob write", e)
        })?;

        Ok(head)
    }

    /// Find a head by its code.
    pub async fn try_get_head(&self, code: &str) -> AppResult<Option<BlobHead>> {
        sqlx::query_as::<_, BlobHead>("SELECT * FROM blob_heads WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find blob head", e))
    }

    /// Fetch all part payloads for a head in their ordering sequence.
    pub async fn find_ordered_part_payloads(&self, head_id: i64) -> AppResult<Vec<BlobPartPayload>> {
        sqlx::query_as::<_, BlobPartPayload>(
            "SELECT length, payload FROM blob_parts WHERE head_id = $1 ORDER BY ordering ASC",
        )
        .bind(head_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to fetch blob parts", e))
    }

    /// Delete a head and its parts (parts cascade).
    pub async fn delete_by_code(&self, code: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM blob_heads WHERE code = $1")
            .bind(code)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete blob head", e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    /// Codes of heads not modified since the given moment.
    pub async fn find_codes_modified_before(
        &self,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT code FROM blob_heads WHERE modify_timestamp < $1",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list blob heads", e))
    }
}
