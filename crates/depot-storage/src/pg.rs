//! PostgreSQL-backed blob store.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tracing;

use depot_core::result::AppResult;
use depot_core::traits::datastore::DataStore;
use depot_core::types::code;
use depot_core::AppError;
use depot_database::repositories::blob::BlobRepository;

use crate::integrity::verify_reassembly;

/// Blob store persisting payloads as head/part rows in PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgDataStore {
    /// Repository carrying the head/part SQL.
    repo: BlobRepository,
}

impl PgDataStore {
    /// Create a new PostgreSQL data store.
    pub fn new(repo: BlobRepository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl DataStore for PgDataStore {
    async fn put(&self, code: &str, chunks: Vec<Bytes>) -> AppResult<u64> {
        code::ensure_code("blob code", code)?;

        let head = self.repo.create_with_parts(code, &chunks).await?;

        tracing::debug!(
            code,
            parts = chunks.len(),
            bytes = head.length,
            "Stored blob"
        );
        Ok(head.length as u64)
    }

    async fn get(&self, code: &str) -> AppResult<Bytes> {
        let head = self
            .repo
            .try_get_head(code)
            .await?
            .ok_or_else(|| AppError::not_found(format!("no blob stored under [{code}]")))?;

        let parts = self.repo.find_ordered_part_payloads(head.id).await?;

        let lengths: Vec<(u64, u64)> = parts
            .iter()
            .map(|p| (p.length as u64, p.payload.len() as u64))
            .collect();
        verify_reassembly(code, head.length as u64, &lengths)?;

        let mut payload = BytesMut::with_capacity(head.length as usize);
        for part in parts {
            payload.extend_from_slice(&part.payload);
        }

        Ok(payload.freeze())
    }

    async fn exists(&self, code: &str) -> AppResult<bool> {
        Ok(self.repo.try_get_head(code).await?.is_some())
    }

    async fn remove(&self, code: &str) -> AppResult<bool> {
        self.repo.delete_by_code(code).await
    }

    async fn keys(&self, older_than: Duration) -> AppResult<Vec<String>> {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(older_than)
                .map_err(|e| AppError::internal(format!("out of range duration: {e}")))?;

        self.repo.find_codes_modified_before(cutoff).await
    }
}
