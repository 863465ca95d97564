//! In-process blob store.
//!
//! Keeps the same head/part shape as the PostgreSQL store (recorded part
//! lengths, a recorded total, an ordered part sequence) so reads go
//! through the same integrity verification. Used by tests and by embedders
//! that do not want a database.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};

use depot_core::result::AppResult;
use depot_core::traits::datastore::DataStore;
use depot_core::types::code;
use depot_core::AppError;

use crate::integrity::verify_reassembly;

#[derive(Debug)]
struct StoredBlob {
    /// Ordered part payloads.
    parts: Vec<Bytes>,
    /// Recorded length per part.
    part_lengths: Vec<u64>,
    /// Recorded total length.
    length: u64,
    /// When the blob was written.
    modify_timestamp: DateTime<Utc>,
}

/// Blob store holding payloads in process memory.
#[derive(Debug, Default)]
pub struct MemoryDataStore {
    blobs: Mutex<HashMap<String, StoredBlob>>,
}

impl MemoryDataStore {
    /// Create an empty in-memory data store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn put(&self, code: &str, chunks: Vec<Bytes>) -> AppResult<u64> {
        code::ensure_code("blob code", code)?;

        let part_lengths: Vec<u64> = chunks.iter().map(|c| c.len() as u64).collect();
        let length: u64 = part_lengths.iter().sum();

        let mut blobs = self.blobs.lock().expect("blob store lock poisoned");
        blobs.insert(
            code.to_string(),
            StoredBlob {
                parts: chunks,
                part_lengths,
                length,
                modify_timestamp: Utc::now(),
            },
        );

        Ok(length)
    }

    async fn get(&self, code: &str) -> AppResult<Bytes> {
        let blobs = self.blobs.lock().expect("blob store lock poisoned");
        let blob = blobs
            .get(code)
            .ok_or_else(|| AppError::not_found(format!("no blob stored under [{code}]")))?;

        let lengths: Vec<(u64, u64)> = blob
            .part_lengths
            .iter()
            .zip(&blob.parts)
            .map(|(recorded, part)| (*recorded, part.len() as u64))
            .collect();
        verify_reassembly(code, blob.length, &lengths)?;

        let mut payload = BytesMut::with_capacity(blob.length as usize);
        for part in &blob.parts {
            payload.extend_from_slice(part);
        }

        Ok(payload.freeze())
    }

    async fn exists(&self, code: &str) -> AppResult<bool> {
        let blobs = self.blobs.lock().expect("blob store lock poisoned");
        Ok(blobs.contains_key(code))
    }

    async fn remove(&self, code: &str) -> AppResult<bool> {
        let mut blobs = self.blobs.lock().expect("blob store lock poisoned");
        Ok(blobs.remove(code).is_some())
    }

    async fn keys(&self, older_than: Duration) -> AppResult<Vec<String>> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(older_than)
                .map_err(|e| AppError::internal(format!("out of range duration: {e}")))?;

        let blobs = self.blobs.lock().expect("blob store lock poisoned");
        Ok(blobs
            .iter()
            .filter(|(_, blob)| blob.modify_timestamp < cutoff)
            .map(|(code, _)| code.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::error::ErrorKind;
    use depot_core::types::code::generate_code;

    #[tokio::test]
    async fn test_round_trip_multi_chunk() {
        let store = MemoryDataStore::new();
        let code = generate_code();

        let written = store
            .put(
                &code,
                vec![
                    Bytes::from_static(b"abc"),
                    Bytes::from_static(b"def"),
                    Bytes::from_static(b"ghi"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(written, 9);
        assert_eq!(store.get(&code).await.unwrap(), Bytes::from_static(b"abcdefghi"));
    }

    #[tokio::test]
    async fn test_zero_chunk_write_is_legal() {
        let store = MemoryDataStore::new();
        let code = generate_code();

        assert_eq!(store.put(&code, vec![]).await.unwrap(), 0);
        assert!(store.exists(&code).await.unwrap());
        assert!(store.get(&code).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_unknown_code_is_not_found() {
        let store = MemoryDataStore::new();
        let err = store.get(&generate_code()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_put_rejects_malformed_code() {
        let store = MemoryDataStore::new();
        let err = store.put("short", vec![]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemoryDataStore::new();
        let code = generate_code();
        store
            .put(&code, vec![Bytes::from_static(b"x")])
            .await
            .unwrap();

        assert!(store.remove(&code).await.unwrap());
        assert!(!store.remove(&code).await.unwrap());
        assert!(!store.exists(&code).await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_filters_by_age() {
        let store = MemoryDataStore::new();
        let code = generate_code();
        store
            .put(&code, vec![Bytes::from_static(b"x")])
            .await
            .unwrap();

        // Fresh blob is not older than an hour.
        assert!(store.keys(Duration::from_secs(3600)).await.unwrap().is_empty());
        // But it is older than zero seconds.
        assert_eq!(store.keys(Duration::ZERO).await.unwrap(), vec![code]);
    }
}
