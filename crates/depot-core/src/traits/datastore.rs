//! Durable chunked byte storage contract.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// Durable storage for byte payloads split into an ordered sequence of
/// parts under a head record.
///
/// The [`DataStore`] trait is defined here in `depot-core` and implemented
/// in `depot-storage` for PostgreSQL and for an in-process memory store.
/// Codes are caller-supplied 36-character identifiers; a payload written
/// under a code is reconstructed exactly on read, or the read fails. A
/// partial result is never returned.
#[async_trait]
pub trait DataStore: Send + Sync + std::fmt::Debug + 'static {
    /// Store a payload under `code` as one part per chunk, in order.
    ///
    /// A zero-chunk write is legal and yields a zero-length payload.
    /// Returns the total number of bytes stored.
    async fn put(&self, code: &str, chunks: Vec<Bytes>) -> AppResult<u64>;

    /// Read back the payload stored under `code`.
    ///
    /// Fails with `NotFound` if no head exists for the code and with
    /// `CorruptStorage` if the retrieved parts do not sum to the recorded
    /// head length.
    async fn get(&self, code: &str) -> AppResult<Bytes>;

    /// Check whether a payload exists under `code`.
    async fn exists(&self, code: &str) -> AppResult<bool>;

    /// Remove the payload stored under `code`. Returns `true` if a head
    /// existed and was removed.
    async fn remove(&self, code: &str) -> AppResult<bool>;

    /// Return the codes of payloads whose last modification is older than
    /// the supplied duration. Used by the retention sweep.
    async fn keys(&self, older_than: Duration) -> AppResult<Vec<String>>;
}
