//! Blob storage row models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Head record owning an ordered sequence of parts.
///
/// The recorded length must equal the sum of the part lengths; readers
/// verify this before returning any payload.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlobHead {
    /// Surrogate primary key.
    pub id: i64,
    /// External 36-character identifier.
    pub code: String,
    /// Total payload length in bytes.
    pub length: i64,
    /// When the head was created.
    pub create_timestamp: DateTime<Utc>,
    /// When a part was last appended.
    pub modify_timestamp: DateTime<Utc>,
}

/// A part's payload together with its recorded length, as fetched for a
/// read in ordering sequence. The recorded length allows integrity
/// verification without trusting the payload buffer.
#[derive(Debug, Clone, FromRow)]
pub struct BlobPartPayload {
    /// Recorded length of the part.
    pub length: i64,
    /// The stored bytes.
    pub payload: Vec<u8>,
}
