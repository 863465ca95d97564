//! Job data entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::kind::{JobDataEncoding, JobDataKind};

/// A named, typed reference to a stored byte payload.
///
/// The data code doubles as the blob-store code of the payload. Entries are
/// referenced, never mutated, after creation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobData {
    /// Surrogate primary key.
    pub id: i64,
    /// External 36-character identifier, also the blob-store code.
    pub code: String,
    /// Logical label for the data (e.g. `"report"`, `"archive"`).
    pub use_code: String,
    /// Supplied input or generated output.
    pub kind: JobDataKind,
    /// Media type of the payload (e.g. `"text/csv"`).
    pub media_type_code: String,
    /// Transfer encoding of the stored bytes.
    pub encoding: JobDataEncoding,
    /// Code of the owning job; set for generated entries and for supplied
    /// entries once a submitted job references them.
    pub job_code: Option<String>,
    /// When the entry was created.
    pub create_timestamp: DateTime<Utc>,
}

impl JobData {
    /// A filename extension appropriate for the media type.
    pub fn filename_extension(&self) -> &'static str {
        match self.media_type_code.as_str() {
            "text/csv" => "csv",
            "application/zip" => "zip",
            "application/x-tar" => "tgz",
            "text/plain" => "txt",
            "application/json" => "json",
            _ => "dat",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_with_media_type(media_type_code: &str) -> JobData {
        JobData {
            id: 1,
            code: "9c2f7d4e-11aa-4bb0-8c3d-5e6f7a8b9c0d".to_string(),
            use_code: "report".to_string(),
            kind: JobDataKind::Generated,
            media_type_code: media_type_code.to_string(),
            encoding: JobDataEncoding::None,
            job_code: None,
            create_timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_extension_mapping() {
        assert_eq!(data_with_media_type("text/csv").filename_extension(), "csv");
        assert_eq!(
            data_with_media_type("application/zip").filename_extension(),
            "zip"
        );
        assert_eq!(
            data_with_media_type("application/x-tar").filename_extension(),
            "tgz"
        );
        assert_eq!(
            data_with_media_type("text/plain").filename_extension(),
            "txt"
        );
        assert_eq!(
            data_with_media_type("application/octet-stream").filename_extension(),
            "dat"
        );
    }
}
