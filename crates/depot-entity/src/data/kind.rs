//! Job data kind and encoding enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a data entry was supplied by a caller or generated by a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_data_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobDataKind {
    /// Input bytes supplied by a caller prior to submission.
    Supplied,
    /// Output bytes produced by a running job.
    Generated,
}

impl JobDataKind {
    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Supplied => "supplied",
            Self::Generated => "generated",
        }
    }
}

impl fmt::Display for JobDataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transfer encoding of a stored payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_data_encoding", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobDataEncoding {
    /// Bytes are stored as-is.
    None,
    /// Bytes are gzip compressed.
    Gzip,
}

impl JobDataEncoding {
    /// Return the encoding as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
        }
    }
}

impl fmt::Display for JobDataEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
