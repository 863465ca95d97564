//! Blob storage configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the chunked blob store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Maximum size in bytes of a single stored blob part.
    ///
    /// Payloads larger than this are split into multiple parts so that no
    /// single row carries an unbounded payload.
    #[serde(default = "default_part_size")]
    pub part_size_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            part_size_bytes: default_part_size(),
        }
    }
}

fn default_part_size() -> usize {
    // 1 MiB per part
    1024 * 1024
}
