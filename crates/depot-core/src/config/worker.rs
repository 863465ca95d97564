//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Runner pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the runner pool is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of concurrent job executions.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Interval in seconds between queue polls when idle.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Seconds to wait for in-flight jobs on shutdown.
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: default_concurrency(),
            poll_interval_seconds: default_poll_interval(),
            drain_timeout_seconds: default_drain_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    4
}

fn default_poll_interval() -> u64 {
    5
}

fn default_drain_timeout() -> u64 {
    30
}
