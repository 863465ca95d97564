//! Job lifecycle configuration.

use serde::{Deserialize, Serialize};

/// Job retention and sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Seconds a terminal job (and its generated data) is retained before
    /// the sweep may remove it.
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Cron schedule (with seconds field) on which the retention sweep runs.
    #[serde(default = "default_sweep_schedule")]
    pub sweep_schedule: String,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            sweep_schedule: default_sweep_schedule(),
        }
    }
}

fn default_ttl() -> u64 {
    // two hours
    2 * 60 * 60
}

fn default_sweep_schedule() -> String {
    "0 */10 * * * *".to_string()
}
