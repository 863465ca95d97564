//! # depot-jobs
//!
//! The job orchestration service for pkgdepot: accepts specifications,
//! applies request coalescing, persists job state, answers job and data
//! queries, and carries cooperative cancellation signals between callers
//! and executing handlers.
//!
//! Execution itself lives in `depot-worker`; the runner pool drives the
//! claim/complete surface this crate exposes.

pub mod cancel;
pub mod service;
pub mod store;

pub use service::JobService;
pub use store::{JobStore, MemoryJobStore, PgJobStore};
