//! # depot-worker
//!
//! The runner pool for pkgdepot. Runners claim queued jobs exactly once,
//! dispatch them to the handler registered for their job-type code, relay
//! progress and cancellation, and record the terminal outcome.
//!
//! This crate provides:
//! - The [`handler::JobHandler`] trait and registry external collaborators
//!   populate at process start
//! - The [`runner::RunnerPool`] claim/execute loop
//! - The [`context::JobRunContext`] handed to executing handlers
//! - A cron trigger for the retention sweep

pub mod context;
pub mod handler;
pub mod jobs;
pub mod runner;
pub mod scheduler;

pub use context::JobRunContext;
pub use handler::{HandlerError, HandlerRegistry, JobHandler};
pub use runner::RunnerPool;
pub use scheduler::SweepScheduler;
