//! Job handler contract and registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing;

use depot_core::AppError;

use crate::context::JobRunContext;

/// Error from a job handler execution.
///
/// Handler errors never reach a submitter; the runner records them as the
/// job's terminal status and nothing more.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The handler observed the cancellation signal and stopped.
    #[error("job execution was cancelled")]
    Cancelled,

    /// The handler could not complete its work.
    #[error("{0}")]
    Failed(String),

    /// An orchestrator or storage operation failed mid-execution.
    #[error(transparent)]
    Internal(#[from] AppError),
}

/// Trait for job-type handler implementations.
///
/// A handler is an opaque capability the orchestrator invokes per job-type
/// code; job-type-specific logic lives entirely behind this trait, in the
/// collaborating crates that register handlers at process start.
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// The job-type code this handler executes.
    fn job_type_code(&self) -> &str;

    /// Execute one job. The context carries the specification parameters,
    /// progress reporting, the cancellation signal, and data access.
    async fn run(&self, ctx: &JobRunContext) -> Result<(), HandlerError>;
}

/// Maps the closed set of job-type codes to their handlers.
///
/// Populated once at process start; the supported job-type set is
/// statically known per build.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its job-type code.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type_code = handler.job_type_code().to_string();
        tracing::info!(job_type = %job_type_code, "Registered job handler");
        self.handlers.insert(job_type_code, handler);
    }

    /// Look up the handler for a job-type code.
    pub fn get(&self, job_type_code: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(job_type_code).cloned()
    }

    /// Check if a handler is registered for a job-type code.
    pub fn contains(&self, job_type_code: &str) -> bool {
        self.handlers.contains_key(job_type_code)
    }

    /// The registered job-type codes.
    pub fn registered_types(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}
