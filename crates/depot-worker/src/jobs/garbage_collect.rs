//! Built-in datastore garbage collection job.

use async_trait::async_trait;
use tracing;

use crate::context::JobRunContext;
use crate::handler::{HandlerError, JobHandler};

/// Job-type code of the built-in garbage collection job.
pub const GARBAGE_COLLECT_JOB_TYPE: &str = "datastore-garbage-collection";

/// Runs the retention sweep as a submittable job.
///
/// The sweep is also available directly on the service; exposing it as a
/// job type lets operators trigger and observe it through the ordinary job
/// surface.
#[derive(Debug, Default)]
pub struct GarbageCollectJobHandler;

impl GarbageCollectJobHandler {
    /// Create the handler.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl JobHandler for GarbageCollectJobHandler {
    fn job_type_code(&self) -> &str {
        GARBAGE_COLLECT_JOB_TYPE
    }

    async fn run(&self, ctx: &JobRunContext) -> Result<(), HandlerError> {
        ctx.checkpoint()?;

        let removed = ctx.service().clear_expired_jobs().await?;

        tracing::info!(
            code = ctx.job_code(),
            removed,
            "Datastore garbage collection complete"
        );
        Ok(())
    }
}
