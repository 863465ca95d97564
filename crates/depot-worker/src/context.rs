//! Execution context handed to a job handler.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use depot_core::result::AppResult;
use depot_entity::data::kind::JobDataEncoding;
use depot_entity::data::model::JobData;
use depot_entity::job::model::Job;
use depot_jobs::JobService;

use crate::handler::HandlerError;

/// Everything a handler may touch while executing one job.
///
/// The handler reports progress and stores output through the context
/// rather than holding the stores itself, and it is expected to call
/// [`JobRunContext::checkpoint`] at bounded intervals so cancellation
/// requests take effect.
#[derive(Debug)]
pub struct JobRunContext {
    job: Job,
    service: Arc<JobService>,
    cancel: CancellationToken,
}

impl JobRunContext {
    /// Create a context for one claimed job.
    pub fn new(job: Job, service: Arc<JobService>, cancel: CancellationToken) -> Self {
        Self {
            job,
            service,
            cancel,
        }
    }

    /// The executing job's code.
    pub fn job_code(&self) -> &str {
        &self.job.code
    }

    /// The type-specific parameters the job was submitted with.
    pub fn parameters(&self) -> &Value {
        &self.job.specification
    }

    /// The nickname of the owning user, if any.
    pub fn owner_nickname(&self) -> Option<&str> {
        self.job.owner_nickname.as_deref()
    }

    /// The orchestration service, for operations beyond this job's scope.
    pub fn service(&self) -> &Arc<JobService> {
        &self.service
    }

    /// The raw cancellation token, for handlers that `select!` over it.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether cancellation has been requested for this job.
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cooperative cancellation checkpoint.
    ///
    /// Handlers call this between units of work; it returns
    /// [`HandlerError::Cancelled`] once a cancellation request has landed.
    pub fn checkpoint(&self) -> Result<(), HandlerError> {
        if self.cancel.is_cancelled() {
            return Err(HandlerError::Cancelled);
        }
        Ok(())
    }

    /// Report progress through the job, 0–100. Expected to be monotonically
    /// non-decreasing within one execution.
    pub async fn set_progress(&self, progress_percent: i32) -> AppResult<()> {
        self.service
            .set_job_progress(&self.job.code, progress_percent)
            .await?;
        Ok(())
    }

    /// Store output bytes as a generated data entry of this job.
    pub async fn store_generated(
        &self,
        use_code: &str,
        media_type_code: &str,
        encoding: JobDataEncoding,
        payload: Bytes,
    ) -> AppResult<JobData> {
        self.service
            .store_generated_data(&self.job.code, use_code, media_type_code, encoding, payload)
            .await
    }

    /// Fetch a supplied input data entry with its payload.
    pub async fn supplied_data(&self, data_code: &str) -> AppResult<(JobData, Bytes)> {
        self.service.get_data_payload(data_code).await
    }
}
