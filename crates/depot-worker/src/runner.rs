//! Runner pool — claims queued jobs and drives their handlers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing;

use depot_core::config::WorkerConfig;
use depot_core::types::code;
use depot_entity::job::model::Job;
use depot_jobs::JobService;

use crate::context::JobRunContext;
use crate::handler::{HandlerError, HandlerRegistry};

/// Pool of concurrent runners over one claim loop.
///
/// Each claimed job runs in its own task under a semaphore bounding the
/// number of in-flight executions; the claim itself is atomic in the job
/// store, so a job is executed at most once no matter how many pools or
/// processes poll the same queue.
#[derive(Debug)]
pub struct RunnerPool {
    /// Orchestration service carrying the claim/complete surface.
    service: Arc<JobService>,
    /// Registered handlers by job-type code.
    registry: Arc<HandlerRegistry>,
    /// Pool configuration.
    config: WorkerConfig,
    /// Identifier recorded on every claim this pool takes.
    runner_id: String,
}

impl RunnerPool {
    /// Create a new runner pool with a generated runner identifier.
    pub fn new(service: Arc<JobService>, registry: Arc<HandlerRegistry>, config: WorkerConfig) -> Self {
        let runner_id = format!("runner-{}", &code::generate_code()[..8]);
        Self {
            service,
            registry,
            config,
            runner_id,
        }
    }

    /// The identifier this pool claims jobs under.
    pub fn runner_id(&self) -> &str {
        &self.runner_id
    }

    /// Run until the shutdown signal fires, then drain in-flight jobs with
    /// a bounded timeout.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            runner_id = %self.runner_id,
            concurrency = self.config.concurrency,
            poll_interval = self.config.poll_interval_seconds,
            "Runner pool started"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let notify = self.service.work_notifier();
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds);

        loop {
            if *shutdown.borrow() {
                break;
            }

            let claimed = self.poll_and_execute(&semaphore).await;

            if !claimed {
                tokio::select! {
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            tracing::info!(runner_id = %self.runner_id, "Runner pool shutting down");
                            break;
                        }
                    }
                    _ = notify.notified() => {}
                    _ = time::sleep(poll_interval) => {}
                }
            }
        }

        tracing::info!(
            runner_id = %self.runner_id,
            "Waiting for in-flight jobs to complete..."
        );

        let max_permits = self.config.concurrency as u32;
        let _ = time::timeout(
            Duration::from_secs(self.config.drain_timeout_seconds),
            semaphore.acquire_many(max_permits),
        )
        .await;

        tracing::info!(runner_id = %self.runner_id, "Runner pool shut down complete");
    }

    /// Try to claim one job and spawn its execution. Returns whether a job
    /// was claimed.
    async fn poll_and_execute(&self, semaphore: &Arc<Semaphore>) -> bool {
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                tracing::trace!("All runner slots occupied, waiting...");
                return false;
            }
        };

        match self.service.claim_next_job(&self.runner_id).await {
            Ok(Some((job, cancel))) => {
                let service = Arc::clone(&self.service);
                let registry = Arc::clone(&self.registry);

                tokio::spawn(async move {
                    let _permit = permit;
                    execute_job(service, registry, job, cancel).await;
                });

                true
            }
            Ok(None) => {
                drop(permit);
                tracing::trace!("No queued jobs available");
                false
            }
            Err(e) => {
                drop(permit);
                tracing::error!(error = %e, "Failed to claim next job");
                false
            }
        }
    }
}

/// Execute one claimed job and record its outcome.
async fn execute_job(
    service: Arc<JobService>,
    registry: Arc<HandlerRegistry>,
    job: Job,
    cancel: CancellationToken,
) {
    let job_code = job.code.clone();
    let job_type_code = job.job_type_code.clone();
    let ctx = JobRunContext::new(job, Arc::clone(&service), cancel);

    let outcome = match registry.get(&job_type_code) {
        Some(handler) => handler.run(&ctx).await,
        None => Err(HandlerError::Failed(format!(
            "no handler registered for job type [{job_type_code}]"
        ))),
    };

    match outcome {
        Ok(()) => {
            match service.complete_job(&job_code).await {
                Ok(true) => {}
                Ok(false) => {
                    // The job left STARTED under the handler, e.g. a
                    // cancellation landed right at the end; the recorded
                    // status stands.
                    tracing::info!(code = %job_code, "Job completed after leaving the started state");
                }
                Err(e) => {
                    tracing::error!(code = %job_code, error = %e, "Failed to record job completion");
                }
            }
        }
        Err(HandlerError::Cancelled) => {
            service.release_cancel_token(&job_code);
            // Usually the status is already CANCELLED from the request;
            // record it if the handler stopped of its own accord.
            if let Err(e) = service.request_cancel(&job_code).await {
                tracing::error!(code = %job_code, error = %e, "Failed to record job cancellation");
            }
            tracing::info!(code = %job_code, "Job stopped at cancellation checkpoint");
        }
        Err(e) => {
            tracing::error!(code = %job_code, error = %e, "Job handler failed");
            if let Err(e) = service.fail_job(&job_code).await {
                tracing::error!(code = %job_code, error = %e, "Failed to record job failure");
            }
        }
    }
}
