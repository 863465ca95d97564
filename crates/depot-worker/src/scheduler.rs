//! Cron trigger for the retention sweep.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use depot_core::AppError;
use depot_jobs::JobService;

/// Schedules [`JobService::clear_expired_jobs`] on a cron expression.
///
/// The sweep itself stays externally triggered; this is merely the
/// deployment-side trigger the daemon installs.
pub struct SweepScheduler {
    scheduler: JobScheduler,
}

impl std::fmt::Debug for SweepScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SweepScheduler").finish()
    }
}

impl SweepScheduler {
    /// Create the scheduler and start the sweep on `schedule`.
    pub async fn start(service: Arc<JobService>, schedule: &str) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create sweep scheduler: {e}")))?;

        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let service = Arc::clone(&service);
            Box::pin(async move {
                match service.clear_expired_jobs().await {
                    Ok(removed) if removed > 0 => {
                        tracing::info!(removed, "Retention sweep removed expired jobs");
                    }
                    Ok(_) => {
                        tracing::debug!("Retention sweep found nothing to remove");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Retention sweep failed");
                    }
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create sweep schedule: {e}")))?;

        scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add sweep schedule: {e}")))?;

        scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start sweep scheduler: {e}")))?;

        tracing::info!(schedule, "Retention sweep scheduled");
        Ok(Self { scheduler })
    }

    /// Stop the scheduler.
    pub async fn shutdown(mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shut down sweep scheduler: {e}")))?;

        tracing::info!("Sweep scheduler shut down");
        Ok(())
    }
}
