//! Cron-based scheduler for recurring engine maintenance.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use visitpoint_core::config::WorkerConfig;
use visitpoint_core::error::AppError;

use crate::jobs::{AUTO_CLOSE_JOB, REPLAY_PRUNE_JOB};
use crate::queue::JobQueue;

/// Enqueues maintenance jobs on cron schedules
pub struct CronScheduler {
    /// The underlying tokio-cron-scheduler
    scheduler: JobScheduler,
    /// Queue that receives the scheduled jobs
    queue: Arc<JobQueue>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(queue: Arc<JobQueue>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self { scheduler, queue })
    }

    /// Register every recurring job named in `config`
    pub async fn register_defaults(&self, config: &WorkerConfig) -> Result<(), AppError> {
        self.register_auto_close(&config.auto_close_cron).await?;
        self.register_replay_prune(&config.replay_prune_cron).await?;
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Register the auto-close sweep
    pub async fn register_auto_close(&self, cron_expr: &str) -> Result<(), AppError> {
        self.register(cron_expr, AUTO_CLOSE_JOB).await
    }

    /// Register replay-set pruning
    pub async fn register_replay_prune(&self, cron_expr: &str) -> Result<(), AppError> {
        self.register(cron_expr, REPLAY_PRUNE_JOB).await
    }

    async fn register(&self, cron_expr: &str, job_type: &'static str) -> Result<(), AppError> {
        let queue = Arc::clone(&self.queue);

        let job = CronJob::new_async(cron_expr, move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            Box::pin(async move {
                if let Err(e) = queue.enqueue(job_type, serde_json::json!({})) {
                    tracing::error!("Failed to enqueue '{}' job: {}", job_type, e);
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid cron '{cron_expr}' for '{job_type}': {e}"))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add '{job_type}' job: {e}")))?;

        tracing::info!("Registered '{}' job (cron: {})", job_type, cron_expr);
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler stopped");
        Ok(())
    }
}
