//! Worker runner — drains the job queue with bounded concurrency.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tracing;

use crate::executor::{JobExecutionError, JobExecutor};
use crate::queue::JobQueue;

/// How long shutdown waits for running jobs to finish
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// The main worker loop that pulls jobs from the queue and executes them
#[derive(Debug)]
pub struct WorkerRunner {
    /// Job queue
    queue: Arc<JobQueue>,
    /// Job executor
    executor: Arc<JobExecutor>,
    /// Concurrency limiter
    semaphore: Arc<Semaphore>,
    /// Maximum concurrent jobs
    max_concurrent: usize,
    /// Worker identifier, used in logs
    worker_id: String,
}

impl WorkerRunner {
    /// Create a new worker runner
    pub fn new(
        queue: Arc<JobQueue>,
        executor: Arc<JobExecutor>,
        max_concurrent: usize,
        worker_id: impl Into<String>,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            queue,
            executor,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            worker_id: worker_id.into(),
        }
    }

    /// Run the worker loop until the cancellation signal flips to `true`
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            "Worker '{}' started (max_concurrent={}, handlers={:?})",
            self.worker_id,
            self.max_concurrent,
            self.executor.registered_types()
        );

        loop {
            let permit = tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        break;
                    }
                    continue;
                }
                permit = self.semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let job = tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        break;
                    }
                    continue;
                }
                job = self.queue.dequeue() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            let queue = Arc::clone(&self.queue);
            let executor = Arc::clone(&self.executor);
            let worker_id = self.worker_id.clone();

            tokio::spawn(async move {
                let _permit = permit;
                let job_id = job.id;
                let job_type = job.job_type.clone();

                match executor.execute(&job).await {
                    Ok(result) => {
                        tracing::debug!(
                            "Worker '{}': job {} ('{}') completed",
                            worker_id,
                            job_id,
                            job_type
                        );
                        queue.complete(job_id, result);
                    }
                    Err(JobExecutionError::Transient(msg)) => {
                        tracing::warn!(
                            "Worker '{}': job {} ('{}') failed, next run retries: {}",
                            worker_id,
                            job_id,
                            job_type,
                            msg
                        );
                        queue.fail(job_id, &msg);
                    }
                    Err(e) => {
                        tracing::error!(
                            "Worker '{}': job {} ('{}') failed: {}",
                            worker_id,
                            job_id,
                            job_type,
                            e
                        );
                        queue.fail(job_id, &e.to_string());
                    }
                }
            });
        }

        tracing::info!("Worker '{}' shutting down, draining running jobs", self.worker_id);
        let drained = tokio::time::timeout(
            DRAIN_TIMEOUT,
            self.semaphore.acquire_many(self.max_concurrent as u32),
        )
        .await;
        if drained.is_err() {
            tracing::warn!(
                "Worker '{}': timed out waiting for running jobs",
                self.worker_id
            );
        }
        tracing::info!("Worker '{}' stopped", self.worker_id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;
    use visitpoint_entity::job::Job;

    use super::*;
    use crate::executor::JobHandler;

    #[derive(Debug, Default)]
    struct CountingHandler {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl JobHandler for CountingHandler {
        fn job_type(&self) -> &str {
            "count"
        }

        async fn execute(&self, _job: &Job) -> Result<Option<Value>, JobExecutionError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_runs_queued_jobs_then_stops() {
        let handler = Arc::new(CountingHandler::default());
        let mut executor = JobExecutor::new();
        executor.register(handler.clone());

        let queue = Arc::new(JobQueue::new(8));
        for _ in 0..3 {
            queue.enqueue("count", Value::Null).unwrap();
        }

        let runner = Arc::new(WorkerRunner::new(
            queue.clone(),
            Arc::new(executor),
            2,
            "test",
        ));
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn({
            let runner = runner.clone();
            async move { runner.run(rx).await }
        });

        for _ in 0..100 {
            if queue.stats().completed == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(handler.runs.load(Ordering::SeqCst), 3);
        assert_eq!(queue.stats().completed, 3);
    }
}
