//! In-process job queue between the scheduler and the worker runner.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tracing;

use visitpoint_core::error::AppError;
use visitpoint_core::types::id::JobId;
use visitpoint_entity::job::{Job, JobStatus};

/// Bounded FIFO of jobs waiting for a worker slot.
///
/// Only in-flight jobs are kept; finished jobs are folded into counters.
#[derive(Debug)]
pub struct JobQueue {
    /// Producer side, used by the scheduler
    sender: mpsc::Sender<Job>,
    /// Consumer side, drained by the runner
    receiver: Mutex<mpsc::Receiver<Job>>,
    /// Queued and running jobs by id
    in_flight: DashMap<JobId, Job>,
    /// Jobs that finished successfully
    completed: AtomicU64,
    /// Jobs that failed
    failed: AtomicU64,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` waiting jobs
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender,
            receiver: Mutex::new(receiver),
            in_flight: DashMap::new(),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Enqueue a new job of `job_type`
    pub fn enqueue(&self, job_type: &str, payload: serde_json::Value) -> Result<Job, AppError> {
        let job = Job::new(job_type, Utc::now()).with_payload(payload);
        self.in_flight.insert(job.id, job.clone());

        if let Err(e) = self.sender.try_send(job.clone()) {
            self.in_flight.remove(&job.id);
            return Err(AppError::service_unavailable(format!(
                "Failed to enqueue job '{}': {}",
                job_type, e
            )));
        }

        tracing::debug!("Enqueued job: id={}, type='{}'", job.id, job.job_type);
        Ok(job)
    }

    /// Wait for the next job; `None` once the queue is closed
    pub async fn dequeue(&self) -> Option<Job> {
        let mut job = self.receiver.lock().await.recv().await?;
        job.status = JobStatus::Running;
        job.started_at = Some(Utc::now());
        self.in_flight.insert(job.id, job.clone());
        tracing::debug!("Dequeued job: id={}, type='{}'", job.id, job.job_type);
        Some(job)
    }

    /// Mark a job as completed successfully
    pub fn complete(&self, job_id: JobId, result: Option<serde_json::Value>) {
        self.in_flight.remove(&job_id);
        self.completed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Job completed: id={}, result={:?}", job_id, result);
    }

    /// Mark a job as failed
    pub fn fail(&self, job_id: JobId, error: &str) {
        self.in_flight.remove(&job_id);
        self.failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Job failed: id={}, error='{}'", job_id, error);
    }

    /// Get queue statistics
    ///
    /// Queued and running are counted in one pass over the in-flight map,
    /// so concurrent completions never make them disagree.
    pub fn stats(&self) -> QueueStats {
        let (queued, running) = self.in_flight.iter().fold((0u64, 0u64), |(queued, running), job| {
            if job.status == JobStatus::Running {
                (queued, running + 1)
            } else {
                (queued + 1, running)
            }
        });
        QueueStats {
            queued,
            running,
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Queue statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Jobs waiting for a slot
    pub queued: u64,
    /// Jobs being executed
    pub running: u64,
    /// Jobs finished successfully
    pub completed: u64,
    /// Jobs that failed
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_enqueue_dequeue_complete() {
        let queue = JobQueue::new(4);
        let job = queue.enqueue("auto_close", serde_json::Value::Null).unwrap();
        assert_eq!(queue.stats().queued, 1);

        let running = queue.dequeue().await.unwrap();
        assert_eq!(running.id, job.id);
        assert_eq!(running.status, JobStatus::Running);
        assert_eq!(queue.stats().running, 1);

        queue.complete(running.id, None);
        let stats = queue.stats();
        assert_eq!((stats.queued, stats.running, stats.completed), (0, 0, 1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stats_while_jobs_complete() {
        let queue = Arc::new(JobQueue::new(64));
        for _ in 0..64 {
            queue.enqueue("auto_close", serde_json::Value::Null).unwrap();
        }
        let mut running = Vec::new();
        for _ in 0..64 {
            running.push(queue.dequeue().await.unwrap().id);
        }

        let finisher = tokio::spawn({
            let queue = queue.clone();
            async move {
                for id in running {
                    queue.complete(id, None);
                    tokio::task::yield_now().await;
                }
            }
        });
        while !finisher.is_finished() {
            let stats = queue.stats();
            assert_eq!(stats.queued, 0);
            assert!(stats.running + stats.completed <= 64);
            tokio::task::yield_now().await;
        }
        finisher.await.unwrap();
        assert_eq!(queue.stats().completed, 64);
    }

    #[tokio::test]
    async fn test_full_queue_rejects() {
        let queue = JobQueue::new(1);
        queue.enqueue("a", serde_json::Value::Null).unwrap();
        assert!(queue.enqueue("b", serde_json::Value::Null).is_err());
        assert_eq!(queue.stats().queued, 1);
    }
}
