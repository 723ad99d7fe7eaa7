//! Background job processing and scheduled tasks for VisitPoint.
//!
//! This crate provides:
//! - An in-process job queue fed by a cron scheduler
//! - A worker runner that drains the queue with bounded concurrency
//! - A job executor that dispatches jobs to the correct handler
//! - Job handlers for session auto-close and replay-set pruning

pub mod executor;
pub mod jobs;
pub mod queue;
pub mod runner;
pub mod scheduler;

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use queue::JobQueue;
pub use runner::WorkerRunner;
pub use scheduler::CronScheduler;
