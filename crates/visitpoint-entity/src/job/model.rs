//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use visitpoint_core::types::id::JobId;

use super::status::JobStatus;

/// A background job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: JobId,
    /// Job type identifier (e.g., `"auto_close"`, `"replay_prune"`).
    pub job_type: String,
    /// Job-specific payload (JSON).
    pub payload: serde_json::Value,
    /// Result data on completion (JSON).
    pub result: Option<serde_json::Value>,
    /// Error message on failure.
    pub error_message: Option<String>,
    /// Current job status.
    pub status: JobStatus,
    /// When the job started executing.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// A queued job of `job_type` with an empty payload.
    pub fn new(job_type: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: JobId::new(),
            job_type: job_type.into(),
            payload: serde_json::Value::Null,
            result: None,
            error_message: None,
            status: JobStatus::Queued,
            started_at: None,
            completed_at: None,
            created_at: now,
        }
    }

    /// Attach a payload.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}
