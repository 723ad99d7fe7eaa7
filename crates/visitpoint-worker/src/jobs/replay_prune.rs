//! Drops replay nonces that can no longer pass the validity window.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use visitpoint_engine::CheckinEngine;
use visitpoint_entity::job::Job;

use super::REPLAY_PRUNE_JOB;
use crate::executor::{JobExecutionError, JobHandler};

/// Prunes the replay set and idle per-key locks
#[derive(Debug)]
pub struct ReplayPruneJobHandler {
    engine: Arc<CheckinEngine>,
}

impl ReplayPruneJobHandler {
    /// Create a new replay-prune handler
    pub fn new(engine: Arc<CheckinEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl JobHandler for ReplayPruneJobHandler {
    fn job_type(&self) -> &str {
        REPLAY_PRUNE_JOB
    }

    async fn execute(&self, _job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let pruned = self.engine.prune(self.engine.now());
        tracing::debug!("Replay prune dropped {} nonces", pruned);
        Ok(Some(serde_json::json!({ "pruned": pruned })))
    }
}
