//! Auto-close sweep: ends sessions older than the maximum stay.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use visitpoint_engine::CheckinEngine;
use visitpoint_entity::job::Job;

use super::AUTO_CLOSE_JOB;
use crate::executor::{JobExecutionError, JobHandler};

/// Closes expired sessions and retries unsettled awards
#[derive(Debug)]
pub struct AutoCloseJobHandler {
    engine: Arc<CheckinEngine>,
}

impl AutoCloseJobHandler {
    /// Create a new auto-close handler
    pub fn new(engine: Arc<CheckinEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl JobHandler for AutoCloseJobHandler {
    fn job_type(&self) -> &str {
        AUTO_CLOSE_JOB
    }

    async fn execute(&self, _job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let now = self.engine.now();
        let report = self
            .engine
            .auto_close_expired(now)
            .await
            .map_err(|e| JobExecutionError::Transient(e.to_string()))?;

        let awarded: i64 = report.awarded.iter().map(|e| e.amount).sum();
        if !report.closed.is_empty() || report.failed > 0 {
            tracing::info!(
                "Auto-close: closed={}, failed={}, awarded={}pt, unsettled={}",
                report.closed.len(),
                report.failed,
                awarded,
                report.unsettled.len()
            );
        }

        Ok(Some(serde_json::json!({
            "closed": report.closed.len(),
            "failed": report.failed,
            "awarded_points": awarded,
            "unsettled": report.unsettled.len(),
        })))
    }
}
