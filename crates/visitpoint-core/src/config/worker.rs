//! Background worker configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of jobs that may run at once.
    #[serde(default = "default_concurrency")]
    #[validate(range(min = 1, max = 64))]
    pub concurrency: usize,
    /// Capacity of the in-process job queue.
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,
    /// Cron expression (with seconds) for the auto-close sweep.
    #[serde(default = "default_auto_close_cron")]
    pub auto_close_cron: String,
    /// Cron expression (with seconds) for replay-set pruning.
    #[serde(default = "default_replay_prune_cron")]
    pub replay_prune_cron: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: default_concurrency(),
            queue_capacity: default_queue_capacity(),
            auto_close_cron: default_auto_close_cron(),
            replay_prune_cron: default_replay_prune_cron(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    64
}

fn default_auto_close_cron() -> String {
    "0 * * * * *".to_string()
}

fn default_replay_prune_cron() -> String {
    "30 */5 * * * *".to_string()
}
