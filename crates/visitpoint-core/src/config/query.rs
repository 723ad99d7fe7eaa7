//! Read-view configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query layer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QueryConfig {
    /// Window, in days, of the earned/spent totals in the points summary.
    #[serde(default = "default_summary_window")]
    #[validate(range(min = 1, max = 3650))]
    pub summary_window_days: i64,
    /// Default page size for ledger history.
    #[serde(default = "default_history_page_size")]
    #[validate(range(min = 1, max = 100))]
    pub history_page_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            summary_window_days: default_summary_window(),
            history_page_size: default_history_page_size(),
        }
    }
}

fn default_summary_window() -> i64 {
    30
}

fn default_history_page_size() -> usize {
    25
}
