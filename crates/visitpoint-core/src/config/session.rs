//! Visit session configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Visit session configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionConfig {
    /// Sessions still open after this many hours are closed automatically.
    #[serde(default = "default_max_duration")]
    #[validate(range(min = 1, max = 72))]
    pub max_duration_hours: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_duration_hours: default_max_duration(),
        }
    }
}

impl SessionConfig {
    /// The auto-close threshold as a duration.
    pub fn max_duration(&self) -> chrono::Duration {
        chrono::Duration::hours(self.max_duration_hours)
    }
}

fn default_max_duration() -> i64 {
    8
}
