//! Points summary view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use visitpoint_core::types::id::UserId;

use crate::format::format_points;

/// Balance plus earned/spent totals over a trailing window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsSummary {
    /// Owner of the points.
    pub user_id: UserId,
    /// Current balance.
    pub balance: i64,
    /// Points earned inside the window.
    pub earned: i64,
    /// Points spent inside the window.
    pub spent: i64,
    /// Window length in days.
    pub window_days: i64,
    /// When the summary was computed.
    pub as_of: DateTime<Utc>,
}

impl PointsSummary {
    /// The balance rendered for display.
    pub fn balance_display(&self) -> String {
        format_points(self.balance)
    }
}
