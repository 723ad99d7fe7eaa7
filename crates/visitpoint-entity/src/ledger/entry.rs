//! Ledger entry model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use visitpoint_core::types::id::{LedgerEntryId, UserId};
use visitpoint_core::types::pagination::HistoryCursor;

use super::reason::PointReason;

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Points added to the balance.
    Earned,
    /// Points removed from the balance.
    Spent,
}

impl EntryKind {
    /// `amount` with the sign this kind applies to the balance.
    pub fn signed(&self, amount: i64) -> i64 {
        match self {
            Self::Earned => amount,
            Self::Spent => -amount,
        }
    }

    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earned => "earned",
            Self::Spent => "spent",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable point movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry identifier.
    pub id: LedgerEntryId,
    /// Owner of the points.
    pub user_id: UserId,
    /// Per-user position, starting at 1.
    pub sequence: u64,
    /// Earned or spent.
    pub kind: EntryKind,
    /// Always positive; the sign comes from `kind`.
    pub amount: i64,
    /// Trigger or reward that produced the entry.
    pub reason: PointReason,
    /// Free-form operator note (corrections).
    pub note: Option<String>,
    /// When the entry was appended.
    pub created_at: DateTime<Utc>,
    /// Balance after this entry.
    pub resulting_balance: i64,
}

impl LedgerEntry {
    /// The signed change this entry made to the balance.
    pub fn signed_amount(&self) -> i64 {
        self.kind.signed(self.amount)
    }

    /// Pagination position of this entry.
    pub fn cursor(&self) -> HistoryCursor {
        HistoryCursor {
            created_at: self.created_at,
            sequence: self.sequence,
        }
    }
}
