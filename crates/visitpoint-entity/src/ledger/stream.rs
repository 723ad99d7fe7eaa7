//! Per-user ledger stream.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use visitpoint_core::error::LedgerError;
use visitpoint_core::types::id::{LedgerEntryId, UserId};

use crate::award::AwardKey;

use super::entry::{EntryKind, LedgerEntry};
use super::reason::PointReason;

/// All ledger entries of one user, oldest first.
///
/// The stream is the unit the persistence layer stores per user. The
/// balance is never stored on its own: it is the `resulting_balance` of
/// the last entry. Award keys are stored in the same record as the
/// entries they produced, so an entry and its key are written together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLedger {
    /// Owner of the stream.
    pub user_id: UserId,
    /// Entries in append order.
    pub entries: Vec<LedgerEntry>,
    /// Award keys already applied, with the entry each one produced.
    #[serde(default)]
    pub applied: BTreeMap<AwardKey, LedgerEntryId>,
}

impl UserLedger {
    /// An empty stream.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            entries: Vec::new(),
            applied: BTreeMap::new(),
        }
    }

    /// The entry a previously applied award key produced.
    pub fn applied_entry(&self, key: &AwardKey) -> Option<&LedgerEntry> {
        let id = self.applied.get(key)?;
        self.entries.iter().rev().find(|e| e.id == *id)
    }

    /// Record `entry`, tagging it with `key` when given.
    pub fn push(&mut self, entry: LedgerEntry, key: Option<AwardKey>) {
        if let Some(key) = key {
            self.applied.insert(key, entry.id);
        }
        self.entries.push(entry);
    }

    /// Current balance, `0` for an empty stream.
    pub fn balance(&self) -> i64 {
        self.entries.last().map_or(0, |e| e.resulting_balance)
    }

    /// Sequence number the next entry will get.
    pub fn next_sequence(&self) -> u64 {
        self.entries.last().map_or(1, |e| e.sequence + 1)
    }

    /// Build the next entry without recording it.
    ///
    /// Callers validate the amount and balance before pushing. Fails with
    /// `BalanceOverflow` when the resulting balance does not fit.
    pub fn next_entry(
        &self,
        kind: EntryKind,
        amount: i64,
        reason: PointReason,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError> {
        let balance = self.balance();
        let resulting_balance = balance
            .checked_add(kind.signed(amount))
            .ok_or(LedgerError::BalanceOverflow { balance, amount })?;
        Ok(LedgerEntry {
            id: LedgerEntryId::new(),
            user_id: self.user_id,
            sequence: self.next_sequence(),
            kind,
            amount,
            reason,
            note,
            created_at: now,
            resulting_balance,
        })
    }
}
