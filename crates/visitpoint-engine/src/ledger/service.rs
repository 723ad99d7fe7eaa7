//! Append-only points ledger with per-user serialization.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use visitpoint_core::error::LedgerError;
use visitpoint_core::result::StoreResult;
use visitpoint_core::types::id::UserId;
use visitpoint_core::types::pagination::{CursorPage, HistoryCursor, clamp_limit};
use visitpoint_core::types::time_range::TimeRange;
use visitpoint_entity::award::AwardKey;
use visitpoint_entity::ledger::{EntryKind, LedgerEntry, PointReason, UserLedger};
use visitpoint_storage::stores::LedgerStore;

use crate::locks::KeyedLocks;

/// Result of an idempotent append.
#[derive(Debug, Clone)]
pub struct Appended {
    /// The entry for the key: new, or the one written earlier.
    pub entry: LedgerEntry,
    /// Whether this call wrote the entry.
    pub fresh: bool,
}

/// The points ledger.
///
/// Appends for one user are serialized; different users proceed
/// concurrently. A user's whole stream, including applied award keys, is
/// written with a single `put`, so an append either lands completely or
/// not at all.
#[derive(Debug)]
pub struct PointsLedger {
    ledgers: LedgerStore,
    locks: KeyedLocks<UserId>,
}

/// Parameters of one append.
#[derive(Debug, Clone)]
pub struct AppendRequest {
    /// Owner of the points.
    pub user_id: UserId,
    /// Earned or spent.
    pub kind: EntryKind,
    /// Positive number of points.
    pub amount: i64,
    /// Trigger or reward code.
    pub reason: PointReason,
    /// Optional operator note.
    pub note: Option<String>,
    /// Idempotency key; a key already applied returns the earlier entry.
    pub key: Option<AwardKey>,
}

impl AppendRequest {
    /// A plain append without note or key.
    pub fn new(user_id: UserId, kind: EntryKind, amount: i64, reason: PointReason) -> Self {
        Self {
            user_id,
            kind,
            amount,
            reason,
            note: None,
            key: None,
        }
    }

    /// Attach an operator note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Attach an idempotency key.
    pub fn with_key(mut self, key: AwardKey) -> Self {
        self.key = Some(key);
        self
    }
}

impl PointsLedger {
    /// Create a ledger over the given store.
    pub fn new(ledgers: LedgerStore) -> Self {
        Self {
            ledgers,
            locks: KeyedLocks::new(),
        }
    }

    /// Append one entry.
    ///
    /// Fails with `NonPositiveAmount` for `amount <= 0`, with
    /// `InsufficientBalance` when spending more than the balance and with
    /// `BalanceOverflow` when the balance would not fit. Nothing is
    /// written on failure.
    pub async fn append(
        &self,
        user_id: UserId,
        kind: EntryKind,
        amount: i64,
        reason: PointReason,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError> {
        self.apply(AppendRequest::new(user_id, kind, amount, reason), now)
            .await
            .map(|appended| appended.entry)
    }

    /// Append with optional note and idempotency key.
    pub async fn apply(&self, request: AppendRequest, now: DateTime<Utc>) -> Result<Appended, LedgerError> {
        if request.amount <= 0 {
            debug!(user_id = %request.user_id, amount = request.amount, "Rejected non-positive amount");
            return Err(LedgerError::NonPositiveAmount {
                amount: request.amount,
            });
        }

        let _guard = self.locks.lock(&request.user_id).await;
        let mut ledger = self.load(request.user_id).await?;

        if let Some(key) = &request.key {
            if let Some(existing) = ledger.applied_entry(key) {
                debug!(user_id = %request.user_id, key = %key, "Award key already applied");
                return Ok(Appended {
                    entry: existing.clone(),
                    fresh: false,
                });
            }
        }

        let balance = ledger.balance();
        if request.kind == EntryKind::Spent && request.amount > balance {
            warn!(
                user_id = %request.user_id,
                balance,
                requested = request.amount,
                reason = %request.reason,
                "Rejected spend above balance"
            );
            return Err(LedgerError::InsufficientBalance {
                balance,
                requested: request.amount,
            });
        }

        let entry = ledger
            .next_entry(request.kind, request.amount, request.reason, request.note, now)
            .inspect_err(|_| {
                warn!(
                    user_id = %request.user_id,
                    balance,
                    requested = request.amount,
                    "Rejected append overflowing the balance"
                );
            })?;
        ledger.push(entry.clone(), request.key);
        self.ledgers.put(request.user_id, ledger).await?;

        info!(
            user_id = %entry.user_id,
            kind = %entry.kind,
            amount = entry.amount,
            reason = %entry.reason,
            balance = entry.resulting_balance,
            sequence = entry.sequence,
            "Ledger entry appended"
        );
        Ok(Appended { entry, fresh: true })
    }

    /// Append an offsetting CORRECTION entry: EARNED for a positive
    /// `delta`, SPENT for a negative one.
    pub async fn correct(
        &self,
        user_id: UserId,
        delta: i64,
        note: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError> {
        let kind = if delta < 0 {
            EntryKind::Spent
        } else {
            EntryKind::Earned
        };
        let request = AppendRequest::new(user_id, kind, delta.saturating_abs(), PointReason::Correction)
            .with_note(note);
        self.apply(request, now).await.map(|a| a.entry)
    }

    /// Current balance; `0` for a user without entries.
    pub async fn balance(&self, user_id: UserId) -> StoreResult<i64> {
        Ok(self.load(user_id).await?.balance())
    }

    /// One page of entries, newest first.
    ///
    /// `before` is exclusive: pass the previous page's `next_cursor`.
    pub async fn history(
        &self,
        user_id: UserId,
        limit: usize,
        before: Option<HistoryCursor>,
    ) -> StoreResult<CursorPage<LedgerEntry>> {
        let limit = clamp_limit(limit);
        let ledger = self.load(user_id).await?;

        let mut entries: Vec<LedgerEntry> = ledger
            .entries
            .into_iter()
            .filter(|e| before.is_none_or(|cursor| e.cursor() < cursor))
            .collect();
        entries.sort_by(|a, b| b.cursor().cmp(&a.cursor()));

        let has_more = entries.len() > limit;
        entries.truncate(limit);
        let next_cursor = if has_more {
            entries.last().map(LedgerEntry::cursor)
        } else {
            None
        };

        Ok(CursorPage {
            items: entries,
            next_cursor,
        })
    }

    /// Entries created inside `range`, oldest first.
    pub async fn entries_in(&self, user_id: UserId, range: TimeRange) -> StoreResult<Vec<LedgerEntry>> {
        Ok(self
            .load(user_id)
            .await?
            .entries
            .into_iter()
            .filter(|e| range.contains(e.created_at))
            .collect())
    }

    /// Drop idle per-user locks.
    pub fn prune_locks(&self) -> usize {
        self.locks.prune()
    }

    async fn load(&self, user_id: UserId) -> StoreResult<UserLedger> {
        Ok(self
            .ledgers
            .get(&user_id)
            .await?
            .unwrap_or_else(|| UserLedger::new(user_id)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use visitpoint_storage::{FaultyStore, MemoryStore};

    use super::*;

    fn ledger() -> PointsLedger {
        PointsLedger::new(Arc::new(MemoryStore::new("ledgers")))
    }

    #[tokio::test]
    async fn test_balance_tracks_signed_sum() {
        let ledger = ledger();
        let user = UserId::new();
        let now = Utc::now();
        assert_eq!(ledger.balance(user).await.unwrap(), 0);

        ledger.append(user, EntryKind::Earned, 100, PointReason::CheckIn, now).await.unwrap();
        ledger.append(user, EntryKind::Earned, 150, PointReason::LongStay, now).await.unwrap();
        let spent = ledger
            .append(user, EntryKind::Spent, 100, PointReason::DrinkDiscount, now)
            .await
            .unwrap();

        assert_eq!(spent.resulting_balance, 150);
        assert_eq!(spent.sequence, 3);
        assert_eq!(ledger.balance(user).await.unwrap(), 150);
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let ledger = ledger();
        let user = UserId::new();
        for amount in [0, -5] {
            let err = ledger
                .append(user, EntryKind::Earned, amount, PointReason::CheckIn, Utc::now())
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::NonPositiveAmount { .. }));
        }
    }

    #[tokio::test]
    async fn test_overspend_writes_nothing() {
        let ledger = ledger();
        let user = UserId::new();
        let now = Utc::now();
        ledger.append(user, EntryKind::Earned, 100, PointReason::CheckIn, now).await.unwrap();

        let err = ledger
            .append(user, EntryKind::Spent, 500, PointReason::SpecialItem, now)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance {
                balance: 100,
                requested: 500
            }
        ));
        let page = ledger.history(user, 10, None).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(ledger.balance(user).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_overflowing_append_writes_nothing() {
        let ledger = ledger();
        let user = UserId::new();
        let now = Utc::now();
        ledger.append(user, EntryKind::Earned, 100, PointReason::CheckIn, now).await.unwrap();

        let err = ledger
            .append(user, EntryKind::Earned, i64::MAX, PointReason::Correction, now)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "BALANCE_OVERFLOW");
        assert!(!err.is_retryable());
        assert!(ledger.correct(user, i64::MAX, "typo", now).await.is_err());

        let page = ledger.history(user, 10, None).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(ledger.balance(user).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_keyed_append_is_idempotent() {
        let ledger = ledger();
        let user = UserId::new();
        let now = Utc::now();
        let key = AwardKey::redemption(user, "evt-1");
        let request = AppendRequest::new(user, EntryKind::Earned, 50, PointReason::Referral).with_key(key);

        let first = ledger.apply(request.clone(), now).await.unwrap();
        let second = ledger.apply(request, now).await.unwrap();
        assert!(first.fresh);
        assert!(!second.fresh);
        assert_eq!(first.entry.id, second.entry.id);
        assert_eq!(ledger.balance(user).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn test_correction_directions() {
        let ledger = ledger();
        let user = UserId::new();
        let now = Utc::now();
        let up = ledger.correct(user, 300, "goodwill", now).await.unwrap();
        assert_eq!(up.kind, EntryKind::Earned);
        assert_eq!(up.reason, PointReason::Correction);
        assert_eq!(up.note.as_deref(), Some("goodwill"));

        let down = ledger.correct(user, -120, "double award", now).await.unwrap();
        assert_eq!(down.kind, EntryKind::Spent);
        assert_eq!(down.amount, 120);
        assert_eq!(down.resulting_balance, 180);

        assert!(matches!(
            ledger.correct(user, 0, "noop", now).await,
            Err(LedgerError::NonPositiveAmount { amount: 0 })
        ));
    }

    #[tokio::test]
    async fn test_history_pages_newest_first() {
        let ledger = ledger();
        let user = UserId::new();
        let start = Utc::now();
        for i in 0..5 {
            ledger
                .append(user, EntryKind::Earned, 10 + i, PointReason::CheckIn, start + Duration::minutes(i))
                .await
                .unwrap();
        }
        // Two entries sharing a timestamp are ordered by sequence
        ledger
            .append(user, EntryKind::Earned, 99, PointReason::Referral, start + Duration::minutes(4))
            .await
            .unwrap();

        let first = ledger.history(user, 4, None).await.unwrap();
        let amounts: Vec<i64> = first.items.iter().map(|e| e.amount).collect();
        assert_eq!(amounts, vec![99, 14, 13, 12]);
        let cursor = first.next_cursor.unwrap();

        let second = ledger.history(user, 4, Some(cursor)).await.unwrap();
        let amounts: Vec<i64> = second.items.iter().map(|e| e.amount).collect();
        assert_eq!(amounts, vec![11, 10]);
        assert!(second.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store_is_retryable() {
        let inner: LedgerStore = Arc::new(MemoryStore::new("ledgers"));
        let faulty = Arc::new(FaultyStore::new(inner));
        let ledger = PointsLedger::new(faulty.clone());
        let user = UserId::new();

        faulty.fail_next(1);
        let err = ledger
            .append(user, EntryKind::Earned, 100, PointReason::CheckIn, Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(ledger.balance(user).await.unwrap(), 0);

        ledger
            .append(user, EntryKind::Earned, 100, PointReason::CheckIn, Utc::now())
            .await
            .unwrap();
        assert_eq!(ledger.balance(user).await.unwrap(), 100);
    }
}
