//! Award values and idempotency keys.
//!
//! Every trigger award and keyed redemption carries an [`AwardKey`]; the
//! ledger refuses to apply the same key twice for a user. Referrals also
//! claim a global [`AwardMarker`] so a referee counts only once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use visitpoint_core::types::id::{SessionId, UserId};

use crate::ledger::PointReason;

/// A point delta computed by the rule engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    /// Why the points are awarded.
    pub reason: PointReason,
    /// Positive number of points.
    pub amount: i64,
}

/// Idempotency key of one award or redemption.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AwardKey(String);

impl AwardKey {
    /// Key of a session-triggered award.
    pub fn session(session_id: SessionId, reason: PointReason) -> Self {
        Self(format!("session:{session_id}:{reason}"))
    }

    /// Key of a referral award; one per referee.
    pub fn referral(referee: UserId) -> Self {
        Self(format!("referral:{referee}"))
    }

    /// Key of a caller-identified redemption.
    pub fn redemption(user_id: UserId, event_id: &str) -> Self {
        Self(format!("redemption:{user_id}:{event_id}"))
    }

    /// Return the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AwardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Global claim on an award key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardMarker {
    /// The claimed key.
    pub key: AwardKey,
    /// User the award goes to.
    pub user_id: UserId,
    /// When the key was claimed.
    pub claimed_at: DateTime<Utc>,
}

impl AwardMarker {
    /// A claim of `key` on behalf of `user_id`.
    pub fn claim(key: AwardKey, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            key,
            user_id,
            claimed_at: now,
        }
    }
}
