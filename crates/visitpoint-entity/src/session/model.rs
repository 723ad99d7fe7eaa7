//! Session entity model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use visitpoint_core::types::id::{PairKey, SessionId, UserId, VenueId};

use super::status::{CloseReason, SessionStatus};

/// One continuous presence interval of a user at a venue.
///
/// Sessions are created OPEN on check-in and closed exactly once, by a
/// check-out scan or by the auto-close sweep. A closed session is never
/// reopened; the next check-in creates a new record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    /// The visiting user.
    pub user_id: UserId,
    /// The visited venue.
    pub venue_id: VenueId,
    /// When the user checked in.
    pub check_in_at: DateTime<Utc>,
    /// When the session closed; `None` while the user is present.
    pub check_out_at: Option<DateTime<Utc>>,
    /// Current lifecycle state.
    pub status: SessionStatus,
    /// How the session was closed.
    pub close_reason: Option<CloseReason>,
}

impl Session {
    /// A new OPEN session starting at `now`.
    pub fn open(user_id: UserId, venue_id: VenueId, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            user_id,
            venue_id,
            check_in_at: now,
            check_out_at: None,
            status: SessionStatus::Open,
            close_reason: None,
        }
    }

    /// Whether the user is still present.
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// The per-pair serialization key.
    pub fn pair(&self) -> PairKey {
        PairKey::new(self.user_id, self.venue_id)
    }

    /// Close the session at `at`.
    ///
    /// Returns `false` (and changes nothing) if it was already closed.
    pub fn close(&mut self, at: DateTime<Utc>, reason: CloseReason) -> bool {
        if !self.is_open() {
            return false;
        }
        self.check_out_at = Some(at);
        self.status = SessionStatus::Closed;
        self.close_reason = Some(reason);
        true
    }

    /// Length of the stay: until check-out, or until `now` while open.
    pub fn stay_duration(&self, now: DateTime<Utc>) -> Duration {
        let end = self.check_out_at.unwrap_or(now);
        (end - self.check_in_at).max(Duration::zero())
    }

    /// Whether an open session has been running longer than `max`.
    pub fn exceeds(&self, max: Duration, now: DateTime<Utc>) -> bool {
        self.is_open() && now - self.check_in_at > max
    }
}
