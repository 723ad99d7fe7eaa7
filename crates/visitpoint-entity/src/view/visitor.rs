//! Present-visitor view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use visitpoint_core::types::id::{SessionId, UserId, VenueId};

use crate::format::relative_time;
use crate::session::Session;

/// A user currently checked in at a venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentVisitor {
    /// The open session.
    pub session_id: SessionId,
    /// The visitor.
    pub user_id: UserId,
    /// The venue.
    pub venue_id: VenueId,
    /// When the visitor checked in.
    pub check_in_at: DateTime<Utc>,
    /// Whole minutes since check-in.
    pub stayed_minutes: i64,
    /// Check-in time rendered for the visitors list.
    pub since: String,
}

impl PresentVisitor {
    /// Build the view of an open session as seen at `now`.
    pub fn from_session(session: &Session, now: DateTime<Utc>) -> Self {
        let stayed = session.stay_duration(now);
        Self {
            session_id: session.id,
            user_id: session.user_id,
            venue_id: session.venue_id,
            check_in_at: session.check_in_at,
            stayed_minutes: stayed.num_minutes(),
            since: relative_time(stayed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_from_session() {
        let now = Utc::now();
        let session = Session::open(UserId::new(), VenueId::new(), now - Duration::minutes(42));
        let view = PresentVisitor::from_session(&session, now);
        assert_eq!(view.stayed_minutes, 42);
        assert_eq!(view.since, "42m ago");
    }
}
