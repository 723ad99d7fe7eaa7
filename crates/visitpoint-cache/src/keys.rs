//! Cache key builders for every VisitPoint read view.
//!
//! Centralising key construction keeps the write paths and the read
//! paths agreeing on what to invalidate.

use visitpoint_core::types::id::{UserId, VenueId};

/// Prefix applied to all VisitPoint cache keys.
const PREFIX: &str = "visitpoint";

// ── Venue keys ─────────────────────────────────────────────

/// Cache key for the open sessions at a venue.
pub fn present_visitors(venue_id: VenueId) -> String {
    format!("{PREFIX}:venue:{venue_id}:present")
}

/// Pattern matching every cached view of a venue.
pub fn venue_pattern(venue_id: VenueId) -> String {
    format!("{PREFIX}:venue:{venue_id}:*")
}

// ── User keys ──────────────────────────────────────────────

/// Cache key for a user's sessions, newest first.
pub fn visit_history(user_id: UserId) -> String {
    format!("{PREFIX}:user:{user_id}:visits")
}

/// Cache key for a user's points summary.
pub fn points_summary(user_id: UserId) -> String {
    format!("{PREFIX}:user:{user_id}:points")
}

/// Pattern matching every cached view of a user.
pub fn user_pattern(user_id: UserId) -> String {
    format!("{PREFIX}:user:{user_id}:*")
}
