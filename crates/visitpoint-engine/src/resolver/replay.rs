//! Time-bounded replay set.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use visitpoint_core::types::id::VenueId;

/// Remembers resolved `(venue, nonce)` pairs until their codes expire.
///
/// Check-and-insert goes through the map's entry API, so two concurrent
/// resolutions of the same nonce cannot both succeed.
#[derive(Debug)]
pub struct ReplayGuard {
    window: Duration,
    seen: DashMap<(VenueId, String), DateTime<Utc>>,
}

impl ReplayGuard {
    /// Create a guard for codes valid for `window`.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: DashMap::new(),
        }
    }

    /// Record the nonce. Returns `false` if it was already recorded.
    pub fn check_and_insert(&self, venue_id: VenueId, nonce: &str, issued_at: DateTime<Utc>) -> bool {
        match self.seen.entry((venue_id, nonce.to_string())) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(issued_at);
                true
            }
        }
    }

    /// Forget a nonce so its code can be scanned again.
    pub fn release(&self, venue_id: VenueId, nonce: &str) {
        self.seen.remove(&(venue_id, nonce.to_string()));
    }

    /// Drop nonces whose codes are past the validity window. Returns how
    /// many were dropped.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let before = self.seen.len();
        let cutoff = now - self.window;
        self.seen.retain(|_, issued_at| *issued_at >= cutoff);
        before.saturating_sub(self.seen.len())
    }

    /// Number of remembered nonces.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no nonce is remembered.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
