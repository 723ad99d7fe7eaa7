//! Cursor pagination for newest-first history listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default page size.
pub const DEFAULT_PAGE_SIZE: usize = 25;
/// Maximum page size.
pub const MAX_PAGE_SIZE: usize = 100;

/// Position of the last item a client has seen.
///
/// `created_at` alone is not unique (two awards can share a timestamp),
/// so the per-user sequence number breaks ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HistoryCursor {
    /// Creation time of the last seen item.
    pub created_at: DateTime<Utc>,
    /// Per-user sequence number of the last seen item.
    pub sequence: u64,
}

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorPage<T> {
    /// The items on this page, newest first.
    pub items: Vec<T>,
    /// Cursor to pass as `before` for the next page, if more items exist.
    pub next_cursor: Option<HistoryCursor>,
}

impl<T> CursorPage<T> {
    /// An empty page.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }
}

/// Clamp a requested page size into `1..=MAX_PAGE_SIZE`.
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(10), 10);
        assert_eq!(clamp_limit(1000), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_cursor_ordering_breaks_ties_by_sequence() {
        let at = Utc::now();
        let a = HistoryCursor { created_at: at, sequence: 1 };
        let b = HistoryCursor { created_at: at, sequence: 2 };
        assert!(a < b);
    }
}
