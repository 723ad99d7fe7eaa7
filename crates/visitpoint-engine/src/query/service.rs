//! Query layer: cached read views over sessions and the ledger.
//!
//! Views are served from the cache and rebuilt on a miss. Writers call
//! the `invalidate_*` methods after every state change. Cache faults are
//! logged and the view is computed from the stores instead.
//!
//! Every user and venue carries an invalidation generation. A rebuilt
//! view whose scope was invalidated while it was being loaded is dropped
//! from the cache again, so a slow reader never outlives a newer write.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use visitpoint_cache::CacheManager;
use visitpoint_cache::keys;
use visitpoint_core::config::QueryConfig;
use visitpoint_core::result::StoreResult;
use visitpoint_core::traits::cache::CacheProvider;
use visitpoint_core::types::id::{UserId, VenueId};
use visitpoint_core::types::pagination::{CursorPage, HistoryCursor};
use visitpoint_core::types::time_range::TimeRange;
use visitpoint_entity::ledger::{EntryKind, LedgerEntry};
use visitpoint_entity::session::Session;
use visitpoint_entity::view::{PointsSummary, PresentVisitor};

use crate::ledger::PointsLedger;
use crate::session::SessionTracker;

/// What a cached view depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ViewScope {
    User(UserId),
    Venue(VenueId),
}

/// Read-only views for the visitors and points screens.
#[derive(Debug)]
pub struct QueryService {
    tracker: Arc<SessionTracker>,
    ledger: Arc<PointsLedger>,
    cache: CacheManager,
    config: QueryConfig,
    generations: DashMap<ViewScope, u64>,
}

impl QueryService {
    /// Create the query layer.
    pub fn new(
        tracker: Arc<SessionTracker>,
        ledger: Arc<PointsLedger>,
        cache: CacheManager,
        config: QueryConfig,
    ) -> Self {
        Self {
            tracker,
            ledger,
            cache,
            config,
            generations: DashMap::new(),
        }
    }

    /// Users present at `venue_id`, earliest arrival first.
    pub async fn current_visitors(
        &self,
        venue_id: VenueId,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<PresentVisitor>> {
        let key = keys::present_visitors(venue_id);
        let scope = ViewScope::Venue(venue_id);
        let sessions: Vec<Session> = match self.cached(&key).await {
            Some(sessions) => sessions,
            None => {
                let generation = self.generation(scope);
                let sessions = self.tracker.list_present(venue_id).await?;
                self.store(scope, generation, &key, &sessions).await;
                sessions
            }
        };
        Ok(sessions
            .iter()
            .map(|s| PresentVisitor::from_session(s, now))
            .collect())
    }

    /// A user's visits that started inside `range`, newest first.
    pub async fn visit_history(&self, user_id: UserId, range: TimeRange) -> StoreResult<Vec<Session>> {
        let key = keys::visit_history(user_id);
        let scope = ViewScope::User(user_id);
        let visits: Vec<Session> = match self.cached(&key).await {
            Some(visits) => visits,
            None => {
                let generation = self.generation(scope);
                let visits = self.tracker.history(user_id, TimeRange::all()).await?;
                self.store(scope, generation, &key, &visits).await;
                visits
            }
        };
        Ok(visits
            .into_iter()
            .filter(|s| range.contains(s.check_in_at))
            .collect())
    }

    /// Balance plus totals earned and spent over the configured window.
    pub async fn points_summary(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<PointsSummary> {
        let key = keys::points_summary(user_id);
        if let Some(summary) = self.cached::<PointsSummary>(&key).await {
            return Ok(summary);
        }

        let scope = ViewScope::User(user_id);
        let generation = self.generation(scope);
        let window = TimeRange::last_days(self.config.summary_window_days, now);
        let balance = self.ledger.balance(user_id).await?;
        let entries = self.ledger.entries_in(user_id, window).await?;
        let (earned, spent) = totals(&entries);

        let summary = PointsSummary {
            user_id,
            balance,
            earned,
            spent,
            window_days: self.config.summary_window_days,
            as_of: now,
        };
        self.store(scope, generation, &key, &summary).await;
        Ok(summary)
    }

    /// One page of ledger entries, newest first. Not cached.
    pub async fn point_history(
        &self,
        user_id: UserId,
        limit: Option<usize>,
        before: Option<HistoryCursor>,
    ) -> StoreResult<CursorPage<LedgerEntry>> {
        let limit = limit.unwrap_or(self.config.history_page_size);
        self.ledger.history(user_id, limit, before).await
    }

    /// Drop every cached view of `user_id`.
    pub async fn invalidate_user(&self, user_id: UserId) {
        self.bump(ViewScope::User(user_id));
        if let Err(e) = self.cache.delete_pattern(&keys::user_pattern(user_id)).await {
            warn!(user_id = %user_id, error = %e, "Failed to invalidate user views");
        }
    }

    /// Drop every cached view of `venue_id`.
    pub async fn invalidate_venue(&self, venue_id: VenueId) {
        self.bump(ViewScope::Venue(venue_id));
        if let Err(e) = self.cache.delete_pattern(&keys::venue_pattern(venue_id)).await {
            warn!(venue_id = %venue_id, error = %e, "Failed to invalidate venue views");
        }
    }

    /// Drop the views a session change affects.
    pub async fn invalidate_session(&self, session: &Session) {
        self.invalidate_user(session.user_id).await;
        self.invalidate_venue(session.venue_id).await;
    }

    async fn cached<T: DeserializeOwned + Send + 'static>(&self, key: &str) -> Option<T> {
        match self.cache.get_json(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed");
                None
            }
        }
    }

    fn generation(&self, scope: ViewScope) -> u64 {
        self.generations.get(&scope).map_or(0, |g| *g)
    }

    // Bumped before the cache delete, so a reader that stored after the
    // delete sees the new generation.
    fn bump(&self, scope: ViewScope) {
        *self.generations.entry(scope).or_insert(0) += 1;
    }

    /// Cache `value` unless `scope` was invalidated since `generation`
    /// was read.
    async fn store<T: Serialize + Send + Sync + 'static>(
        &self,
        scope: ViewScope,
        generation: u64,
        key: &str,
        value: &T,
    ) {
        if self.generation(scope) != generation {
            debug!(key, "Skipped caching a view invalidated during load");
            return;
        }
        if let Err(e) = self.cache.set_json(key, value).await {
            warn!(key, error = %e, "Cache write failed");
            return;
        }
        if self.generation(scope) != generation {
            debug!(key, "Dropped a view invalidated while caching");
            if let Err(e) = self.cache.delete(key).await {
                warn!(key, error = %e, "Failed to drop outdated view");
            }
        }
    }
}

fn totals(entries: &[LedgerEntry]) -> (i64, i64) {
    entries.iter().fold((0, 0), |(earned, spent), e| match e.kind {
        EntryKind::Earned => (earned.saturating_add(e.amount), spent),
        EntryKind::Spent => (earned, spent.saturating_add(e.amount)),
    })
}
