//! The check-in engine: the operations the app screens call.
//!
//! Data flow for a scan: the resolver validates the code, the tracker
//! opens or closes the session, the rule engine turns the transition
//! into awards, and the query layer drops the views that changed.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use visitpoint_cache::CacheManager;
use visitpoint_core::config::{AppConfig, VenueRules};
use visitpoint_core::error::{AppError, EngineError, LedgerError};
use visitpoint_core::result::{AppResult, StoreResult};
use visitpoint_core::traits::clock::Clock;
use visitpoint_core::traits::identity::IdentityProvider;
use visitpoint_core::types::id::{SessionId, UserId, VenueId};
use visitpoint_core::types::pagination::{CursorPage, HistoryCursor};
use visitpoint_core::types::time_range::TimeRange;
use visitpoint_entity::code::ScanIntent;
use visitpoint_entity::ledger::{LedgerEntry, RewardKind};
use visitpoint_entity::session::{CloseReason, Session, SessionEvent, Transition};
use visitpoint_entity::view::{PointsSummary, PresentVisitor};
use visitpoint_storage::Stores;

use crate::ledger::PointsLedger;
use crate::query::QueryService;
use crate::resolver::{CodeIssuer, IdentityResolver};
use crate::rules::RuleEngine;
use crate::session::{AutoCloseReport, SessionTracker};

/// Result of a successful scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutcome {
    /// The session as it is after the scan.
    pub session: Session,
    /// Whether the scan checked in or out.
    pub transition: Transition,
    /// Points awarded by this scan.
    pub awarded_points: i64,
    /// The ledger entries behind `awarded_points`.
    pub awards: Vec<LedgerEntry>,
    /// The transition happened but its awards could not be written yet;
    /// the next auto-close sweep retries them.
    pub unsettled: bool,
}

/// The in-process check-in and points engine.
#[derive(Debug)]
pub struct CheckinEngine {
    resolver: IdentityResolver,
    tracker: Arc<SessionTracker>,
    ledger: Arc<PointsLedger>,
    rules: RuleEngine,
    query: QueryService,
    clock: Arc<dyn Clock>,
    identity: Arc<dyn IdentityProvider>,
    max_session: Duration,
    unsettled: DashSet<SessionId>,
}

impl CheckinEngine {
    /// Wire the engine from configuration and its collaborators.
    pub fn new(
        config: &AppConfig,
        stores: Stores,
        cache: CacheManager,
        clock: Arc<dyn Clock>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let tracker = Arc::new(SessionTracker::new(stores.sessions, stores.open_sessions));
        let ledger = Arc::new(PointsLedger::new(stores.ledgers));
        let rules = RuleEngine::new(config.rules.clone(), ledger.clone(), stores.awards);
        let query = QueryService::new(tracker.clone(), ledger.clone(), cache, config.query.clone());

        Self {
            resolver: IdentityResolver::new(&config.scan),
            tracker,
            ledger,
            rules,
            query,
            clock,
            identity,
            max_session: config.session.max_duration(),
            unsettled: DashSet::new(),
        }
    }

    /// The code issuer sharing the resolver's secret.
    pub fn issuer(&self) -> &CodeIssuer {
        self.resolver.issuer()
    }

    /// The injected clock's current instant.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Rules in force at `venue_id`.
    pub fn rules_for(&self, venue_id: &VenueId) -> &VenueRules {
        self.rules.rules_for(venue_id)
    }

    // ── Scanning ──────────────────────────────────────────────

    /// Process a scanned code for `user_id` at `now`.
    ///
    /// A self-identifying code overrides `user_id`. Entry codes check in,
    /// exit codes check out, and codes without intent toggle. If the
    /// session change fails on a provider fault, the code's nonce is
    /// released so the scan can be retried.
    pub async fn scan(
        &self,
        raw_code: &str,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, EngineError> {
        let code = self.resolver.resolve(raw_code, now)?;
        let user_id = code.user_id.unwrap_or(user_id);
        let venue_id = code.venue_id;

        let transitioned = match code.intent {
            Some(ScanIntent::In) => self
                .tracker
                .check_in(user_id, venue_id, now)
                .await
                .map(|s| (s, Transition::CheckedIn)),
            Some(ScanIntent::Out) => self
                .tracker
                .check_out(user_id, venue_id, now)
                .await
                .map(|s| (s, Transition::CheckedOut)),
            None => self.tracker.toggle(user_id, venue_id, now).await,
        };

        let (session, transition) = match transitioned {
            Ok(done) => done,
            Err(e) => {
                if e.is_retryable() {
                    error!(user_id = %user_id, venue_id = %venue_id, error = %e, "Scan failed on provider fault");
                    self.resolver.release(&code);
                }
                return Err(e.into());
            }
        };

        let (awards, unsettled) = self.settle_event(transition.event(), &session, now).await;
        self.query.invalidate_session(&session).await;

        let awarded_points = awards.iter().map(|e| e.amount).sum();
        info!(
            user_id = %user_id,
            venue_id = %venue_id,
            session_id = %session.id,
            transition = %transition,
            awarded_points,
            "Scan processed"
        );

        Ok(ScanOutcome {
            session,
            transition,
            awarded_points,
            awards,
            unsettled,
        })
    }

    /// Scan on behalf of the signed-in user, at the clock's time.
    pub async fn scan_as_current_user(&self, raw_code: &str) -> AppResult<ScanOutcome> {
        let user_id = self.identity.current_user().await?;
        self.scan(raw_code, user_id, self.now())
            .await
            .map_err(AppError::from)
    }

    /// Check in without a code (operator tooling).
    pub async fn check_in(
        &self,
        user_id: UserId,
        venue_id: VenueId,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, EngineError> {
        let session = self.tracker.check_in(user_id, venue_id, now).await?;
        Ok(self.finish(session, Transition::CheckedIn, now).await)
    }

    /// Check out without a code (operator tooling).
    pub async fn check_out(
        &self,
        user_id: UserId,
        venue_id: VenueId,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, EngineError> {
        let session = self.tracker.check_out(user_id, venue_id, now).await?;
        Ok(self.finish(session, Transition::CheckedOut, now).await)
    }

    // ── Points ────────────────────────────────────────────────

    /// Redeem `reward` from `user_id`'s balance.
    pub async fn redeem(
        &self,
        user_id: UserId,
        reward: RewardKind,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError> {
        let entry = self.rules.redeem(user_id, reward, None, now).await?;
        self.query.invalidate_user(user_id).await;
        Ok(entry)
    }

    /// Redeem at most once per `event_id`.
    pub async fn redeem_once(
        &self,
        user_id: UserId,
        reward: RewardKind,
        event_id: &str,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError> {
        let entry = self.rules.redeem(user_id, reward, Some(event_id), now).await?;
        self.query.invalidate_user(user_id).await;
        Ok(entry)
    }

    /// Award the referral bonus; `None` if the referee was already counted.
    pub async fn award_referral(
        &self,
        referrer: UserId,
        referee: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        let entry = self.rules.award_referral(referrer, referee, now).await?;
        if entry.is_some() {
            self.query.invalidate_user(referrer).await;
        }
        Ok(entry)
    }

    /// Append an offsetting correction of `delta` points.
    pub async fn correct(
        &self,
        user_id: UserId,
        delta: i64,
        note: &str,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError> {
        let entry = self.ledger.correct(user_id, delta, note, now).await?;
        info!(user_id = %user_id, delta, note, "Ledger corrected");
        self.query.invalidate_user(user_id).await;
        Ok(entry)
    }

    // ── Queries ───────────────────────────────────────────────

    /// Users currently at `venue_id`.
    pub async fn get_present_visitors(&self, venue_id: VenueId) -> StoreResult<Vec<PresentVisitor>> {
        self.query.current_visitors(venue_id, self.now()).await
    }

    /// Every visit of `user_id`, newest first.
    pub async fn get_visit_history(&self, user_id: UserId) -> StoreResult<Vec<Session>> {
        self.query.visit_history(user_id, TimeRange::all()).await
    }

    /// Visits of `user_id` that started inside `range`, newest first.
    pub async fn get_visit_history_in(&self, user_id: UserId, range: TimeRange) -> StoreResult<Vec<Session>> {
        self.query.visit_history(user_id, range).await
    }

    /// Balance and recent totals of `user_id`.
    pub async fn get_points_summary(&self, user_id: UserId) -> StoreResult<PointsSummary> {
        self.query.points_summary(user_id, self.now()).await
    }

    /// A page of `user_id`'s ledger, newest first.
    pub async fn get_point_history(
        &self,
        user_id: UserId,
        limit: Option<usize>,
        before: Option<HistoryCursor>,
    ) -> StoreResult<CursorPage<LedgerEntry>> {
        self.query.point_history(user_id, limit, before).await
    }

    // ── Maintenance ───────────────────────────────────────────

    /// Close sessions older than the configured maximum and award them.
    ///
    /// Sessions whose awards failed earlier are settled first.
    pub async fn auto_close_expired(&self, now: DateTime<Utc>) -> StoreResult<AutoCloseReport> {
        let retried = self.retry_unsettled(now).await;

        let mut report = self.tracker.auto_close_expired(now, self.max_session).await?;
        report.awarded = retried;
        for session in &report.closed {
            let (awards, unsettled) = self.settle_event(SessionEvent::AutoClose, session, now).await;
            if unsettled {
                report.unsettled.push(session.id);
            }
            report.awarded.extend(awards);
            self.query.invalidate_session(session).await;
        }
        Ok(report)
    }

    /// Apply every award a session's current state earns.
    ///
    /// Safe to repeat: awards already in the ledger are skipped.
    pub async fn settle_session(
        &self,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, EngineError> {
        let Some(session) = self.tracker.get(session_id).await? else {
            self.unsettled.remove(&session_id);
            return Ok(Vec::new());
        };

        let mut written = self
            .rules
            .on_session_event(SessionEvent::CheckIn, &session, now)
            .await?;
        if let Some(reason) = session.close_reason {
            let event = match reason {
                CloseReason::Manual => SessionEvent::CheckOut,
                CloseReason::Auto => SessionEvent::AutoClose,
            };
            written.extend(self.rules.on_session_event(event, &session, now).await?);
        }

        self.unsettled.remove(&session_id);
        if !written.is_empty() {
            self.query.invalidate_user(session.user_id).await;
        }
        Ok(written)
    }

    /// Drop expired replay nonces and idle locks. Returns the number of
    /// nonces dropped.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let nonces = self.resolver.prune(now);
        let locks = self.tracker.prune_locks() + self.ledger.prune_locks();
        if nonces > 0 || locks > 0 {
            info!(nonces, locks, "Pruned replay set and idle locks");
        }
        nonces
    }

    /// Sessions waiting for their awards to be retried.
    pub fn unsettled_sessions(&self) -> Vec<SessionId> {
        self.unsettled.iter().map(|id| *id).collect()
    }

    async fn finish(&self, session: Session, transition: Transition, now: DateTime<Utc>) -> ScanOutcome {
        let (awards, unsettled) = self.settle_event(transition.event(), &session, now).await;
        self.query.invalidate_session(&session).await;
        ScanOutcome {
            awarded_points: awards.iter().map(|e| e.amount).sum(),
            session,
            transition,
            awards,
            unsettled,
        }
    }

    /// Run the rule engine for one event; a failure parks the session
    /// for a later retry instead of failing the caller.
    async fn settle_event(
        &self,
        event: SessionEvent,
        session: &Session,
        now: DateTime<Utc>,
    ) -> (Vec<LedgerEntry>, bool) {
        match self.rules.on_session_event(event, session, now).await {
            Ok(entries) => (entries, false),
            Err(e) => {
                error!(
                    session_id = %session.id,
                    user_id = %session.user_id,
                    event = %event,
                    error = %e,
                    "Award failed; queued for retry"
                );
                self.unsettled.insert(session.id);
                (Vec::new(), true)
            }
        }
    }

    async fn retry_unsettled(&self, now: DateTime<Utc>) -> Vec<LedgerEntry> {
        let mut written = Vec::new();
        for session_id in self.unsettled_sessions() {
            match self.settle_session(session_id, now).await {
                Ok(entries) => written.extend(entries),
                Err(e) => warn!(session_id = %session_id, error = %e, "Settlement retry failed"),
            }
        }
        written
    }
}
