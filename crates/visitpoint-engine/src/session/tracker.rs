//! Session tracker: check-in/check-out per user per venue.
//!
//! Every mutation of a (user, venue) pair runs under that pair's lock,
//! so at most one OPEN session exists per pair. The open-session index
//! is written before the session record on check-in and cleared after
//! it on check-out; an index entry whose session is missing or CLOSED
//! is treated as stale.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use visitpoint_core::error::SessionError;
use visitpoint_core::result::StoreResult;
use visitpoint_core::types::id::{PairKey, SessionId, UserId, VenueId};
use visitpoint_core::types::time_range::TimeRange;
use visitpoint_entity::ledger::LedgerEntry;
use visitpoint_entity::session::{CloseReason, Session, Transition};
use visitpoint_storage::stores::{OpenSessionIndex, SessionStore};

use crate::locks::KeyedLocks;

/// Outcome of one auto-close sweep.
#[derive(Debug, Default)]
pub struct AutoCloseReport {
    /// Sessions closed by this sweep.
    pub closed: Vec<Session>,
    /// Sessions that should have closed but hit a provider fault; the
    /// next sweep picks them up again.
    pub failed: usize,
    /// Ledger entries awarded for the closed sessions.
    pub awarded: Vec<LedgerEntry>,
    /// Closed sessions whose awards could not be written yet.
    pub unsettled: Vec<SessionId>,
}

/// Records visits and answers presence queries.
#[derive(Debug)]
pub struct SessionTracker {
    sessions: SessionStore,
    open: OpenSessionIndex,
    locks: KeyedLocks<PairKey>,
}

impl SessionTracker {
    /// Create a tracker over the given stores.
    pub fn new(sessions: SessionStore, open: OpenSessionIndex) -> Self {
        Self {
            sessions,
            open,
            locks: KeyedLocks::new(),
        }
    }

    /// Open a session for the pair.
    pub async fn check_in(
        &self,
        user_id: UserId,
        venue_id: VenueId,
        now: DateTime<Utc>,
    ) -> Result<Session, SessionError> {
        let pair = PairKey::new(user_id, venue_id);
        let _guard = self.locks.lock(&pair).await;
        self.open_locked(pair, now).await
    }

    /// Close the pair's open session with reason MANUAL.
    pub async fn check_out(
        &self,
        user_id: UserId,
        venue_id: VenueId,
        now: DateTime<Utc>,
    ) -> Result<Session, SessionError> {
        let pair = PairKey::new(user_id, venue_id);
        let _guard = self.locks.lock(&pair).await;
        match self.current_locked(&pair).await? {
            Some(session) => self.close_locked(session, now, CloseReason::Manual).await,
            None => {
                debug!(user_id = %user_id, venue_id = %venue_id, "Check-out without open session");
                Err(SessionError::NotOpen { user_id, venue_id })
            }
        }
    }

    /// Check out if the pair has an open session, otherwise check in.
    ///
    /// The decision and the transition happen under one lock acquisition.
    pub async fn toggle(
        &self,
        user_id: UserId,
        venue_id: VenueId,
        now: DateTime<Utc>,
    ) -> Result<(Session, Transition), SessionError> {
        let pair = PairKey::new(user_id, venue_id);
        let _guard = self.locks.lock(&pair).await;
        match self.current_locked(&pair).await? {
            Some(session) => {
                let closed = self.close_locked(session, now, CloseReason::Manual).await?;
                Ok((closed, Transition::CheckedOut))
            }
            None => {
                let opened = self.open_locked(pair, now).await?;
                Ok((opened, Transition::CheckedIn))
            }
        }
    }

    /// The pair's open session, if any.
    pub async fn current(&self, user_id: UserId, venue_id: VenueId) -> StoreResult<Option<Session>> {
        self.current_locked(&PairKey::new(user_id, venue_id)).await
    }

    /// A session by id.
    pub async fn get(&self, session_id: SessionId) -> StoreResult<Option<Session>> {
        self.sessions.get(&session_id).await
    }

    /// Open sessions at `venue_id`, earliest check-in first.
    pub async fn list_present(&self, venue_id: VenueId) -> StoreResult<Vec<Session>> {
        let mut present: Vec<Session> = self
            .sessions
            .values()
            .await?
            .into_iter()
            .filter(|s| s.venue_id == venue_id && s.is_open())
            .collect();
        present.sort_by(|a, b| a.check_in_at.cmp(&b.check_in_at).then(a.id.cmp(&b.id)));
        Ok(present)
    }

    /// A user's sessions that started inside `range`, newest first.
    ///
    /// Open sessions are included.
    pub async fn history(&self, user_id: UserId, range: TimeRange) -> StoreResult<Vec<Session>> {
        let mut visits: Vec<Session> = self
            .sessions
            .values()
            .await?
            .into_iter()
            .filter(|s| s.user_id == user_id && range.contains(s.check_in_at))
            .collect();
        visits.sort_by(|a, b| b.check_in_at.cmp(&a.check_in_at).then(b.id.cmp(&a.id)));
        Ok(visits)
    }

    /// Close every open session older than `max_duration`, reason AUTO.
    ///
    /// Each candidate is re-read under its pair lock before closing, so a
    /// concurrent check-out wins cleanly. A fault on one session is
    /// logged and counted; the sweep carries on with the rest.
    pub async fn auto_close_expired(
        &self,
        now: DateTime<Utc>,
        max_duration: Duration,
    ) -> StoreResult<AutoCloseReport> {
        let candidates: Vec<Session> = self
            .sessions
            .values()
            .await?
            .into_iter()
            .filter(|s| s.exceeds(max_duration, now))
            .collect();

        let mut report = AutoCloseReport::default();
        for candidate in candidates {
            let pair = candidate.pair();
            let _guard = self.locks.lock(&pair).await;
            match self.auto_close_one(candidate.id, now, max_duration).await {
                Ok(Some(closed)) => report.closed.push(closed),
                Ok(None) => {}
                Err(e) => {
                    error!(
                        session_id = %candidate.id,
                        user_id = %candidate.user_id,
                        venue_id = %candidate.venue_id,
                        error = %e,
                        "Auto-close failed; will retry on next sweep"
                    );
                    report.failed += 1;
                }
            }
        }

        if !report.closed.is_empty() || report.failed > 0 {
            info!(
                closed = report.closed.len(),
                failed = report.failed,
                "Auto-close sweep finished"
            );
        }
        Ok(report)
    }

    /// Drop idle pair locks.
    pub fn prune_locks(&self) -> usize {
        self.locks.prune()
    }

    async fn auto_close_one(
        &self,
        session_id: SessionId,
        now: DateTime<Utc>,
        max_duration: Duration,
    ) -> Result<Option<Session>, SessionError> {
        match self.sessions.get(&session_id).await? {
            Some(session) if session.exceeds(max_duration, now) => self
                .close_locked(session, now, CloseReason::Auto)
                .await
                .map(Some),
            _ => Ok(None),
        }
    }

    async fn current_locked(&self, pair: &PairKey) -> StoreResult<Option<Session>> {
        let Some(session_id) = self.open.get(pair).await? else {
            return Ok(None);
        };
        match self.sessions.get(&session_id).await? {
            Some(session) if session.is_open() => Ok(Some(session)),
            _ => {
                debug!(pair = %pair, session_id = %session_id, "Ignoring stale open-session index entry");
                Ok(None)
            }
        }
    }

    async fn open_locked(&self, pair: PairKey, now: DateTime<Utc>) -> Result<Session, SessionError> {
        if let Some(existing) = self.current_locked(&pair).await? {
            warn!(
                user_id = %pair.user_id,
                venue_id = %pair.venue_id,
                session_id = %existing.id,
                "Check-in rejected: session already open"
            );
            return Err(SessionError::AlreadyOpen {
                user_id: pair.user_id,
                venue_id: pair.venue_id,
            });
        }

        let session = Session::open(pair.user_id, pair.venue_id, now);
        self.open.put(pair, session.id).await?;
        if let Err(e) = self.sessions.put(session.id, session.clone()).await {
            self.discard_index(&pair).await;
            return Err(e.into());
        }

        info!(
            user_id = %session.user_id,
            venue_id = %session.venue_id,
            session_id = %session.id,
            "Checked in"
        );
        Ok(session)
    }

    async fn close_locked(
        &self,
        mut session: Session,
        now: DateTime<Utc>,
        reason: CloseReason,
    ) -> Result<Session, SessionError> {
        let pair = session.pair();
        if !session.close(now, reason) {
            return Err(SessionError::NotOpen {
                user_id: pair.user_id,
                venue_id: pair.venue_id,
            });
        }
        self.sessions.put(session.id, session.clone()).await?;
        self.discard_index(&pair).await;

        info!(
            user_id = %session.user_id,
            venue_id = %session.venue_id,
            session_id = %session.id,
            reason = %reason,
            stayed_minutes = session.stay_duration(now).num_minutes(),
            "Checked out"
        );
        Ok(session)
    }

    /// Best-effort removal of the pair's index entry; a leftover entry is
    /// recognised as stale on the next read.
    async fn discard_index(&self, pair: &PairKey) {
        if let Err(e) = self.open.delete(pair).await {
            warn!(pair = %pair, error = %e, "Failed to clear open-session index");
        }
    }
}
