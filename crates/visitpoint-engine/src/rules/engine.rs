//! Rule engine: triggers to awards, rewards to costs.
//!
//! The engine holds no balance state. Every award or redemption is
//! exactly one ledger append, tagged with an [`AwardKey`] so repeating
//! the same event never produces a second entry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use visitpoint_core::config::{RulesConfig, VenueRules};
use visitpoint_core::error::LedgerError;
use visitpoint_core::types::id::{UserId, VenueId};
use visitpoint_entity::award::{Award, AwardKey, AwardMarker};
use visitpoint_entity::ledger::{EntryKind, LedgerEntry, PointReason, RewardKind};
use visitpoint_entity::session::{Session, SessionEvent};
use visitpoint_storage::stores::AwardStore;

use crate::ledger::{AppendRequest, PointsLedger};

/// Evaluates triggers and applies their awards.
#[derive(Debug)]
pub struct RuleEngine {
    rules: RulesConfig,
    ledger: Arc<PointsLedger>,
    claims: AwardStore,
}

impl RuleEngine {
    /// Create a rule engine over `ledger` with venue-scoped `rules`.
    pub fn new(rules: RulesConfig, ledger: Arc<PointsLedger>, claims: AwardStore) -> Self {
        Self {
            rules,
            ledger,
            claims,
        }
    }

    /// Rules in force at `venue_id`.
    pub fn rules_for(&self, venue_id: &VenueId) -> &VenueRules {
        self.rules.for_venue(venue_id)
    }

    /// The awards `event` earns for `session`, without applying them.
    ///
    /// A zero bonus disables its trigger.
    pub fn evaluate(&self, event: SessionEvent, session: &Session) -> Vec<Award> {
        let rules = self.rules.for_venue(&session.venue_id);
        let mut awards = Vec::new();
        match event {
            SessionEvent::CheckIn => {
                if rules.check_in_bonus > 0 {
                    awards.push(Award {
                        reason: PointReason::CheckIn,
                        amount: rules.check_in_bonus,
                    });
                }
            }
            SessionEvent::CheckOut | SessionEvent::AutoClose => {
                let Some(check_out_at) = session.check_out_at else {
                    return awards;
                };
                let stayed = check_out_at - session.check_in_at;
                if rules.long_stay_bonus > 0 && stayed >= rules.long_stay_threshold() {
                    awards.push(Award {
                        reason: PointReason::LongStay,
                        amount: rules.long_stay_bonus,
                    });
                }
            }
        }
        awards
    }

    /// Evaluate `event` and append each award once per session.
    ///
    /// Returns only the entries this call wrote; awards already applied
    /// for the session are skipped.
    pub async fn on_session_event(
        &self,
        event: SessionEvent,
        session: &Session,
        now: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut written = Vec::new();
        for award in self.evaluate(event, session) {
            let request = AppendRequest::new(session.user_id, EntryKind::Earned, award.amount, award.reason)
                .with_key(AwardKey::session(session.id, award.reason));
            let appended = self.ledger.apply(request, now).await?;
            if appended.fresh {
                info!(
                    user_id = %session.user_id,
                    venue_id = %session.venue_id,
                    session_id = %session.id,
                    event = %event,
                    reason = %award.reason,
                    amount = award.amount,
                    "Points awarded"
                );
                written.push(appended.entry);
            } else {
                debug!(session_id = %session.id, reason = %award.reason, "Award already applied");
            }
        }
        Ok(written)
    }

    /// Award the referral bonus to `referrer` for bringing in `referee`.
    ///
    /// A referee counts once: the first referrer to claim them gets the
    /// bonus, later claims return `None`. Repeating the winning call
    /// returns the original entry.
    pub async fn award_referral(
        &self,
        referrer: UserId,
        referee: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        let amount = self.rules.referral_bonus;
        if amount <= 0 || referrer == referee {
            return Ok(None);
        }

        let key = AwardKey::referral(referee);
        let marker = AwardMarker::claim(key.clone(), referrer, now);
        let previous = self
            .claims
            .atomic_update(
                &key,
                Box::new(move |current: Option<&AwardMarker>| {
                    if current.is_some() { None } else { Some(marker) }
                }),
            )
            .await?;

        if let Some(existing) = previous {
            if existing.user_id != referrer {
                debug!(referrer = %referrer, referee = %referee, "Referee already claimed by another referrer");
                return Ok(None);
            }
        }

        let request = AppendRequest::new(referrer, EntryKind::Earned, amount, PointReason::Referral)
            .with_key(key);
        let appended = self.ledger.apply(request, now).await?;
        if appended.fresh {
            info!(referrer = %referrer, referee = %referee, amount, "Referral bonus awarded");
        }
        Ok(Some(appended.entry))
    }

    /// Spend the cost of `reward` from `user_id`'s balance.
    ///
    /// With an `event_id` the redemption is idempotent: repeating it
    /// returns the original entry instead of spending twice.
    pub async fn redeem(
        &self,
        user_id: UserId,
        reward: RewardKind,
        event_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError> {
        let cost = reward.cost(&self.rules.rewards);
        let mut request = AppendRequest::new(user_id, EntryKind::Spent, cost, reward.reason());
        if let Some(event_id) = event_id {
            request = request.with_key(AwardKey::redemption(user_id, event_id));
        }
        let appended = self.ledger.apply(request, now).await?;
        if appended.fresh {
            info!(
                user_id = %user_id,
                reward = %reward,
                cost,
                balance = appended.entry.resulting_balance,
                "Reward redeemed"
            );
        }
        Ok(appended.entry)
    }
}
