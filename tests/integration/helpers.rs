//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use visitpoint_cache::CacheManager;
use visitpoint_core::config::{AppConfig, CacheConfig};
use visitpoint_core::traits::clock::{Clock, ManualClock};
use visitpoint_core::traits::identity::FixedIdentity;
use visitpoint_core::types::id::{SessionId, UserId, VenueId};
use visitpoint_engine::CheckinEngine;
use visitpoint_entity::code::ScanIntent;
use visitpoint_entity::ledger::UserLedger;
use visitpoint_entity::session::Session;
use visitpoint_storage::{FaultyStore, Stores};

pub const SECRET: &str = "integration-test-secret-0123456789";

/// Test application context
pub struct TestApp {
    /// Fully wired engine over in-memory stores
    pub engine: Arc<CheckinEngine>,
    /// Clock the engine reads
    pub clock: Arc<ManualClock>,
    /// Identity provider behind `scan_as_current_user`
    pub identity: Arc<FixedIdentity>,
    /// Fault switch in front of the session records
    pub sessions: Arc<FaultyStore<SessionId, Session>>,
    /// Fault switch in front of the ledger streams
    pub ledgers: Arc<FaultyStore<UserId, UserLedger>>,
    /// Configuration the engine was built from
    pub config: AppConfig,
}

impl TestApp {
    /// Create a new test application with default rules
    pub fn new() -> Self {
        Self::with_config(AppConfig::with_secret(SECRET))
    }

    /// Create a new test application from `config`
    pub fn with_config(config: AppConfig) -> Self {
        let clock = Arc::new(ManualClock::new(start()));
        let identity = Arc::new(FixedIdentity::default());

        let stores = Stores::in_memory();
        let sessions = Arc::new(FaultyStore::new(stores.sessions.clone()));
        let ledgers = Arc::new(FaultyStore::new(stores.ledgers.clone()));
        let stores = Stores {
            sessions: sessions.clone(),
            ledgers: ledgers.clone(),
            ..stores
        };

        let engine = Arc::new(CheckinEngine::new(
            &config,
            stores,
            CacheManager::new(&CacheConfig::default()).expect("memory cache"),
            clock.clone(),
            identity.clone(),
        ));

        Self {
            engine,
            clock,
            identity,
            sessions,
            ledgers,
            config,
        }
    }

    /// Current test time
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Issue a code for `venue` at the current test time
    pub fn code(&self, venue: VenueId, intent: Option<ScanIntent>) -> String {
        self.engine
            .issuer()
            .issue(venue, None, intent, self.now())
            .expect("issue code")
    }

    /// Check in by scanning a fresh entry code
    pub async fn scan_in(&self, user: UserId, venue: VenueId) -> visitpoint_engine::ScanOutcome {
        let code = self.code(venue, Some(ScanIntent::In));
        self.engine
            .scan(&code, user, self.now())
            .await
            .expect("scan in")
    }

    /// Check out by scanning a fresh exit code
    pub async fn scan_out(&self, user: UserId, venue: VenueId) -> visitpoint_engine::ScanOutcome {
        let code = self.code(venue, Some(ScanIntent::Out));
        self.engine
            .scan(&code, user, self.now())
            .await
            .expect("scan out")
    }

    /// Current balance through the summary view
    pub async fn balance(&self, user: UserId) -> i64 {
        self.engine
            .get_points_summary(user)
            .await
            .expect("points summary")
            .balance
    }
}

/// Fixed start instant for every test
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 6, 18, 0, 0)
        .single()
        .expect("valid start time")
}
