//! The set of record stores the engine runs on.

use std::sync::Arc;

use visitpoint_core::traits::persistence::PersistenceProvider;
use visitpoint_core::types::id::{PairKey, SessionId, UserId};
use visitpoint_entity::award::{AwardKey, AwardMarker};
use visitpoint_entity::ledger::UserLedger;
use visitpoint_entity::session::Session;

use crate::providers::memory::MemoryStore;

/// Session records by id.
pub type SessionStore = Arc<dyn PersistenceProvider<SessionId, Session>>;
/// Index of the OPEN session per (user, venue) pair.
pub type OpenSessionIndex = Arc<dyn PersistenceProvider<PairKey, SessionId>>;
/// Ledger streams by user.
pub type LedgerStore = Arc<dyn PersistenceProvider<UserId, UserLedger>>;
/// Award idempotency markers.
pub type AwardStore = Arc<dyn PersistenceProvider<AwardKey, AwardMarker>>;

/// Every persistence provider the engine needs.
#[derive(Debug, Clone)]
pub struct Stores {
    /// Session records.
    pub sessions: SessionStore,
    /// Open-session index.
    pub open_sessions: OpenSessionIndex,
    /// Per-user ledger streams.
    pub ledgers: LedgerStore,
    /// Award markers.
    pub awards: AwardStore,
}

impl Stores {
    /// Fresh, empty in-process stores.
    pub fn in_memory() -> Self {
        Self {
            sessions: Arc::new(MemoryStore::new("sessions")),
            open_sessions: Arc::new(MemoryStore::new("open_sessions")),
            ledgers: Arc::new(MemoryStore::new("ledgers")),
            awards: Arc::new(MemoryStore::new("awards")),
        }
    }
}
