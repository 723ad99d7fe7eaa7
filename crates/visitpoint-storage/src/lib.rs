//! # visitpoint-storage
//!
//! Persistence provider implementations for VisitPoint records. The
//! production deployment plugs a backend-as-a-service document store in
//! behind [`PersistenceProvider`](visitpoint_core::traits::PersistenceProvider);
//! this crate ships the in-process store used by the server binary and
//! the tests, plus a fault-injecting wrapper for exercising outage paths.

pub mod providers;
pub mod stores;

pub use providers::{FaultyStore, MemoryStore};
pub use stores::Stores;
