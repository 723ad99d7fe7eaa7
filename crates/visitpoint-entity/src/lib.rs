//! # visitpoint-entity
//!
//! Domain entity models for VisitPoint. Every struct in this crate is a
//! persisted record (sessions, ledger streams, award markers), a decoded
//! value object (scanned codes), or a read view served to the UI. Users
//! and venues are owned by external systems and appear here only as ids.

pub mod award;
pub mod code;
pub mod format;
pub mod job;
pub mod ledger;
pub mod session;
pub mod view;
