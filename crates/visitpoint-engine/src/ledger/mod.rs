//! Points ledger.

pub mod service;

pub use service::{AppendRequest, Appended, PointsLedger};
