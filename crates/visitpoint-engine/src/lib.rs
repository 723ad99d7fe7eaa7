//! # visitpoint-engine
//!
//! The check-in and points-ledger engine behind the scan, visitors and
//! points screens.
//!
//! - [`resolver`]: signed QR codes, expiry and replay protection
//! - [`session`]: per-(user, venue) check-in/check-out and presence
//! - [`ledger`]: append-only per-user points ledger
//! - [`rules`]: trigger awards and reward costs
//! - [`query`]: cached read views
//!
//! [`CheckinEngine`] composes them into the operations the app calls.
//! All collaborators are injected; the engine holds no global state.

pub mod engine;
pub mod ledger;
pub mod locks;
pub mod query;
pub mod resolver;
pub mod rules;
pub mod session;

pub use engine::{CheckinEngine, ScanOutcome};
pub use ledger::PointsLedger;
pub use query::QueryService;
pub use resolver::{CodeIssuer, IdentityResolver};
pub use rules::RuleEngine;
pub use session::{AutoCloseReport, SessionTracker};
