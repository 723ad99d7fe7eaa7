//! Session tracking.

pub mod tracker;

pub use tracker::{AutoCloseReport, SessionTracker};
