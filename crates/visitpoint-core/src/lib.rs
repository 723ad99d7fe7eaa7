//! # visitpoint-core
//!
//! Core crate for VisitPoint. Contains the collaborator traits the engine
//! consumes (persistence, cache, clock, identity), configuration schemas,
//! typed identifiers, pagination and time-range types, and the error
//! system shared by every other crate.
//!
//! This crate has **no** internal dependencies on other VisitPoint crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, EngineError, LedgerError, ScanError, SessionError, UnavailableError};
pub use result::AppResult;
