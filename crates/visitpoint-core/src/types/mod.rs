//! Core type definitions used across the VisitPoint workspace.

pub mod id;
pub mod pagination;
pub mod time_range;

pub use id::*;
pub use pagination::{CursorPage, HistoryCursor};
pub use time_range::TimeRange;
