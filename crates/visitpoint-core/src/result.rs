//! Convenience result type alias for VisitPoint.

use crate::error::{AppError, UnavailableError};

/// A specialized `Result` type for application-level operations
/// (boot, configuration, cache).
pub type AppResult<T> = Result<T, AppError>;

/// Result of a persistence-provider call.
///
/// Providers only ever fail with [`UnavailableError`]; business outcomes
/// are decided by the engine on top of them.
pub type StoreResult<T> = Result<T, UnavailableError>;
