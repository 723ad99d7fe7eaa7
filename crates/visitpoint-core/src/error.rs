//! Error types for VisitPoint.
//!
//! Two layers live here:
//!
//! - [`AppError`] is the application-boundary error used for boot,
//!   configuration, cache and other infrastructure faults.
//! - The engine's domain errors ([`ScanError`], [`SessionError`],
//!   [`LedgerError`], combined into [`EngineError`]) are definite business
//!   outcomes the UI renders one message per kind for. Provider faults are
//!   carried separately as [`UnavailableError`], the only retryable case.

use std::fmt;

use thiserror::Error;

use crate::types::id::{UserId, VenueId};

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested resource was not found.
    NotFound,
    /// Input validation failed.
    Validation,
    /// A conflict occurred (already open, already used, etc.).
    Conflict,
    /// An internal error occurred.
    Internal,
    /// A cache error occurred.
    Cache,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// A scanned code was rejected.
    Scan,
    /// A session transition was rejected.
    Session,
    /// A ledger append was rejected.
    Ledger,
    /// The persistence provider is temporarily unavailable.
    ServiceUnavailable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Cache => write!(f, "CACHE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Scan => write!(f, "SCAN"),
            Self::Session => write!(f, "SESSION"),
            Self::Ledger => write!(f, "LEDGER"),
            Self::ServiceUnavailable => write!(f, "SERVICE_UNAVAILABLE"),
        }
    }
}

/// The unified application error used at the application boundary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cache, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a service-unavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Invalid configuration: {err}"),
            err,
        )
    }
}

// ── Provider faults ────────────────────────────────────────

/// The persistence provider could not serve the request (network or
/// storage outage). Safe to retry with backoff.
#[derive(Debug, Error)]
#[error("persistence unavailable: {message}")]
pub struct UnavailableError {
    /// What the provider was doing when it failed.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl UnavailableError {
    /// Create a new unavailable error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create an unavailable error with an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl Clone for UnavailableError {
    fn clone(&self) -> Self {
        Self {
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<UnavailableError> for AppError {
    fn from(err: UnavailableError) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, err.message)
    }
}

// ── Domain errors ──────────────────────────────────────────

/// Rejection of a scanned QR code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanError {
    /// The payload could not be decoded or its signature did not verify.
    #[error("scanned code is malformed: {0}")]
    Malformed(String),
    /// The code is older than the validity window.
    #[error("scanned code expired ({age_seconds}s old, window {window_seconds}s)")]
    Expired {
        /// Seconds between issue and resolution.
        age_seconds: i64,
        /// Configured validity window in seconds.
        window_seconds: i64,
    },
    /// The code's nonce was already resolved for this venue.
    #[error("scanned code was already used")]
    Replayed,
}

impl ScanError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "MALFORMED",
            Self::Expired { .. } => "EXPIRED",
            Self::Replayed => "REPLAYED",
        }
    }
}

/// Rejection of a session transition.
#[derive(Debug, Error)]
pub enum SessionError {
    /// An OPEN session already exists for the pair.
    #[error("user {user_id} already has an open session at venue {venue_id}")]
    AlreadyOpen {
        /// The user.
        user_id: UserId,
        /// The venue.
        venue_id: VenueId,
    },
    /// No OPEN session exists for the pair.
    #[error("user {user_id} has no open session at venue {venue_id}")]
    NotOpen {
        /// The user.
        user_id: UserId,
        /// The venue.
        venue_id: VenueId,
    },
    /// The persistence provider failed.
    #[error(transparent)]
    Unavailable(#[from] UnavailableError),
}

impl SessionError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyOpen { .. } => "ALREADY_OPEN",
            Self::NotOpen { .. } => "NOT_OPEN",
            Self::Unavailable(_) => "UNAVAILABLE",
        }
    }

    /// Whether retrying with backoff may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Rejection of a ledger append.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Amounts must be strictly positive; the kind carries the sign.
    #[error("ledger amount must be positive, got {amount}")]
    NonPositiveAmount {
        /// The rejected amount.
        amount: i64,
    },
    /// A spend larger than the current balance.
    #[error("insufficient balance: {balance} available, {requested} requested")]
    InsufficientBalance {
        /// Balance at the time of the attempt.
        balance: i64,
        /// Amount the caller tried to spend.
        requested: i64,
    },
    /// The resulting balance would not fit in an `i64`.
    #[error("balance overflow: {balance} cannot take {amount} more")]
    BalanceOverflow {
        /// Balance at the time of the attempt.
        balance: i64,
        /// Amount the caller tried to add.
        amount: i64,
    },
    /// The persistence provider failed.
    #[error(transparent)]
    Unavailable(#[from] UnavailableError),
}

impl LedgerError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NonPositiveAmount { .. } => "NON_POSITIVE_AMOUNT",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::BalanceOverflow { .. } => "BALANCE_OVERFLOW",
            Self::Unavailable(_) => "UNAVAILABLE",
        }
    }

    /// Whether retrying with backoff may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Error returned by composed engine operations such as `scan`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The scanned code was rejected.
    #[error(transparent)]
    Scan(#[from] ScanError),
    /// The session transition was rejected.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// A ledger append was rejected.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// The persistence provider failed.
    #[error(transparent)]
    Unavailable(#[from] UnavailableError),
}

impl EngineError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Scan(e) => e.code(),
            Self::Session(e) => e.code(),
            Self::Ledger(e) => e.code(),
            Self::Unavailable(_) => "UNAVAILABLE",
        }
    }

    /// Whether retrying with backoff may succeed.
    ///
    /// Business-rule outcomes are final; only provider faults qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Scan(_) => false,
            Self::Session(e) => e.is_retryable(),
            Self::Ledger(e) => e.is_retryable(),
            Self::Unavailable(_) => true,
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let kind = match &err {
            EngineError::Scan(_) => ErrorKind::Scan,
            EngineError::Session(SessionError::Unavailable(_))
            | EngineError::Ledger(LedgerError::Unavailable(_))
            | EngineError::Unavailable(_) => ErrorKind::ServiceUnavailable,
            EngineError::Session(_) => ErrorKind::Session,
            EngineError::Ledger(_) => ErrorKind::Ledger,
        };
        Self::new(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ScanError::Replayed.code(), "REPLAYED");
        assert_eq!(
            LedgerError::NonPositiveAmount { amount: 0 }.code(),
            "NON_POSITIVE_AMOUNT"
        );
        let err = EngineError::from(SessionError::NotOpen {
            user_id: UserId::new(),
            venue_id: VenueId::new(),
        });
        assert_eq!(err.code(), "NOT_OPEN");
    }

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(!EngineError::from(ScanError::Replayed).is_retryable());
        assert!(
            !EngineError::from(LedgerError::InsufficientBalance {
                balance: 10,
                requested: 20
            })
            .is_retryable()
        );
        assert!(EngineError::from(UnavailableError::new("down")).is_retryable());
        assert!(
            EngineError::from(SessionError::Unavailable(UnavailableError::new("down")))
                .is_retryable()
        );
    }

    #[test]
    fn test_engine_error_maps_to_app_error_kind() {
        let app: AppError = EngineError::from(ScanError::Malformed("bad".into())).into();
        assert_eq!(app.kind, ErrorKind::Scan);
        let app: AppError = EngineError::from(LedgerError::Unavailable(UnavailableError::new(
            "down",
        )))
        .into();
        assert_eq!(app.kind, ErrorKind::ServiceUnavailable);
    }
}
