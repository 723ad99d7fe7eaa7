//! Decoded QR code payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use visitpoint_core::types::id::{UserId, VenueId};

/// Version tag that prefixes every issued code.
pub const CODE_VERSION: &str = "v1";

/// What the venue wants the scan to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanIntent {
    /// Entry code: always checks in.
    In,
    /// Exit code: always checks out.
    Out,
}

impl ScanIntent {
    /// Return the intent as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

impl fmt::Display for ScanIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ScanIntent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            other => Err(format!("unknown scan intent: {other}")),
        }
    }
}

/// The JSON body carried inside a signed code.
///
/// Field names are kept short to keep the QR image small.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodePayload {
    /// Venue that displayed the code.
    #[serde(rename = "v")]
    pub venue_id: VenueId,
    /// Issue time, unix seconds.
    #[serde(rename = "iat")]
    pub issued_at: i64,
    /// Single-use nonce.
    #[serde(rename = "n")]
    pub nonce: String,
    /// User the code was issued for, if self-identifying.
    #[serde(rename = "u", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Entry/exit intent; absent for toggle codes.
    #[serde(rename = "i", default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<ScanIntent>,
}

/// A code that passed signature, expiry and replay checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCode {
    /// Venue the scan applies to.
    pub venue_id: VenueId,
    /// User embedded in the code, if any.
    pub user_id: Option<UserId>,
    /// Entry/exit intent, if any.
    pub intent: Option<ScanIntent>,
    /// When the code was issued.
    pub issued_at: DateTime<Utc>,
    /// The consumed nonce.
    pub nonce: String,
}
