//! QR code issuing and resolution configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Scanned-code configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScanConfig {
    /// HMAC secret shared by the code issuer (venue display) and the resolver.
    #[validate(length(min = 16))]
    pub signing_secret: String,
    /// How long an issued code stays valid, and how long its nonce is
    /// remembered for replay detection.
    #[serde(default = "default_validity_window")]
    #[validate(range(min = 1, max = 3600))]
    pub validity_window_seconds: u64,
    /// Upper bound on the raw code length accepted by the resolver.
    #[serde(default = "default_max_code_length")]
    #[validate(range(min = 64, max = 4096))]
    pub max_code_length: usize,
}

impl ScanConfig {
    /// Configuration with defaults and the given secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            signing_secret: secret.into(),
            validity_window_seconds: default_validity_window(),
            max_code_length: default_max_code_length(),
        }
    }
}

fn default_validity_window() -> u64 {
    300
}

fn default_max_code_length() -> usize {
    1024
}
