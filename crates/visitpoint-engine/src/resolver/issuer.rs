//! Signed QR code encoding and verification.
//!
//! A code is `v1.<payload>.<sig>` where `payload` is the URL-safe base64
//! of the JSON [`CodePayload`] and `sig` is the URL-safe base64 of
//! HMAC-SHA256 over the payload part.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use visitpoint_core::error::{AppError, ScanError};
use visitpoint_core::types::id::{UserId, VenueId};
use visitpoint_entity::code::{CODE_VERSION, CodePayload, ScanIntent};

type HmacSha256 = Hmac<Sha256>;

/// Issues and verifies venue QR codes.
#[derive(Clone)]
pub struct CodeIssuer {
    secret: Vec<u8>,
}

impl std::fmt::Debug for CodeIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeIssuer").finish_non_exhaustive()
    }
}

impl CodeIssuer {
    /// Create an issuer signing with `secret`.
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Issue a fresh single-use code for `venue_id`.
    pub fn issue(
        &self,
        venue_id: VenueId,
        user_id: Option<UserId>,
        intent: Option<ScanIntent>,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let payload = CodePayload {
            venue_id,
            issued_at: now.timestamp(),
            nonce: Uuid::new_v4().simple().to_string(),
            user_id,
            intent,
        };
        self.encode(&payload)
    }

    /// Sign an explicit payload.
    pub fn encode(&self, payload: &CodePayload) -> Result<String, AppError> {
        let json = serde_json::to_vec(payload)?;
        let payload_part = URL_SAFE_NO_PAD.encode(json);
        let mut mac = self
            .mac()
            .map_err(|e| AppError::internal(format!("Failed to initialise signer: {e}")))?;
        mac.update(payload_part.as_bytes());
        let sig_part = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{CODE_VERSION}.{payload_part}.{sig_part}"))
    }

    /// Verify framing and signature, then decode the payload.
    ///
    /// Expiry and replay are not checked here.
    pub fn decode(&self, raw: &str) -> Result<CodePayload, ScanError> {
        let (payload_part, sig_part) = split_code(raw)?;

        let expected = URL_SAFE_NO_PAD
            .decode(sig_part)
            .map_err(|e| ScanError::Malformed(format!("bad signature encoding: {e}")))?;
        let mut mac = self
            .mac()
            .map_err(|e| ScanError::Malformed(e.to_string()))?;
        mac.update(payload_part.as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| ScanError::Malformed("signature mismatch".to_string()))?;

        let json = URL_SAFE_NO_PAD
            .decode(payload_part)
            .map_err(|e| ScanError::Malformed(format!("bad payload encoding: {e}")))?;
        serde_json::from_slice(&json)
            .map_err(|e| ScanError::Malformed(format!("bad payload: {e}")))
    }

    fn mac(&self) -> Result<HmacSha256, hmac::digest::InvalidLength> {
        HmacSha256::new_from_slice(&self.secret)
    }
}

fn split_code(raw: &str) -> Result<(&str, &str), ScanError> {
    let parts: Vec<&str> = raw.split('.').collect();
    match parts.as_slice() {
        [version, payload, sig] if *version == CODE_VERSION => {
            if payload.is_empty() || sig.is_empty() {
                return Err(ScanError::Malformed("empty code section".to_string()));
            }
            Ok((payload, sig))
        }
        [version, _, _] => Err(ScanError::Malformed(format!(
            "unsupported code version: {version}"
        ))),
        _ => Err(ScanError::Malformed("invalid code framing".to_string())),
    }
}
