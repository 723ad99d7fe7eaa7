//! Identity resolver: scanned code to venue/user context.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use visitpoint_core::config::ScanConfig;
use visitpoint_core::error::ScanError;
use visitpoint_entity::code::ResolvedCode;

use super::issuer::CodeIssuer;
use super::replay::ReplayGuard;

/// Validates scanned codes and consumes their nonces.
///
/// The only state it keeps is the replay set.
#[derive(Debug)]
pub struct IdentityResolver {
    issuer: CodeIssuer,
    replay: ReplayGuard,
    window: Duration,
    max_code_length: usize,
}

impl IdentityResolver {
    /// Create a resolver from scan configuration.
    pub fn new(config: &ScanConfig) -> Self {
        let window = Duration::seconds(config.validity_window_seconds as i64);
        Self {
            issuer: CodeIssuer::new(&config.signing_secret),
            replay: ReplayGuard::new(window),
            window,
            max_code_length: config.max_code_length,
        }
    }

    /// The issuer sharing this resolver's secret.
    pub fn issuer(&self) -> &CodeIssuer {
        &self.issuer
    }

    /// Resolve `raw` at `now`.
    ///
    /// Checks run in order: framing and signature, expiry, replay. Only a
    /// code that passes all three consumes its nonce.
    pub fn resolve(&self, raw: &str, now: DateTime<Utc>) -> Result<ResolvedCode, ScanError> {
        let raw = raw.trim();
        if raw.len() > self.max_code_length {
            return Err(ScanError::Malformed(format!(
                "code is {} bytes, limit {}",
                raw.len(),
                self.max_code_length
            )));
        }

        let payload = self.issuer.decode(raw)?;
        let issued_at = DateTime::<Utc>::from_timestamp(payload.issued_at, 0)
            .ok_or_else(|| ScanError::Malformed("issue time out of range".to_string()))?;

        let age = now - issued_at;
        if age > self.window {
            debug!(
                venue_id = %payload.venue_id,
                age_seconds = age.num_seconds(),
                "Rejected expired code"
            );
            return Err(ScanError::Expired {
                age_seconds: age.num_seconds(),
                window_seconds: self.window.num_seconds(),
            });
        }

        if !self
            .replay
            .check_and_insert(payload.venue_id, &payload.nonce, issued_at)
        {
            debug!(venue_id = %payload.venue_id, "Rejected replayed code");
            return Err(ScanError::Replayed);
        }

        Ok(ResolvedCode {
            venue_id: payload.venue_id,
            user_id: payload.user_id,
            intent: payload.intent,
            issued_at,
            nonce: payload.nonce,
        })
    }

    /// Return a resolved code's nonce to the pool after a retryable failure.
    pub fn release(&self, code: &ResolvedCode) {
        self.replay.release(code.venue_id, &code.nonce);
    }

    /// Drop expired nonces from the replay set.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        self.replay.prune(now)
    }

    /// Number of nonces currently remembered.
    pub fn tracked_nonces(&self) -> usize {
        self.replay.len()
    }
}
