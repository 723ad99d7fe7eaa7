//! Venue code commands.

use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use crate::output::{self, OutputFormat};
use visitpoint_core::config::AppConfig;
use visitpoint_core::error::AppError;
use visitpoint_core::types::id::{UserId, VenueId};
use visitpoint_engine::CodeIssuer;
use visitpoint_entity::code::ScanIntent;

/// Arguments for `issue-code`
#[derive(Debug, Args)]
pub struct IssueCodeArgs {
    /// Venue the code is displayed at
    #[arg(long)]
    pub venue: VenueId,
    /// Bind the code to one user
    #[arg(long)]
    pub user: Option<UserId>,
    /// `in` or `out`; omit for a toggle code
    #[arg(long)]
    pub intent: Option<ScanIntent>,
}

/// Arguments for `inspect-code`
#[derive(Debug, Args)]
pub struct InspectCodeArgs {
    /// The raw code text
    pub code: String,
}

#[derive(Debug, Serialize)]
struct IssuedCode {
    code: String,
    venue_id: VenueId,
    user_id: Option<UserId>,
    intent: Option<ScanIntent>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct InspectedCode {
    venue_id: VenueId,
    user_id: Option<UserId>,
    intent: Option<ScanIntent>,
    nonce: String,
    issued_at: Option<DateTime<Utc>>,
    age_seconds: i64,
    expired: bool,
}

/// Issue a signed code
pub fn issue(args: &IssueCodeArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let issuer = CodeIssuer::new(&config.scan.signing_secret);
    let now = Utc::now();
    let code = issuer.issue(args.venue, args.user, args.intent, now)?;

    if format == OutputFormat::Table {
        println!("{}", code);
        return Ok(());
    }

    output::print_item(
        &IssuedCode {
            code,
            venue_id: args.venue,
            user_id: args.user,
            intent: args.intent,
            expires_at: now + chrono::Duration::seconds(config.scan.validity_window_seconds as i64),
        },
        format,
    );
    Ok(())
}

/// Verify a code's signature and print its payload.
///
/// Does not consult or touch any replay set.
pub fn inspect(args: &InspectCodeArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let issuer = CodeIssuer::new(&config.scan.signing_secret);
    let payload = issuer
        .decode(args.code.trim())
        .map_err(|e| AppError::validation(e.to_string()))?;

    let now = Utc::now();
    let age_seconds = now.timestamp() - payload.issued_at;
    let expired = age_seconds > config.scan.validity_window_seconds as i64;

    output::print_item(
        &InspectedCode {
            venue_id: payload.venue_id,
            user_id: payload.user_id,
            intent: payload.intent,
            nonce: payload.nonce,
            issued_at: DateTime::from_timestamp(payload.issued_at, 0),
            age_seconds,
            expired,
        },
        format,
    );
    if expired {
        output::print_warning("Code is outside its validity window");
    }
    Ok(())
}
