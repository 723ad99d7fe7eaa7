//! Line-oriented operator console over stdin.
//!
//! Each line is one command; output goes to stdout. The console acts as
//! the signed-in user for `scan`, `redeem` and `refer`.

use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing;

use visitpoint_core::error::{AppError, EngineError};
use visitpoint_core::result::AppResult;
use visitpoint_core::traits::identity::{FixedIdentity, IdentityProvider};
use visitpoint_core::types::id::{UserId, VenueId};
use visitpoint_engine::{CheckinEngine, ScanOutcome};
use visitpoint_entity::code::ScanIntent;
use visitpoint_entity::format::{format_points, relative_time};
use visitpoint_entity::ledger::{LedgerEntry, RewardKind};

const HELP: &str = "\
commands:
  login <user>                 act as <user>
  issue <venue> [in|out]       print a fresh venue code
  scan <code>                  scan as the signed-in user
  present <venue>              visitors currently at <venue>
  history [user]               visit history, newest first
  points [user]                balance and recent totals
  ledger [user] [limit]        ledger entries, newest first
  redeem <reward> [event-id]   drink | special | vip
  refer <referee>              credit the signed-in user for a referral
  correct <user> <delta> <note...>
  tick                         run auto-close and pruning now
  help | quit";

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(UserId),
    Issue(VenueId, Option<ScanIntent>),
    Scan(String),
    Present(VenueId),
    History(Option<UserId>),
    Points(Option<UserId>),
    Ledger(Option<UserId>, Option<usize>),
    Redeem(RewardKind, Option<String>),
    Refer(UserId),
    Correct(UserId, i64, String),
    Tick,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err("empty command".to_string());
        };
        let args: Vec<&str> = words.collect();

        let command = match (name, args.as_slice()) {
            ("login", [user]) => Self::Login(parse(user)?),
            ("issue", [venue]) => Self::Issue(parse(venue)?, None),
            ("issue", [venue, intent]) => Self::Issue(parse(venue)?, Some(parse(intent)?)),
            ("scan", [code]) => Self::Scan((*code).to_string()),
            ("present", [venue]) => Self::Present(parse(venue)?),
            ("history", []) => Self::History(None),
            ("history", [user]) => Self::History(Some(parse(user)?)),
            ("points", []) => Self::Points(None),
            ("points", [user]) => Self::Points(Some(parse(user)?)),
            ("ledger", []) => Self::Ledger(None, None),
            ("ledger", [user]) => Self::Ledger(Some(parse(user)?), None),
            ("ledger", [user, limit]) => Self::Ledger(Some(parse(user)?), Some(parse(limit)?)),
            ("redeem", [reward]) => Self::Redeem(parse(reward)?, None),
            ("redeem", [reward, event]) => Self::Redeem(parse(reward)?, Some((*event).to_string())),
            ("refer", [referee]) => Self::Refer(parse(referee)?),
            ("correct", [user, delta, note @ ..]) if !note.is_empty() => {
                Self::Correct(parse(user)?, parse(delta)?, note.join(" "))
            }
            ("tick", []) => Self::Tick,
            ("help", []) => Self::Help,
            ("quit" | "exit", []) => Self::Quit,
            _ => return Err(format!("unrecognised command: {line}")),
        };
        Ok(command)
    }
}

fn parse<T>(word: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    word.parse().map_err(|e| format!("invalid argument '{word}': {e}"))
}

/// The operator console.
#[derive(Debug)]
pub struct Console {
    engine: Arc<CheckinEngine>,
    identity: Arc<FixedIdentity>,
}

impl Console {
    pub fn new(engine: Arc<CheckinEngine>, identity: Arc<FixedIdentity>) -> Self {
        Self { engine, identity }
    }

    /// Read commands from stdin until EOF or `quit`.
    pub async fn run(&self) -> AppResult<()> {
        println!("VisitPoint console. Type 'help' for commands.");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(Command::Quit) => break,
                Ok(command) => match self.execute(command).await {
                    Ok(out) => println!("{out}"),
                    Err(e) => println!("error: {e}"),
                },
                Err(e) => println!("{e}"),
            }
        }
        Ok(())
    }

    /// Run one command and render its output.
    pub async fn execute(&self, command: Command) -> AppResult<String> {
        let now = self.engine.now();
        let mut out = String::new();

        match command {
            Command::Login(user) => {
                self.identity.sign_in(user);
                tracing::debug!(user_id = %user, "Console user switched");
                let _ = write!(out, "signed in as {user}");
            }
            Command::Issue(venue, intent) => {
                out = self.engine.issuer().issue(venue, None, intent, now)?;
            }
            Command::Scan(code) => {
                let outcome = self.engine.scan_as_current_user(&code).await?;
                render_scan(&mut out, &outcome);
            }
            Command::Present(venue) => {
                let visitors = self.engine.get_present_visitors(venue).await.map_err(engine_error)?;
                if visitors.is_empty() {
                    out.push_str("nobody here");
                }
                for v in visitors {
                    let _ = writeln!(out, "{}  in {}", v.user_id, v.since);
                }
            }
            Command::History(user) => {
                let user = self.user_or_current(user).await?;
                let sessions = self.engine.get_visit_history(user).await.map_err(engine_error)?;
                if sessions.is_empty() {
                    out.push_str("no visits");
                }
                for s in sessions {
                    let stay = relative_time(s.stay_duration(now));
                    let _ = writeln!(
                        out,
                        "{}  {}  {}  {}",
                        s.check_in_at.format("%Y-%m-%d %H:%M"),
                        s.venue_id,
                        s.status,
                        s.close_reason.map(|r| r.to_string()).unwrap_or(stay)
                    );
                }
            }
            Command::Points(user) => {
                let user = self.user_or_current(user).await?;
                let summary = self.engine.get_points_summary(user).await.map_err(engine_error)?;
                let _ = write!(
                    out,
                    "balance {}  (last {}d: +{} / -{})",
                    summary.balance_display(),
                    summary.window_days,
                    format_points(summary.earned),
                    format_points(summary.spent)
                );
            }
            Command::Ledger(user, limit) => {
                let user = self.user_or_current(user).await?;
                let page = self
                    .engine
                    .get_point_history(user, limit, None)
                    .await
                    .map_err(engine_error)?;
                if page.items.is_empty() {
                    out.push_str("no entries");
                }
                for entry in &page.items {
                    render_entry(&mut out, entry);
                }
            }
            Command::Redeem(reward, event) => {
                let user = self.identity.current_user().await?;
                let entry = match event {
                    Some(event) => self.engine.redeem_once(user, reward, &event, now).await,
                    None => self.engine.redeem(user, reward, now).await,
                }
                .map_err(|e| AppError::from(EngineError::from(e)))?;
                render_entry(&mut out, &entry);
            }
            Command::Refer(referee) => {
                let referrer = self.identity.current_user().await?;
                match self
                    .engine
                    .award_referral(referrer, referee, now)
                    .await
                    .map_err(|e| AppError::from(EngineError::from(e)))?
                {
                    Some(entry) => render_entry(&mut out, &entry),
                    None => out.push_str("referral already counted"),
                }
            }
            Command::Correct(user, delta, note) => {
                let entry = self
                    .engine
                    .correct(user, delta, &note, now)
                    .await
                    .map_err(|e| AppError::from(EngineError::from(e)))?;
                render_entry(&mut out, &entry);
            }
            Command::Tick => {
                let report = self.engine.auto_close_expired(now).await.map_err(engine_error)?;
                let pruned = self.engine.prune(now);
                let _ = write!(
                    out,
                    "closed {}, failed {}, awarded {}, unsettled {}, pruned {} nonces",
                    report.closed.len(),
                    report.failed,
                    format_points(report.awarded.iter().map(|e| e.amount).sum()),
                    report.unsettled.len(),
                    pruned
                );
            }
            Command::Help => out.push_str(HELP),
            Command::Quit => {}
        }

        Ok(out.trim_end().to_string())
    }

    async fn user_or_current(&self, user: Option<UserId>) -> AppResult<UserId> {
        match user {
            Some(user) => Ok(user),
            None => self.identity.current_user().await,
        }
    }
}

fn engine_error(err: impl Into<EngineError>) -> AppError {
    AppError::from(err.into())
}

fn render_scan(out: &mut String, outcome: &ScanOutcome) {
    let _ = write!(
        out,
        "{} at {} (session {})",
        outcome.transition, outcome.session.venue_id, outcome.session.id
    );
    for entry in &outcome.awards {
        let _ = write!(out, "\n  {} {}", format_points(entry.amount), entry.reason.label());
    }
    if outcome.unsettled {
        out.push_str("\n  awards pending; retried on the next sweep");
    }
}

fn render_entry(out: &mut String, entry: &LedgerEntry) {
    let _ = writeln!(
        out,
        "{}  {:>9}  {:<16} balance {}{}",
        entry.created_at.format("%Y-%m-%d %H:%M"),
        format_points(entry.signed_amount()),
        entry.reason.label(),
        format_points(entry.resulting_balance),
        entry
            .note
            .as_deref()
            .map(|n| format!("  ({n})"))
            .unwrap_or_default()
    );
}
