//! Session transitions fed to the rule engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A session state change that may trigger awards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    /// A session was opened.
    CheckIn,
    /// A session was closed by the user.
    CheckOut,
    /// A session was closed by the auto-close sweep.
    AutoClose,
}

impl SessionEvent {
    /// Return the event as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckIn => "check_in",
            Self::CheckOut => "check_out",
            Self::AutoClose => "auto_close",
        }
    }

    /// Whether the event ends a session.
    pub fn is_close(&self) -> bool {
        matches!(self, Self::CheckOut | Self::AutoClose)
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a scan did to the user's session at the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// A new session was opened.
    CheckedIn,
    /// The open session was closed.
    CheckedOut,
}

impl Transition {
    /// The rule-engine event this transition produces.
    pub fn event(&self) -> SessionEvent {
        match self {
            Self::CheckedIn => SessionEvent::CheckIn,
            Self::CheckedOut => SessionEvent::CheckOut,
        }
    }

    /// Return the transition as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckedIn => "checked_in",
            Self::CheckedOut => "checked_out",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
