//! Point award and redemption rules.

pub mod engine;

pub use engine::RuleEngine;
