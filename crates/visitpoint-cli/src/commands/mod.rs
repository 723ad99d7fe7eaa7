//! CLI command definitions and dispatch.

pub mod code;
pub mod config;
pub mod rules;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use visitpoint_core::config::AppConfig;
use visitpoint_core::error::AppError;

/// VisitPoint — venue check-in and points tooling
#[derive(Debug, Parser)]
#[command(name = "visitpoint", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Environment overlay (`config/{env}.toml`)
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Issue a signed venue code
    IssueCode(code::IssueCodeArgs),
    /// Verify and decode a scanned code
    InspectCode(code::InspectCodeArgs),
    /// Configuration management
    Config(config::ConfigArgs),
    /// Show award and redemption rules
    Rules(rules::RulesArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::IssueCode(args) => code::issue(args, &self.load_config()?, self.format),
            Commands::InspectCode(args) => code::inspect(args, &self.load_config()?, self.format),
            Commands::Config(args) => config::execute(args, self, self.format),
            Commands::Rules(args) => rules::execute(args, &self.load_config()?, self.format),
        }
    }

    /// Load configuration from the selected file and environment
    pub fn load_config(&self) -> Result<AppConfig, AppError> {
        tracing::debug!("Loading configuration from '{}' (env={})", self.config, self.env);
        AppConfig::load(&self.config, &self.env)
    }
}
