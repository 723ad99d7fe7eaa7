//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use super::Cli;
use crate::output::{self, OutputFormat};
use visitpoint_core::error::AppError;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the merged configuration (secret masked)
    Show,
    /// Validate the configuration
    Validate,
}

/// Execute config commands
pub fn execute(args: &ConfigArgs, cli: &Cli, format: OutputFormat) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let mut config = cli.load_config()?;
            config.scan.signing_secret = mask_secret(&config.scan.signing_secret);
            output::print_item(&config, format);
        }
        ConfigCommand::Validate => match cli.load_config() {
            Ok(config) => {
                output::print_success(&format!("Configuration '{}' is valid", cli.config));
                output::print_kv(
                    "Validity window",
                    &format!("{}s", config.scan.validity_window_seconds),
                );
                output::print_kv(
                    "Max session",
                    &format!("{}h", config.session.max_duration_hours),
                );
                output::print_kv("Venue overrides", &config.rules.venues.len().to_string());
                output::print_kv("Cache", &config.cache.provider);
                output::print_kv("Worker enabled", &config.worker.enabled.to_string());
            }
            Err(e) => {
                output::print_error(&format!("Configuration invalid: {}", e));
                return Err(e);
            }
        },
    }

    Ok(())
}

/// Keep the first four characters of a secret
fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}****")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abcdefghijklmnop"), "abcd****");
        assert_eq!(mask_secret("ab"), "ab****");
    }
}
