//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod cache;
pub mod logging;
pub mod query;
pub mod rules;
pub mod scan;
pub mod session;
pub mod worker;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use self::cache::{CacheConfig, MemoryCacheConfig};
pub use self::logging::LoggingConfig;
pub use self::query::QueryConfig;
pub use self::rules::{RewardCosts, RulesConfig, VenueRules};
pub use self::scan::ScanConfig;
pub use self::session::SessionConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Environment variable prefix for overrides, e.g. `VISITPOINT__SCAN__SIGNING_SECRET`.
pub const ENV_PREFIX: &str = "VISITPOINT";

/// Root application configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// (default file + environment overlay + environment variables).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// Scanned-code settings.
    #[validate(nested)]
    pub scan: ScanConfig,
    /// Visit session settings.
    #[serde(default)]
    #[validate(nested)]
    pub session: SessionConfig,
    /// Award and redemption rules.
    #[serde(default)]
    #[validate(nested)]
    pub rules: RulesConfig,
    /// Read-view settings.
    #[serde(default)]
    #[validate(nested)]
    pub query: QueryConfig,
    /// Query cache settings.
    #[serde(default)]
    #[validate(nested)]
    pub cache: CacheConfig,
    /// Background worker settings.
    #[serde(default)]
    #[validate(nested)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Merges `config_path`, an optional `config/{env}` overlay, and
    /// environment variables prefixed with `VISITPOINT__`, then validates
    /// the result.
    pub fn load(config_path: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.ensure_valid()?;
        Ok(config)
    }

    /// Configuration with every default and the given signing secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            scan: ScanConfig::with_secret(secret),
            session: SessionConfig::default(),
            rules: RulesConfig::default(),
            query: QueryConfig::default(),
            cache: CacheConfig::default(),
            worker: WorkerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Validate every section, including per-venue rule overrides.
    pub fn ensure_valid(&self) -> Result<(), AppError> {
        Validate::validate(self)?;
        for (venue_id, rules) in &self.rules.venues {
            Validate::validate(rules).map_err(|e| {
                AppError::configuration(format!("Invalid rules for venue {venue_id}: {e}"))
            })?;
        }
        Ok(())
    }
}
