//! Rule listing command.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use visitpoint_core::config::{AppConfig, RulesConfig, VenueRules};
use visitpoint_core::error::AppError;
use visitpoint_entity::format::format_points;

/// Arguments for `rules`
#[derive(Debug, Args)]
pub struct RulesArgs {
    /// Only show this venue (defaults apply when it has no override)
    #[arg(long)]
    pub venue: Option<visitpoint_core::types::id::VenueId>,
}

#[derive(Debug, Serialize, Tabled)]
struct RuleRow {
    /// Venue
    venue: String,
    /// Check-in bonus
    #[tabled(rename = "check-in")]
    check_in: String,
    /// Long-stay threshold
    #[tabled(rename = "long stay after")]
    long_stay_after: String,
    /// Long-stay bonus
    #[tabled(rename = "long stay")]
    long_stay: String,
}

/// Amounts that do not depend on the venue.
#[derive(Debug, Serialize)]
struct GlobalRules {
    referral: String,
    drink_discount: String,
    special_item: String,
    vip_membership: String,
}

impl GlobalRules {
    fn new(rules: &RulesConfig) -> Self {
        Self {
            referral: format_points(rules.referral_bonus),
            drink_discount: format_points(rules.rewards.drink_discount),
            special_item: format_points(rules.rewards.special_item),
            vip_membership: format_points(rules.rewards.vip_membership),
        }
    }
}

impl RuleRow {
    fn new(venue: String, rules: &VenueRules) -> Self {
        Self {
            venue,
            check_in: format_points(rules.check_in_bonus),
            long_stay_after: format!("{}m", rules.long_stay_threshold_minutes),
            long_stay: format_points(rules.long_stay_bonus),
        }
    }
}

/// List the default rules, every venue override and the global amounts
pub fn execute(args: &RulesArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let rows: Vec<RuleRow> = match args.venue {
        Some(venue_id) => vec![RuleRow::new(
            venue_id.to_string(),
            config.rules.for_venue(&venue_id),
        )],
        None => {
            let mut venues: Vec<_> = config.rules.venues.iter().collect();
            venues.sort_by_key(|(id, _)| **id);
            std::iter::once(RuleRow::new("(default)".to_string(), &config.rules.defaults))
                .chain(venues.into_iter().map(|(id, rules)| RuleRow::new(id.to_string(), rules)))
                .collect()
        }
    };

    output::print_list(&rows, format);
    if format == OutputFormat::Table {
        println!();
        println!("Referral and rewards (all venues):");
    }
    output::print_item(&GlobalRules::new(&config.rules), format);
    Ok(())
}
