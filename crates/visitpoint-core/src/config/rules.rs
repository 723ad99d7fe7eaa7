//! Point award and redemption rules.
//!
//! Visit triggers are venue-scoped: `defaults` applies everywhere unless
//! `venues` carries an override for the venue. Referrals and redemptions
//! happen outside any venue, so their amounts are global.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::id::VenueId;

/// Rule configuration for every venue.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RulesConfig {
    /// Rules applied to venues without an override.
    #[serde(default)]
    #[validate(nested)]
    pub defaults: VenueRules,
    /// Per-venue overrides keyed by venue id.
    #[serde(default)]
    pub venues: HashMap<VenueId, VenueRules>,
    /// Points to the referrer when a referred friend joins. `0` disables
    /// referrals.
    #[serde(default = "default_referral_bonus")]
    #[validate(range(min = 0))]
    pub referral_bonus: i64,
    /// Reward catalogue costs.
    #[serde(default)]
    #[validate(nested)]
    pub rewards: RewardCosts,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            defaults: VenueRules::default(),
            venues: HashMap::new(),
            referral_bonus: default_referral_bonus(),
            rewards: RewardCosts::default(),
        }
    }
}

impl RulesConfig {
    /// Rules in force at `venue_id`.
    pub fn for_venue(&self, venue_id: &VenueId) -> &VenueRules {
        self.venues.get(venue_id).unwrap_or(&self.defaults)
    }
}

/// Visit trigger bonuses for one venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct VenueRules {
    /// Points for checking in (once per session). `0` disables the trigger.
    #[serde(default = "default_check_in_bonus")]
    #[validate(range(min = 0))]
    pub check_in_bonus: i64,
    /// Minimum stay, in minutes, for the long-stay bonus. At most a week.
    #[serde(default = "default_long_stay_threshold")]
    #[validate(range(min = 1, max = 10080))]
    pub long_stay_threshold_minutes: i64,
    /// Points for a stay of at least the threshold. `0` disables the trigger.
    #[serde(default = "default_long_stay_bonus")]
    #[validate(range(min = 0))]
    pub long_stay_bonus: i64,
}

impl VenueRules {
    /// The long-stay threshold as a duration.
    pub fn long_stay_threshold(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.long_stay_threshold_minutes)
    }
}

impl Default for VenueRules {
    fn default() -> Self {
        Self {
            check_in_bonus: default_check_in_bonus(),
            long_stay_threshold_minutes: default_long_stay_threshold(),
            long_stay_bonus: default_long_stay_bonus(),
        }
    }
}

/// Cost, in points, of each reward in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RewardCosts {
    /// Drink discount.
    #[serde(default = "default_drink_discount")]
    #[validate(range(min = 1))]
    pub drink_discount: i64,
    /// Special item.
    #[serde(default = "default_special_item")]
    #[validate(range(min = 1))]
    pub special_item: i64,
    /// VIP membership.
    #[serde(default = "default_vip_membership")]
    #[validate(range(min = 1))]
    pub vip_membership: i64,
}

impl Default for RewardCosts {
    fn default() -> Self {
        Self {
            drink_discount: default_drink_discount(),
            special_item: default_special_item(),
            vip_membership: default_vip_membership(),
        }
    }
}

fn default_check_in_bonus() -> i64 {
    100
}

fn default_long_stay_threshold() -> i64 {
    120
}

fn default_long_stay_bonus() -> i64 {
    150
}

fn default_referral_bonus() -> i64 {
    50
}

fn default_drink_discount() -> i64 {
    100
}

fn default_special_item() -> i64 {
    500
}

fn default_vip_membership() -> i64 {
    1000
}
