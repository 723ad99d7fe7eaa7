//! Enumerated point reasons and the reward catalogue.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use visitpoint_core::config::RewardCosts;

/// Trigger or reward code attached to every ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointReason {
    /// Check-in bonus.
    CheckIn,
    /// Long-stay bonus.
    LongStay,
    /// Friend referral bonus.
    Referral,
    /// Drink discount redemption.
    DrinkDiscount,
    /// Special item redemption.
    SpecialItem,
    /// VIP membership redemption.
    VipMembership,
    /// Operator correction.
    Correction,
}

impl PointReason {
    /// Return the reason as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckIn => "check_in",
            Self::LongStay => "long_stay",
            Self::Referral => "referral",
            Self::DrinkDiscount => "drink_discount",
            Self::SpecialItem => "special_item",
            Self::VipMembership => "vip_membership",
            Self::Correction => "correction",
        }
    }

    /// Human label shown next to a ledger row.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CheckIn => "Check-in",
            Self::LongStay => "Long stay",
            Self::Referral => "Friend referral",
            Self::DrinkDiscount => "Drink discount",
            Self::SpecialItem => "Special item",
            Self::VipMembership => "VIP membership",
            Self::Correction => "Correction",
        }
    }
}

impl fmt::Display for PointReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A reward that can be bought with points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    /// Discount on one drink.
    DrinkDiscount,
    /// One special menu item.
    SpecialItem,
    /// VIP membership.
    VipMembership,
}

impl RewardKind {
    /// Every reward in catalogue order.
    pub const ALL: [RewardKind; 3] = [Self::DrinkDiscount, Self::SpecialItem, Self::VipMembership];

    /// Point cost under the given catalogue.
    pub fn cost(&self, costs: &RewardCosts) -> i64 {
        match self {
            Self::DrinkDiscount => costs.drink_discount,
            Self::SpecialItem => costs.special_item,
            Self::VipMembership => costs.vip_membership,
        }
    }

    /// Ledger reason recorded for a redemption.
    pub fn reason(&self) -> PointReason {
        match self {
            Self::DrinkDiscount => PointReason::DrinkDiscount,
            Self::SpecialItem => PointReason::SpecialItem,
            Self::VipMembership => PointReason::VipMembership,
        }
    }

    /// Return the reward as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        self.reason().as_str()
    }
}

impl fmt::Display for RewardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RewardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "drink_discount" | "drink" => Ok(Self::DrinkDiscount),
            "special_item" | "special" => Ok(Self::SpecialItem),
            "vip_membership" | "vip" => Ok(Self::VipMembership),
            other => Err(format!("unknown reward: {other}")),
        }
    }
}
