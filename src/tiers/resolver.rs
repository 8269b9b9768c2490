use serde::{Serialize, Serializer};
use std::{cmp::Ordering, fmt};

use crate::{
    tiers::catalog::{RawLimit, TIER_ORDER, Tier, definition},
    utils::error::PrintpassError,
};

/// A cap on how many of something a plan allows. `Unlimited` compares
/// greater than every finite value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Limit {
    Finite(u64),
    Unlimited,
}

impl Limit {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Limit::Unlimited)
    }

    pub fn as_finite(&self) -> Option<u64> {
        match self {
            Limit::Finite(n) => Some(*n),
            Limit::Unlimited => None,
        }
    }

    /// Strict less-than: a cap of 5 allows the 5th item but blocks the 6th.
    pub fn allows_another(&self, current: u64) -> bool {
        match self {
            Limit::Finite(max) => current < *max,
            Limit::Unlimited => true,
        }
    }

    /// Remaining headroom, `None` when unlimited.
    pub fn remaining(&self, current: u64) -> Option<u64> {
        self.as_finite().map(|max| max.saturating_sub(current))
    }

    fn from_raw(raw: RawLimit) -> Self {
        match raw {
            RawLimit::UNLIMITED => Limit::Unlimited,
            other => Limit::Finite(other.get() as u64),
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Finite(n) => write!(f, "{}", n),
            Limit::Unlimited => f.write_str("unlimited"),
        }
    }
}

// JSON has no infinity; unlimited goes out as null.
impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Limit::Finite(n) => serializer.serialize_some(n),
            Limit::Unlimited => serializer.serialize_none(),
        }
    }
}

/// Numeric caps derived from a plan. The only value gates compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EffectiveLimits {
    pub max_niches: Limit,
    pub max_products: Limit,
    pub max_platforms: Limit,
}

impl EffectiveLimits {
    /// Limits for a user without an active subscription: nothing is allowed.
    pub const fn none() -> Self {
        Self {
            max_niches: Limit::Finite(0),
            max_products: Limit::Finite(0),
            max_platforms: Limit::Finite(0),
        }
    }
}

pub fn resolve_limits(tier: Tier) -> EffectiveLimits {
    let def = definition(tier);
    EffectiveLimits {
        max_niches: Limit::from_raw(def.max_niches),
        max_products: Limit::from_raw(def.max_products),
        max_platforms: Limit::from_raw(def.platform_limit),
    }
}

/// Resolves limits for a tier key that arrives as a string.
pub fn resolve_limits_for_key(key: &str) -> Result<EffectiveLimits, PrintpassError> {
    Ok(resolve_limits(key.parse()?))
}

pub fn compare_tiers(a: Tier, b: Tier) -> Ordering {
    a.rank().cmp(&b.rank())
}

/// `compare_tiers` as `-1 | 0 | 1`.
pub fn compare_tiers_signum(a: Tier, b: Tier) -> i8 {
    match compare_tiers(a, b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

pub fn next_tier(tier: Tier) -> Option<Tier> {
    TIER_ORDER.get(tier.rank() + 1).copied()
}

/// How a plan button relates to the user's current plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanChange {
    /// No active plan yet.
    Subscribe,
    Upgrade,
    Downgrade,
    Current,
}

pub fn classify_plan_change(current: Option<Tier>, target: Tier) -> PlanChange {
    let Some(current) = current else {
        return PlanChange::Subscribe;
    };

    match compare_tiers(target, current) {
        Ordering::Greater => PlanChange::Upgrade,
        Ordering::Less => PlanChange::Downgrade,
        Ordering::Equal => PlanChange::Current,
    }
}
