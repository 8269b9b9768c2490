//! Count-based gates: "may the user add one more niche/product?"
//!
//! Feed these server-confirmed counts, not optimistic ones, or a quick
//! double submit can slip past the cap.

use serde::Serialize;
use std::{fmt, str::FromStr};

use crate::{
    subscription::provider::SubscriptionSnapshot,
    tiers::{EffectiveLimits, Limit, Tier, next_tier},
    utils::error::PrintpassError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    UnderLimit,
    /// Advisory only, adding is still allowed.
    NearLimit,
    AtLimit,
    NoSubscription,
}

impl GateState {
    /// Adding is still allowed; `NearLimit` only adds a warning.
    pub fn is_under_limit(&self) -> bool {
        matches!(self, GateState::UnderLimit | GateState::NearLimit)
    }
}

/// What the screen should offer instead of the blocked action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "tier", rename_all = "snake_case")]
pub enum UpgradePrompt {
    Subscribe,
    UpgradeTo(Tier),
}

impl fmt::Display for UpgradePrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradePrompt::Subscribe => f.write_str("choose a plan to continue"),
            UpgradePrompt::UpgradeTo(tier) => write!(f, "upgrade to {}", tier.definition().name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateDecision {
    pub state: GateState,
    pub allowed: bool,
    pub usage: u64,
    pub limit: Limit,
    pub upgrade: Option<UpgradePrompt>,
}

impl GateDecision {
    pub fn is_near_limit(&self) -> bool {
        self.state == GateState::NearLimit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Niches,
    Products,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Niches => "niches",
            Resource::Products => "products",
        }
    }

    pub fn limit_in(&self, limits: &EffectiveLimits) -> Limit {
        match self {
            Resource::Niches => limits.max_niches,
            Resource::Products => limits.max_products,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = PrintpassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "niches" | "niche" => Ok(Resource::Niches),
            "products" | "product" => Ok(Resource::Products),
            _ => Err(PrintpassError::UnknownResource(s.to_string())),
        }
    }
}

/// `usage >= 80%` of a finite cap. Never true for unlimited caps.
pub fn is_near_limit(usage: u64, limit: Limit) -> bool {
    match limit {
        Limit::Finite(max) => (usage as u128) * 5 >= (max as u128) * 4,
        Limit::Unlimited => false,
    }
}

/// Decides whether one more item may be added given `usage` items already
/// exist. `tier` is the effective tier; `None` means no active subscription
/// and denies everything.
pub fn evaluate_limit(usage: u64, limit: Limit, tier: Option<Tier>) -> GateDecision {
    let Some(tier) = tier else {
        return GateDecision {
            state: GateState::NoSubscription,
            allowed: false,
            usage,
            limit,
            upgrade: Some(UpgradePrompt::Subscribe),
        };
    };

    if !limit.allows_another(usage) {
        return GateDecision {
            state: GateState::AtLimit,
            allowed: false,
            usage,
            limit,
            upgrade: next_tier(tier).map(UpgradePrompt::UpgradeTo),
        };
    }

    let state = if is_near_limit(usage, limit) {
        GateState::NearLimit
    } else {
        GateState::UnderLimit
    };

    GateDecision {
        state,
        allowed: true,
        usage,
        limit,
        upgrade: None,
    }
}

impl SubscriptionSnapshot {
    /// Gate for `resource` against this snapshot's tier and limits.
    pub fn gate(&self, resource: Resource, usage: u64) -> GateDecision {
        evaluate_limit(
            usage,
            resource.limit_in(&self.limits()),
            self.effective_tier(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiers::resolve_limits;

    #[test]
    fn at_cap_blocks_the_next_add() {
        let limit = Limit::Finite(5);
        assert!(evaluate_limit(4, limit, Some(Tier::Basis)).allowed);
        let d = evaluate_limit(5, limit, Some(Tier::Basis));
        assert!(!d.allowed);
        assert_eq!(d.state, GateState::AtLimit);
    }

    #[test]
    fn over_cap_after_downgrade_is_at_limit() {
        let d = evaluate_limit(12, Limit::Finite(5), Some(Tier::Basis));
        assert_eq!(d.state, GateState::AtLimit);
        assert_eq!(d.upgrade, Some(UpgradePrompt::UpgradeTo(Tier::Premium)));
    }

    #[test]
    fn premium_at_cap_points_to_vip() {
        let limits = resolve_limits(Tier::Premium);
        let d = evaluate_limit(15, limits.max_niches, Some(Tier::Premium));
        assert_eq!(d.upgrade, Some(UpgradePrompt::UpgradeTo(Tier::Vip)));
    }

    #[test]
    fn no_subscription_denies_regardless_of_count() {
        for usage in [0, 1, 4, 1_000] {
            let d = evaluate_limit(usage, Limit::Unlimited, None);
            assert!(!d.allowed);
            assert_eq!(d.state, GateState::NoSubscription);
            assert_eq!(d.upgrade, Some(UpgradePrompt::Subscribe));
        }
    }

    #[test]
    fn near_limit_starts_at_eighty_percent() {
        assert!(!is_near_limit(3, Limit::Finite(5)));
        assert!(is_near_limit(4, Limit::Finite(5)));
        assert!(!is_near_limit(79, Limit::Finite(100)));
        assert!(is_near_limit(80, Limit::Finite(100)));
        assert!(!is_near_limit(u64::MAX, Limit::Unlimited));

        let d = evaluate_limit(4, Limit::Finite(5), Some(Tier::Basis));
        assert_eq!(d.state, GateState::NearLimit);
        assert!(d.allowed);
    }

    #[test]
    fn unlimited_is_always_under_limit() {
        for usage in [0, 5, 10_000, u64::MAX - 1] {
            let d = evaluate_limit(usage, Limit::Unlimited, Some(Tier::Vip));
            assert_eq!(d.state, GateState::UnderLimit);
            assert!(d.allowed);
        }
    }

    #[test]
    fn evaluation_is_repeatable() {
        let a = evaluate_limit(3, Limit::Finite(5), Some(Tier::Basis));
        let b = evaluate_limit(3, Limit::Finite(5), Some(Tier::Basis));
        assert_eq!(a, b);
    }

    #[test]
    fn resource_names_parse() {
        assert_eq!("Niches".parse::<Resource>().unwrap(), Resource::Niches);
        assert_eq!("product".parse::<Resource>().unwrap(), Resource::Products);
        assert!("shops".parse::<Resource>().is_err());
    }

    #[test]
    fn upgrade_prompt_serializes_with_tier() {
        let json = serde_json::to_value(UpgradePrompt::UpgradeTo(Tier::Premium)).unwrap();
        assert_eq!(json["kind"], "upgrade_to");
        assert_eq!(json["tier"], "premium");
    }
}
