use serde::Serialize;

use crate::{
    gating::limits::UpgradePrompt,
    subscription::provider::SubscriptionSnapshot,
    tiers::{Platform, TIER_ORDER, Tier, definition, next_tier, resolve_limits},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PlatformDecision {
    Allowed,
    AlreadyConnected,
    NoSubscription,
    /// The plan does not include this platform at all.
    NotInPlan { upgrade_to: Option<Tier> },
    /// The plan includes it, but all platform slots are in use.
    LimitReached { upgrade_to: Option<Tier> },
}

impl PlatformDecision {
    pub fn allowed(&self) -> bool {
        matches!(self, PlatformDecision::Allowed)
    }

    pub fn upgrade(&self) -> Option<UpgradePrompt> {
        match self {
            PlatformDecision::NoSubscription => Some(UpgradePrompt::Subscribe),
            PlatformDecision::NotInPlan { upgrade_to } | PlatformDecision::LimitReached { upgrade_to } => {
                upgrade_to.map(UpgradePrompt::UpgradeTo)
            }
            PlatformDecision::Allowed | PlatformDecision::AlreadyConnected => None,
        }
    }
}

/// Cheapest plan whose catalog entry lists `platform`.
pub fn lowest_tier_with(platform: Platform) -> Option<Tier> {
    TIER_ORDER
        .into_iter()
        .find(|t| definition(*t).includes_platform(platform))
}

/// Decides whether the user may connect `platform` given the platforms
/// already connected to their campaigns.
pub fn evaluate_platform(
    platform: Platform,
    connected: &[Platform],
    tier: Option<Tier>,
) -> PlatformDecision {
    let Some(tier) = tier else {
        return PlatformDecision::NoSubscription;
    };

    if connected.contains(&platform) {
        return PlatformDecision::AlreadyConnected;
    }

    if !definition(tier).includes_platform(platform) {
        return PlatformDecision::NotInPlan {
            upgrade_to: lowest_tier_with(platform).filter(|t| *t > tier),
        };
    }

    let mut distinct: Vec<Platform> = Vec::with_capacity(connected.len());
    for p in connected {
        if !distinct.contains(p) {
            distinct.push(*p);
        }
    }

    if !resolve_limits(tier)
        .max_platforms
        .allows_another(distinct.len() as u64)
    {
        return PlatformDecision::LimitReached {
            upgrade_to: next_tier(tier),
        };
    }

    PlatformDecision::Allowed
}

impl SubscriptionSnapshot {
    pub fn gate_platform(&self, platform: Platform, connected: &[Platform]) -> PlatformDecision {
        evaluate_platform(platform, connected, self.effective_tier())
    }
}
