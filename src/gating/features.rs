use serde::Serialize;
use std::{fmt, str::FromStr};

use crate::{
    gating::limits::UpgradePrompt,
    subscription::provider::SubscriptionSnapshot,
    tiers::{TIER_ORDER, Tier, TierDefinition, definition},
    utils::error::PrintpassError,
};

/// On/off capabilities that depend on the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    WinnerScaling,
    AdvancedAnalytics,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::WinnerScaling => "winner_scaling",
            Feature::AdvancedAnalytics => "advanced_analytics",
        }
    }

    fn enabled_in(&self, def: &TierDefinition) -> bool {
        match self {
            Feature::WinnerScaling => def.winner_scaling,
            Feature::AdvancedAnalytics => def.advanced_analytics,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = PrintpassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "winner_scaling" => Ok(Feature::WinnerScaling),
            "advanced_analytics" => Ok(Feature::AdvancedAnalytics),
            _ => Err(PrintpassError::UnknownFeature(s.to_string())),
        }
    }
}

pub fn feature_enabled(tier: Option<Tier>, feature: Feature) -> bool {
    tier.is_some_and(|t| feature.enabled_in(definition(t)))
}

/// Cheapest plan that turns `feature` on.
pub fn minimum_tier_for(feature: Feature) -> Option<Tier> {
    TIER_ORDER
        .into_iter()
        .find(|t| feature.enabled_in(definition(*t)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureDecision {
    pub feature: Feature,
    pub enabled: bool,
    pub upgrade: Option<UpgradePrompt>,
}

pub fn evaluate_feature(tier: Option<Tier>, feature: Feature) -> FeatureDecision {
    let enabled = feature_enabled(tier, feature);
    let upgrade = match (enabled, tier) {
        (true, _) => None,
        (false, None) => Some(UpgradePrompt::Subscribe),
        (false, Some(_)) => minimum_tier_for(feature).map(UpgradePrompt::UpgradeTo),
    };

    FeatureDecision {
        feature,
        enabled,
        upgrade,
    }
}

impl SubscriptionSnapshot {
    pub fn gate_feature(&self, feature: Feature) -> FeatureDecision {
        evaluate_feature(self.effective_tier(), feature)
    }
}
