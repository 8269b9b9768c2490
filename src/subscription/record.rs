use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    subscription::client::FetchError,
    tiers::{EffectiveLimits, Tier, resolve_limits},
};

/// Billing states the backend reports that still grant access.
const ACTIVE_STATUSES: [&str; 2] = ["active", "trialing"];

/// Subscription row as the backend sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub tier: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
}

/// The user's subscription, read-only on this side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRecord {
    pub tier: Tier,
    pub is_active: bool,
    pub current_period_end: Option<DateTime<Utc>>,
    pub stripe_customer_id: Option<String>,
}

impl SubscriptionRecord {
    /// The tier that gates should honour, `None` unless the record is active.
    pub fn effective_tier(&self) -> Option<Tier> {
        self.is_active.then_some(self.tier)
    }

    pub fn limits(&self) -> EffectiveLimits {
        match self.effective_tier() {
            Some(tier) => resolve_limits(tier),
            None => EffectiveLimits::none(),
        }
    }
}

impl TryFrom<SubscriptionResponse> for SubscriptionRecord {
    type Error = FetchError;

    fn try_from(resp: SubscriptionResponse) -> Result<Self, Self::Error> {
        let tier: Tier = resp
            .tier
            .parse()
            .map_err(|_| FetchError::UnknownTier(resp.tier.clone()))?;

        // An explicit flag wins over the billing status string.
        let is_active = match (resp.is_active, resp.status.as_deref()) {
            (Some(flag), _) => flag,
            (None, Some(status)) => ACTIVE_STATUSES.contains(&status.to_ascii_lowercase().as_str()),
            (None, None) => false,
        };

        Ok(SubscriptionRecord {
            tier,
            is_active,
            current_period_end: resp.current_period_end,
            stripe_customer_id: resp.stripe_customer_id,
        })
    }
}
