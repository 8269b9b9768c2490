pub mod catalog;
pub mod resolver;

pub use catalog::{
    Platform, SupportLevel, TIER_ORDER, Tier, TierDefinition, all_definitions, definition,
};
pub use resolver::{
    EffectiveLimits, Limit, PlanChange, classify_plan_change, compare_tiers, compare_tiers_signum,
    next_tier, resolve_limits, resolve_limits_for_key,
};
