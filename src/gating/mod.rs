//! Shared decision logic for screens that gate actions on the plan.
//!
//! Every `evaluate_*` function is pure: same inputs, same decision, no
//! history. The `SubscriptionSnapshot::gate*` helpers wrap them with the
//! snapshot's tier and limits. Rendering a gate records nothing; call
//! [`record_attempt`] when the user actually tries the action.

pub mod features;
pub mod limits;
pub mod platforms;

pub use features::{Feature, FeatureDecision, evaluate_feature, feature_enabled, minimum_tier_for};
pub use limits::{GateDecision, GateState, Resource, UpgradePrompt, evaluate_limit, is_near_limit};
pub use platforms::{PlatformDecision, evaluate_platform, lowest_tier_with};

use crate::subscription::metrics::METRICS;

/// A gate outcome that can be counted once the user acts on it.
pub trait Decision {
    /// Metric label for this kind of gate.
    const GATE: &'static str;

    /// Whether the attempted action goes through.
    fn permits(&self) -> bool;
}

impl Decision for GateDecision {
    const GATE: &'static str = "limit";

    fn permits(&self) -> bool {
        self.allowed
    }
}

impl Decision for PlatformDecision {
    const GATE: &'static str = "platform";

    fn permits(&self) -> bool {
        // Connecting an already connected platform is a no-op, not a denial.
        self.allowed() || *self == PlatformDecision::AlreadyConnected
    }
}

impl Decision for FeatureDecision {
    const GATE: &'static str = "feature";

    fn permits(&self) -> bool {
        self.enabled
    }
}

/// Records a gated action the user tried (save a niche, connect a platform,
/// open a feature) and returns whether it may proceed. Denials are counted
/// in `printpass_gate_denied_total`.
pub fn record_attempt<D: Decision>(decision: &D) -> bool {
    let permitted = decision.permits();
    if !permitted {
        METRICS.record_denied(D::GATE);
    }
    permitted
}
