pub mod gate;
pub mod subscription;
pub mod tiers;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::{
    cmd::{gate::GateCommands, subscription::SubscriptionCommands, tiers::TierCommands},
    subscription::{
        BillingClient, SubscriptionProvider, SubscriptionRecord, SubscriptionSnapshot,
    },
    tiers::Tier,
    utils::config::ClientConfig,
};

#[derive(Parser)]
#[command(name = "printpass")]
#[command(about = "Inspect plans, limits and the live subscription", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Plan catalog commands
    #[command(subcommand)]
    Tiers(TierCommands),

    /// Evaluate a gate the way the dashboard would
    #[command(subcommand)]
    Gate(GateCommands),

    /// Live subscription and billing sessions
    #[command(subcommand)]
    Subscription(SubscriptionCommands),
}

/// Builds a provider against the configured backend.
pub fn live_provider() -> Result<SubscriptionProvider<BillingClient>> {
    let cfg = ClientConfig::load()?;
    let client = BillingClient::new(&cfg)?;
    Ok(SubscriptionProvider::new(client))
}

/// Parses `--tier`: a tier key, or `none` for "no active subscription".
pub fn parse_tier_override(value: &str) -> Result<Option<Tier>> {
    if value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    Ok(Some(value.parse::<Tier>()?))
}

/// Snapshot for gate commands: the `--tier` override if given, otherwise
/// the live subscription. A failed fetch still yields a (deny-all) snapshot.
pub async fn snapshot_for(tier: Option<&str>) -> Result<SubscriptionSnapshot> {
    if let Some(value) = tier {
        let record = parse_tier_override(value)?.map(|tier| SubscriptionRecord {
            tier,
            is_active: true,
            current_period_end: None,
            stripe_customer_id: None,
        });
        return Ok(SubscriptionSnapshot::from_record(record));
    }

    let provider = live_provider()?;
    if let Err(e) = provider.mount().await {
        warn!(error = %e, "Could not load subscription; treating user as unsubscribed");
    }
    Ok(provider.snapshot())
}
