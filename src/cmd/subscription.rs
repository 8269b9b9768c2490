use anyhow::Result;
use clap::Subcommand;
use tracing::{info, warn};

use crate::{
    cmd::live_provider,
    tiers::{PlanChange, Tier, classify_plan_change},
};

#[derive(Subcommand)]
pub enum SubscriptionCommands {
    /// Fetch and print the current subscription with its effective limits
    Show {},

    /// Create a hosted checkout session for a plan
    Checkout {
        /// Tier key (basis, premium, vip)
        tier: String,
    },

    /// Create a billing portal session
    Portal {
        /// Where the portal sends the user afterwards
        #[arg(short, long)]
        return_url: String,
    },
}

impl SubscriptionCommands {
    pub async fn execute(&self) -> Result<()> {
        let provider = live_provider()?;

        match self {
            SubscriptionCommands::Show {} => {
                if let Err(e) = provider.mount().await {
                    warn!(error = %e, retryable = e.is_transient(), "Subscription fetch failed");
                }
                let snapshot = provider.snapshot();

                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "status": snapshot.status(),
                        "record": snapshot.record(),
                        "effective_tier": snapshot.effective_tier(),
                        "is_active": snapshot.is_active(),
                        "limits": snapshot.limits(),
                        "error": snapshot.last_error().map(|e| e.to_string()),
                    }))?
                );
                Ok(())
            }
            SubscriptionCommands::Checkout { tier } => {
                let target: Tier = tier.parse()?;
                if let Err(e) = provider.mount().await {
                    warn!(error = %e, "Subscription fetch failed; assuming no current plan");
                }

                let change = classify_plan_change(provider.effective_tier(), target);
                if change == PlanChange::Current {
                    println!("Already on {}", target.definition().name);
                    return Ok(());
                }

                info!(target = %target, change = ?change, "Creating checkout session");
                let url = provider.source().create_checkout_session(target).await?;
                println!("{}", url);
                Ok(())
            }
            SubscriptionCommands::Portal { return_url } => {
                let url = provider.source().create_portal_session(return_url).await?;
                println!("{}", url);
                Ok(())
            }
        }
    }
}
