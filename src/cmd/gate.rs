use anyhow::{Result, anyhow};
use clap::Subcommand;

use crate::{
    cmd::snapshot_for,
    gating::{Feature, Resource},
    tiers::Platform,
};

#[derive(Subcommand)]
pub enum GateCommands {
    /// May one more niche/product be added?
    Limit {
        /// Resource being added (niches, products)
        #[arg(short, long)]
        resource: String,

        /// Server-confirmed count that already exists
        #[arg(short, long)]
        count: u64,

        /// Evaluate against this tier ("none" for no subscription) instead of the live one
        #[arg(short, long)]
        tier: Option<String>,
    },

    /// May another ad platform be connected?
    Platform {
        /// Platform to connect (pinterest, meta, tiktok, google)
        #[arg(short, long)]
        platform: String,

        /// Platforms already connected, comma separated
        #[arg(long, value_delimiter = ',')]
        connected: Vec<String>,

        /// Evaluate against this tier ("none" for no subscription) instead of the live one
        #[arg(short, long)]
        tier: Option<String>,
    },

    /// Is a plan feature available?
    Feature {
        /// Feature key (winner_scaling, advanced_analytics)
        #[arg(short, long)]
        feature: String,

        /// Evaluate against this tier ("none" for no subscription) instead of the live one
        #[arg(short, long)]
        tier: Option<String>,
    },
}

impl GateCommands {
    pub async fn execute(&self) -> Result<()> {
        match self {
            GateCommands::Limit {
                resource,
                count,
                tier,
            } => {
                let resource: Resource = resource.parse()?;
                let snapshot = snapshot_for(tier.as_deref()).await?;
                let decision = snapshot.gate(resource, *count);

                println!("{}", serde_json::to_string_pretty(&decision)?);
                if let Some(prompt) = decision.upgrade {
                    println!("{} {}: {}", count, resource, prompt);
                }
                Ok(())
            }
            GateCommands::Platform {
                platform,
                connected,
                tier,
            } => {
                let platform: Platform = platform.parse()?;
                let connected = connected
                    .iter()
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| s.parse::<Platform>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| anyhow!("invalid --connected value: {}", e))?;
                let snapshot = snapshot_for(tier.as_deref()).await?;
                let decision = snapshot.gate_platform(platform, &connected);

                println!("{}", serde_json::to_string_pretty(&decision)?);
                if let Some(prompt) = decision.upgrade() {
                    println!("{}: {}", platform, prompt);
                }
                Ok(())
            }
            GateCommands::Feature { feature, tier } => {
                let feature: Feature = feature.parse()?;
                let snapshot = snapshot_for(tier.as_deref()).await?;
                let decision = snapshot.gate_feature(feature);

                println!("{}", serde_json::to_string_pretty(&decision)?);
                Ok(())
            }
        }
    }
}
