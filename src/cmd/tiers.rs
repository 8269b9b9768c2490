use anyhow::Result;
use clap::Subcommand;

use crate::tiers::{
    Tier, TierDefinition, all_definitions, compare_tiers_signum, definition, resolve_limits,
};

#[derive(Subcommand)]
pub enum TierCommands {
    /// List every plan with its limits
    List {},

    /// Show one plan in detail
    Show {
        /// Tier key (basis, premium, vip)
        tier: String,
    },

    /// Compare two plans in upgrade order (-1, 0, 1)
    Compare {
        /// Left-hand tier key
        a: String,

        /// Right-hand tier key
        b: String,
    },
}

impl TierCommands {
    pub async fn execute(&self) -> Result<()> {
        match self {
            TierCommands::List {} => {
                println!(
                    "{:<8} {:>6} {:>10} {:>10} {:>10}  platforms",
                    "tier", "price", "niches", "products", "slots"
                );
                for def in all_definitions() {
                    let limits = resolve_limits(def.tier);
                    println!(
                        "{:<8} {:>6} {:>10} {:>10} {:>10}  {}",
                        def.tier.as_str(),
                        def.price,
                        limits.max_niches.to_string(),
                        limits.max_products.to_string(),
                        limits.max_platforms.to_string(),
                        platform_list(def),
                    );
                }
                Ok(())
            }
            TierCommands::Show { tier } => {
                let tier: Tier = tier.parse()?;
                let def = definition(tier);
                let limits = resolve_limits(tier);

                println!("{} ({})", def.name, def.tier);
                println!("  price:              {}/month", def.price);
                println!("  niches:             {}", limits.max_niches);
                println!("  products:           {}", limits.max_products);
                println!("  platforms:          {}", platform_list(def));
                println!("  platform slots:     {}", limits.max_platforms);
                println!("  winner scaling:     {}", def.winner_scaling);
                println!("  advanced analytics: {}", def.advanced_analytics);
                println!("  support:            {:?}", def.support);
                for feature in def.features {
                    println!("  - {}", feature);
                }
                Ok(())
            }
            TierCommands::Compare { a, b } => {
                let a: Tier = a.parse()?;
                let b: Tier = b.parse()?;
                println!("{}", compare_tiers_signum(a, b));
                Ok(())
            }
        }
    }
}

fn platform_list(def: &TierDefinition) -> String {
    def.platforms
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(",")
}
