use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::utils::error::PrintpassError;

/// Subscription plans, declared in upgrade order so the derived `Ord`
/// is the plan order: basis < premium < vip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Basis,
    Premium,
    Vip,
}

/// Fixed upgrade order used by every comparison in the crate.
pub const TIER_ORDER: [Tier; 3] = [Tier::Basis, Tier::Premium, Tier::Vip];

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Basis => "basis",
            Tier::Premium => "premium",
            Tier::Vip => "vip",
        }
    }

    /// Position in [`TIER_ORDER`].
    pub fn rank(&self) -> usize {
        match self {
            Tier::Basis => 0,
            Tier::Premium => 1,
            Tier::Vip => 2,
        }
    }

    pub fn definition(&self) -> &'static TierDefinition {
        definition(*self)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = PrintpassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basis" => Ok(Tier::Basis),
            "premium" => Ok(Tier::Premium),
            "vip" => Ok(Tier::Vip),
            _ => Err(PrintpassError::UnknownTier(s.to_string())),
        }
    }
}

/// Ad platforms a campaign can be connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Pinterest,
    Meta,
    TikTok,
    Google,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Pinterest,
        Platform::Meta,
        Platform::TikTok,
        Platform::Google,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Pinterest => "pinterest",
            Platform::Meta => "meta",
            Platform::TikTok => "tiktok",
            Platform::Google => "google",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = PrintpassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pinterest" => Ok(Platform::Pinterest),
            "meta" | "facebook" => Ok(Platform::Meta),
            "tiktok" => Ok(Platform::TikTok),
            "google" => Ok(Platform::Google),
            _ => Err(PrintpassError::UnknownPlatform(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportLevel {
    Email,
    Priority,
    Dedicated,
}

/// Catalog encoding of a numeric cap. `-1` means unlimited; the only way
/// to build one is `finite` or `UNLIMITED`, so no other negative exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawLimit(i64);

impl RawLimit {
    pub(crate) const UNLIMITED: RawLimit = RawLimit(-1);

    pub(crate) const fn finite(n: u32) -> Self {
        RawLimit(n as i64)
    }

    pub(crate) fn get(&self) -> i64 {
        self.0
    }
}

#[derive(Debug)]
pub struct TierDefinition {
    pub tier: Tier,
    pub name: &'static str,
    /// Monthly price in whole currency units.
    pub price: u32,
    pub(crate) max_niches: RawLimit,
    pub(crate) max_products: RawLimit,
    pub platforms: &'static [Platform],
    pub(crate) platform_limit: RawLimit,
    pub winner_scaling: bool,
    pub advanced_analytics: bool,
    pub support: SupportLevel,
    /// Marketing copy for the pricing page. Never consulted by the gates.
    pub features: &'static [&'static str],
}

impl TierDefinition {
    pub fn includes_platform(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }
}

static BASIS: TierDefinition = TierDefinition {
    tier: Tier::Basis,
    name: "Basis",
    price: 29,
    max_niches: RawLimit::finite(5),
    max_products: RawLimit::finite(100),
    platforms: &[Platform::Pinterest],
    platform_limit: RawLimit::finite(1),
    winner_scaling: false,
    advanced_analytics: false,
    support: SupportLevel::Email,
    features: &[
        "Up to 5 niches",
        "100 generated products per month",
        "Pinterest campaigns",
        "Shopify sync",
        "Email support",
    ],
};

static PREMIUM: TierDefinition = TierDefinition {
    tier: Tier::Premium,
    name: "Premium",
    price: 59,
    max_niches: RawLimit::finite(15),
    max_products: RawLimit::finite(500),
    platforms: &[Platform::Pinterest, Platform::Meta],
    platform_limit: RawLimit::finite(2),
    winner_scaling: true,
    advanced_analytics: false,
    support: SupportLevel::Priority,
    features: &[
        "Up to 15 niches",
        "500 generated products per month",
        "Pinterest and Meta campaigns",
        "Automatic winner scaling",
        "Priority support",
    ],
};

static VIP: TierDefinition = TierDefinition {
    tier: Tier::Vip,
    name: "VIP",
    price: 99,
    max_niches: RawLimit::UNLIMITED,
    max_products: RawLimit::UNLIMITED,
    platforms: &[
        Platform::Pinterest,
        Platform::Meta,
        Platform::TikTok,
        Platform::Google,
    ],
    platform_limit: RawLimit::UNLIMITED,
    winner_scaling: true,
    advanced_analytics: true,
    support: SupportLevel::Dedicated,
    features: &[
        "Unlimited niches",
        "Unlimited generated products",
        "All ad platforms",
        "Automatic winner scaling",
        "Advanced analytics",
        "Dedicated account manager",
    ],
};

pub fn definition(tier: Tier) -> &'static TierDefinition {
    match tier {
        Tier::Basis => &BASIS,
        Tier::Premium => &PREMIUM,
        Tier::Vip => &VIP,
    }
}

/// All plan definitions, cheapest first.
pub fn all_definitions() -> impl Iterator<Item = &'static TierDefinition> {
    TIER_ORDER.iter().map(|t| definition(*t))
}
