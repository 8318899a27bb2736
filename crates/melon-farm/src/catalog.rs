//! Static variety catalog.
//!
//! 79 varieties: 41 pure (9 thick-earth, 8 in each other main galaxy), 30
//! hybrids (3 per canonical pair), 5 prismatic, and 3 dark-matter.

use crate::galaxy::{Element, GalaxyId, HybridPair};
use ahash::AHashMap;
use melon_common::VarietyId;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Rarity tier of a variety or gene fragment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Rarity {
    /// Most frequent drops.
    #[default]
    Common,
    /// Uncommon drops.
    Rare,
    /// Scarce drops.
    Epic,
    /// Rarest drops.
    Legendary,
}

impl Rarity {
    /// Star count shown in the dex, also used to rank fragments.
    #[must_use]
    pub const fn stars(self) -> u8 {
        match self {
            Self::Common => 1,
            Self::Rare => 2,
            Self::Epic => 3,
            Self::Legendary => 4,
        }
    }

    /// Bonus this rarity contributes to five-element fusion odds.
    #[must_use]
    pub const fn fusion_bonus(self) -> f64 {
        match self {
            Self::Common => 0.0,
            Self::Rare => 0.10,
            Self::Epic => 0.20,
            Self::Legendary => 0.30,
        }
    }
}

/// How a variety is bred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreedType {
    /// Single-galaxy variety, rolled from seeds.
    Pure,
    /// Two-galaxy variety, produced by pairwise fusion.
    Hybrid,
    /// Five-element fusion product.
    Prismatic,
    /// Set-completion product.
    DarkMatter,
}

/// Static definition of a variety.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarietyDef {
    /// Catalog id.
    pub id: &'static str,
    /// Owning galaxy.
    pub galaxy: GalaxyId,
    /// Source pair, for hybrids only.
    pub hybrid_pair: Option<HybridPair>,
    /// Rarity tier.
    pub rarity: Rarity,
    /// Base selection weight.
    pub drop_rate: f64,
    /// Growth minutes from planting to mature.
    pub mature_minutes: u32,
    /// Coins paid per unit when sold.
    pub sell_price: u32,
    /// Breeding category.
    pub breed_type: BreedType,
}

impl VarietyDef {
    /// Returns the typed id.
    #[must_use]
    pub const fn variety_id(&self) -> VarietyId {
        VarietyId::from_static(self.id)
    }
}

const fn pure(
    id: &'static str,
    galaxy: GalaxyId,
    rarity: Rarity,
    mature_minutes: u32,
    sell_price: u32,
) -> VarietyDef {
    let drop_rate = match rarity {
        Rarity::Common => 30.0,
        Rarity::Rare => 12.0,
        Rarity::Epic => 5.0,
        Rarity::Legendary => 1.0,
    };
    VarietyDef {
        id,
        galaxy,
        hybrid_pair: None,
        rarity,
        drop_rate,
        mature_minutes,
        sell_price,
        breed_type: BreedType::Pure,
    }
}

const fn hybrid(id: &'static str, a: Element, b: Element, rarity: Rarity) -> VarietyDef {
    let pair = match HybridPair::new(a, b) {
        Some(pair) => pair,
        None => panic!("hybrid needs two distinct elements"),
    };
    let (drop_rate, mature_minutes, sell_price) = match rarity {
        Rarity::Common | Rarity::Rare => (60.0, 2880, 80),
        Rarity::Epic => (30.0, 4320, 200),
        Rarity::Legendary => (10.0, 5760, 500),
    };
    VarietyDef {
        id,
        galaxy: GalaxyId::Hybrid(pair),
        hybrid_pair: Some(pair),
        rarity,
        drop_rate,
        mature_minutes,
        sell_price,
        breed_type: BreedType::Hybrid,
    }
}

const fn prismatic(id: &'static str, drop_rate: f64) -> VarietyDef {
    VarietyDef {
        id,
        galaxy: GalaxyId::Rainbow,
        hybrid_pair: None,
        rarity: Rarity::Legendary,
        drop_rate,
        mature_minutes: 7200,
        sell_price: 1000,
        breed_type: BreedType::Prismatic,
    }
}

const fn dark_matter(id: &'static str, sell_price: u32) -> VarietyDef {
    VarietyDef {
        id,
        galaxy: GalaxyId::DarkMatter,
        hybrid_pair: None,
        rarity: Rarity::Legendary,
        drop_rate: 0.0,
        mature_minutes: 10_080,
        sell_price,
        breed_type: BreedType::DarkMatter,
    }
}

use Element::{Earth, Fire, Metal, Water, Wood};
use GalaxyId as G;
use Rarity::{Common, Epic, Legendary, Rare};

/// Every variety, grouped by galaxy in unlock-chain order.
pub static VARIETIES: [VarietyDef; 79] = [
    // Thick earth
    pure("jelly-melon", G::ThickEarth, Common, 1440, 10),
    pure("sandstone-melon", G::ThickEarth, Common, 1440, 12),
    pure("clay-melon", G::ThickEarth, Common, 1440, 12),
    pure("moss-melon", G::ThickEarth, Rare, 2160, 40),
    pure("amber-melon", G::ThickEarth, Rare, 2160, 45),
    pure("crystal-melon", G::ThickEarth, Rare, 2160, 45),
    pure("fossil-melon", G::ThickEarth, Epic, 2880, 100),
    pure("geode-melon", G::ThickEarth, Epic, 2880, 110),
    pure("terra-heart-melon", G::ThickEarth, Legendary, 4320, 300),
    // Fire
    pure("ember-melon", G::Fire, Common, 1440, 15),
    pure("ash-melon", G::Fire, Common, 1440, 15),
    pure("chili-melon", G::Fire, Common, 1440, 18),
    pure("lava-melon", G::Fire, Rare, 2160, 50),
    pure("blaze-melon", G::Fire, Rare, 2160, 50),
    pure("magma-melon", G::Fire, Epic, 2880, 120),
    pure("solar-flare-melon", G::Fire, Epic, 2880, 130),
    pure("phoenix-melon", G::Fire, Legendary, 4320, 350),
    // Water
    pure("dew-melon", G::Water, Common, 1440, 18),
    pure("ripple-melon", G::Water, Common, 1440, 18),
    pure("tide-melon", G::Water, Common, 1440, 20),
    pure("coral-melon", G::Water, Rare, 2160, 55),
    pure("pearl-melon", G::Water, Rare, 2160, 60),
    pure("glacier-melon", G::Water, Epic, 2880, 140),
    pure("abyss-melon", G::Water, Epic, 2880, 150),
    pure("leviathan-melon", G::Water, Legendary, 4320, 400),
    // Wood
    pure("sprout-melon", G::Wood, Common, 1440, 20),
    pure("bamboo-melon", G::Wood, Common, 1440, 22),
    pure("vine-melon", G::Wood, Common, 1440, 22),
    pure("maple-melon", G::Wood, Rare, 2160, 65),
    pure("willow-melon", G::Wood, Rare, 2160, 65),
    pure("elderwood-melon", G::Wood, Epic, 2880, 160),
    pure("moonbloom-melon", G::Wood, Epic, 2880, 170),
    pure("world-tree-melon", G::Wood, Legendary, 4320, 450),
    // Metal
    pure("copper-melon", G::Metal, Common, 1440, 25),
    pure("tin-melon", G::Metal, Common, 1440, 25),
    pure("iron-melon", G::Metal, Common, 1440, 28),
    pure("silver-melon", G::Metal, Rare, 2160, 75),
    pure("bronze-melon", G::Metal, Rare, 2160, 75),
    pure("gold-melon", G::Metal, Epic, 2880, 180),
    pure("titanium-melon", G::Metal, Epic, 2880, 190),
    pure("stardust-alloy-melon", G::Metal, Legendary, 4320, 500),
    // Hybrids
    hybrid("volcano-melon", Earth, Fire, Rare),
    hybrid("obsidian-melon", Earth, Fire, Epic),
    hybrid("core-melon", Earth, Fire, Legendary),
    hybrid("mud-melon", Earth, Water, Rare),
    hybrid("delta-melon", Earth, Water, Epic),
    hybrid("oasis-melon", Earth, Water, Legendary),
    hybrid("root-melon", Earth, Wood, Rare),
    hybrid("truffle-melon", Earth, Wood, Epic),
    hybrid("grove-melon", Earth, Wood, Legendary),
    hybrid("ore-melon", Earth, Metal, Rare),
    hybrid("jade-melon", Earth, Metal, Epic),
    hybrid("meteorite-melon", Earth, Metal, Legendary),
    hybrid("steam-melon", Fire, Water, Rare),
    hybrid("geyser-melon", Fire, Water, Epic),
    hybrid("hot-spring-melon", Fire, Water, Legendary),
    hybrid("charcoal-melon", Fire, Wood, Rare),
    hybrid("cinnamon-melon", Fire, Wood, Epic),
    hybrid("wildfire-melon", Fire, Wood, Legendary),
    hybrid("forge-melon", Fire, Metal, Rare),
    hybrid("blade-melon", Fire, Metal, Epic),
    hybrid("crucible-melon", Fire, Metal, Legendary),
    hybrid("lotus-melon", Water, Wood, Rare),
    hybrid("mangrove-melon", Water, Wood, Epic),
    hybrid("rainforest-melon", Water, Wood, Legendary),
    hybrid("mercury-melon", Water, Metal, Rare),
    hybrid("rust-melon", Water, Metal, Epic),
    hybrid("chrome-tide-melon", Water, Metal, Legendary),
    hybrid("bonsai-melon", Wood, Metal, Rare),
    hybrid("clockwork-melon", Wood, Metal, Epic),
    hybrid("ironbark-melon", Wood, Metal, Legendary),
    // Prismatic
    prismatic("rainbow-melon", 30.0),
    prismatic("aurora-melon", 25.0),
    prismatic("prism-melon", 20.0),
    prismatic("nebula-melon", 15.0),
    prismatic("galaxy-melon", 10.0),
    // Dark matter
    dark_matter("void-melon", 3000),
    dark_matter("blackhole-melon", 3000),
    dark_matter("cosmic-heart", 9999),
];

fn index() -> &'static AHashMap<&'static str, usize> {
    static INDEX: OnceLock<AHashMap<&'static str, usize>> = OnceLock::new();
    INDEX.get_or_init(|| {
        VARIETIES
            .iter()
            .enumerate()
            .map(|(i, def)| (def.id, i))
            .collect()
    })
}

/// Looks up a variety definition by id.
#[must_use]
pub fn variety(id: &str) -> Option<&'static VarietyDef> {
    index().get(id).map(|&i| &VARIETIES[i])
}

/// Iterates the varieties owned by a galaxy, in catalog order.
pub fn varieties_in(galaxy: GalaxyId) -> impl Iterator<Item = &'static VarietyDef> {
    VARIETIES.iter().filter(move |def| def.galaxy == galaxy)
}

/// Iterates the varieties of one breed type, in catalog order.
pub fn varieties_of(breed: BreedType) -> impl Iterator<Item = &'static VarietyDef> {
    VARIETIES.iter().filter(move |def| def.breed_type == breed)
}

/// The three hybrids bred from a pair.
pub fn hybrids_of(pair: HybridPair) -> impl Iterator<Item = &'static VarietyDef> {
    VARIETIES
        .iter()
        .filter(move |def| def.hybrid_pair == Some(pair))
}

/// Growth minutes a variety needs, if it exists.
#[must_use]
pub fn mature_minutes(id: &VarietyId) -> Option<u32> {
    variety(id.as_str()).map(|def| def.mature_minutes)
}
