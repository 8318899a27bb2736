//! Galaxies, hybrid pairs, and collection-driven unlocks.
//!
//! Galaxies unlock strictly in chain order: each one opens only after the
//! previous galaxy has five distinct dex entries (variety x mutant form).
//! The number of garden plots follows a milestone table over the total
//! distinct entries.

use crate::collection::{distinct_pairs, CollectedVariety};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the five main elements. Each element owns one main galaxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Element {
    /// Earth (the thick-earth galaxy).
    Earth,
    /// Fire.
    Fire,
    /// Water.
    Water,
    /// Wood.
    Wood,
    /// Metal.
    Metal,
}

impl Element {
    /// All elements in canonical order.
    pub const ALL: [Self; 5] = [Self::Earth, Self::Fire, Self::Water, Self::Wood, Self::Metal];

    /// Short key used in hybrid pair names.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Earth => "earth",
            Self::Fire => "fire",
            Self::Water => "water",
            Self::Wood => "wood",
            Self::Metal => "metal",
        }
    }

    /// The main galaxy owned by this element.
    #[must_use]
    pub const fn galaxy(self) -> GalaxyId {
        match self {
            Self::Earth => GalaxyId::ThickEarth,
            Self::Fire => GalaxyId::Fire,
            Self::Water => GalaxyId::Water,
            Self::Wood => GalaxyId::Wood,
            Self::Metal => GalaxyId::Metal,
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.key() == key)
    }
}

/// An unordered pair of two distinct elements, stored in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HybridPair {
    first: Element,
    second: Element,
}

impl HybridPair {
    /// Normalizes two elements into a pair. Returns `None` for `a == b`.
    #[must_use]
    pub const fn new(a: Element, b: Element) -> Option<Self> {
        let (ia, ib) = (a as u8, b as u8);
        if ia == ib {
            None
        } else if ia < ib {
            Some(Self { first: a, second: b })
        } else {
            Some(Self { first: b, second: a })
        }
    }

    /// Normalizes two galaxies into a pair. Only distinct main galaxies pair.
    #[must_use]
    pub fn from_galaxies(a: GalaxyId, b: GalaxyId) -> Option<Self> {
        Self::new(a.element()?, b.element()?)
    }

    /// All ten canonical pairs.
    #[must_use]
    pub fn all() -> [Self; 10] {
        use Element::{Earth, Fire, Metal, Water, Wood};
        [
            Self { first: Earth, second: Fire },
            Self { first: Earth, second: Water },
            Self { first: Earth, second: Wood },
            Self { first: Earth, second: Metal },
            Self { first: Fire, second: Water },
            Self { first: Fire, second: Wood },
            Self { first: Fire, second: Metal },
            Self { first: Water, second: Wood },
            Self { first: Water, second: Metal },
            Self { first: Wood, second: Metal },
        ]
    }

    /// Lower element of the pair.
    #[must_use]
    pub const fn first(self) -> Element {
        self.first
    }

    /// Higher element of the pair.
    #[must_use]
    pub const fn second(self) -> Element {
        self.second
    }

    /// Checks if the pair contains an element.
    #[must_use]
    pub fn contains(self, element: Element) -> bool {
        self.first == element || self.second == element
    }
}

impl fmt::Display for HybridPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first.key(), self.second.key())
    }
}

impl Serialize for HybridPair {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HybridPair {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.parse::<GalaxyId>() {
            Ok(GalaxyId::Hybrid(pair)) => Ok(pair),
            _ => Err(serde::de::Error::custom(format!("invalid hybrid pair: {raw}"))),
        }
    }
}

/// A galaxy: a themed bucket of varieties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GalaxyId {
    /// Starting galaxy, always unlocked.
    ThickEarth,
    /// Fire galaxy.
    Fire,
    /// Water galaxy.
    Water,
    /// Wood galaxy.
    Wood,
    /// Metal galaxy.
    Metal,
    /// Two-element hybrid galaxy.
    Hybrid(HybridPair),
    /// Home of the prismatic five-element varieties.
    Rainbow,
    /// Home of the set-completion varieties.
    DarkMatter,
}

impl GalaxyId {
    /// The fixed unlock chain of main galaxies.
    pub const CHAIN: [Self; 5] = [
        Self::ThickEarth,
        Self::Fire,
        Self::Water,
        Self::Wood,
        Self::Metal,
    ];

    /// The galaxy used when no other pool is available.
    pub const DEFAULT: Self = Self::ThickEarth;

    /// The element owning this galaxy, for main galaxies only.
    #[must_use]
    pub const fn element(self) -> Option<Element> {
        match self {
            Self::ThickEarth => Some(Element::Earth),
            Self::Fire => Some(Element::Fire),
            Self::Water => Some(Element::Water),
            Self::Wood => Some(Element::Wood),
            Self::Metal => Some(Element::Metal),
            Self::Hybrid(_) | Self::Rainbow | Self::DarkMatter => None,
        }
    }

    /// Checks if this is one of the five main galaxies.
    #[must_use]
    pub const fn is_main(self) -> bool {
        self.element().is_some()
    }
}

impl fmt::Display for GalaxyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThickEarth => f.write_str("thick-earth"),
            Self::Fire => f.write_str("fire"),
            Self::Water => f.write_str("water"),
            Self::Wood => f.write_str("wood"),
            Self::Metal => f.write_str("metal"),
            Self::Hybrid(pair) => write!(f, "{pair}"),
            Self::Rainbow => f.write_str("rainbow"),
            Self::DarkMatter => f.write_str("dark-matter"),
        }
    }
}

impl FromStr for GalaxyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thick-earth" => Ok(Self::ThickEarth),
            "fire" => Ok(Self::Fire),
            "water" => Ok(Self::Water),
            "wood" => Ok(Self::Wood),
            "metal" => Ok(Self::Metal),
            "rainbow" => Ok(Self::Rainbow),
            "dark-matter" => Ok(Self::DarkMatter),
            other => other
                .split_once('-')
                .and_then(|(a, b)| {
                    let pair = HybridPair::new(Element::from_key(a)?, Element::from_key(b)?)?;
                    // Only the canonical spelling is accepted.
                    (pair.first().key() == a).then_some(Self::Hybrid(pair))
                })
                .ok_or_else(|| format!("unknown galaxy: {other}")),
        }
    }
}

impl TryFrom<String> for GalaxyId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GalaxyId> for String {
    fn from(value: GalaxyId) -> Self {
        value.to_string()
    }
}

/// Distinct dex entries a galaxy needs before the next one in the chain opens.
pub const UNLOCK_THRESHOLD: usize = 5;

/// `(required distinct dex entries, total plots)`, ascending.
pub const PLOT_MILESTONES: [(usize, usize); 7] =
    [(0, 4), (3, 5), (8, 6), (15, 7), (25, 8), (40, 9), (60, 10)];

/// Counts distinct (variety, mutant) dex entries belonging to `galaxy`.
#[must_use]
pub fn distinct_in_galaxy(collection: &[CollectedVariety], galaxy: GalaxyId) -> usize {
    distinct_pairs(collection)
        .filter(|(id, _)| crate::catalog::variety(id).is_some_and(|def| def.galaxy == galaxy))
        .count()
}

/// Returns the unlocked main galaxies in chain order.
///
/// `thick-earth` is always unlocked. The chain stops at the first galaxy whose
/// predecessor has fewer than [`UNLOCK_THRESHOLD`] distinct entries.
#[must_use]
pub fn get_unlocked_galaxies(collection: &[CollectedVariety]) -> Vec<GalaxyId> {
    let mut unlocked = vec![GalaxyId::CHAIN[0]];
    for window in GalaxyId::CHAIN.windows(2) {
        if distinct_in_galaxy(collection, window[0]) < UNLOCK_THRESHOLD {
            break;
        }
        unlocked.push(window[1]);
    }
    unlocked
}

/// Returns the number of plots the player's collection entitles them to.
#[must_use]
pub fn get_plot_count(collection: &[CollectedVariety]) -> usize {
    let distinct = distinct_pairs(collection).count();
    PLOT_MILESTONES
        .iter()
        .take_while(|(required, _)| *required <= distinct)
        .last()
        .map_or(PLOT_MILESTONES[0].1, |(_, plots)| *plots)
}
