//! The dex: a permanent record of every variety ever harvested.
//!
//! Mutant and normal forms are separate entries. Entries are never removed;
//! selling only lowers `count`, and `count == 0` keeps the discovery.

use crate::catalog::{self, BreedType, VARIETIES};
use ahash::AHashSet;
use melon_common::{DayKey, VarietyId};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Price multiplier applied to mutant melons.
pub const MUTANT_PRICE_MULTIPLIER: u32 = 2;

/// One dex entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedVariety {
    /// Variety of this entry.
    pub variety_id: VarietyId,
    /// Mutant form flag.
    pub is_mutant: bool,
    /// Day of the first harvest.
    pub first_obtained_date: DayKey,
    /// Units currently held.
    pub count: u32,
}

impl CollectedVariety {
    /// Creates an entry holding one unit.
    #[must_use]
    pub fn new(variety_id: VarietyId, is_mutant: bool, first_obtained_date: DayKey) -> Self {
        Self {
            variety_id,
            is_mutant,
            first_obtained_date,
            count: 1,
        }
    }

    fn matches(&self, variety_id: &VarietyId, is_mutant: bool) -> bool {
        self.variety_id == *variety_id && self.is_mutant == is_mutant
    }
}

/// Iterates distinct (variety id, mutant) pairs in the collection.
pub fn distinct_pairs(collection: &[CollectedVariety]) -> impl Iterator<Item = (&str, bool)> + '_ {
    let mut seen = AHashSet::new();
    collection
        .iter()
        .map(|entry| (entry.variety_id.as_str(), entry.is_mutant))
        .filter(move |pair| seen.insert(*pair))
}

/// Checks if a variety was ever obtained, in either form.
#[must_use]
pub fn has_variety(collection: &[CollectedVariety], variety_id: &VarietyId) -> bool {
    collection.iter().any(|entry| entry.variety_id == *variety_id)
}

/// Adds one harvested unit, creating the entry on first discovery.
#[must_use]
pub fn record_harvest(
    collection: &[CollectedVariety],
    variety_id: &VarietyId,
    is_mutant: bool,
    today: &DayKey,
) -> Vec<CollectedVariety> {
    let mut next = collection.to_vec();
    match next.iter_mut().find(|e| e.matches(variety_id, is_mutant)) {
        Some(entry) => entry.count = entry.count.saturating_add(1),
        None => next.push(CollectedVariety::new(
            variety_id.clone(),
            is_mutant,
            today.clone(),
        )),
    }
    next
}

/// Result of selling dex stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleOutcome {
    /// Updated collection.
    pub collection: Vec<CollectedVariety>,
    /// Units sold.
    pub sold: u32,
    /// Coins earned.
    pub coins: u32,
}

/// Sells up to `quantity` units of one entry.
///
/// Returns `None` if the entry does not exist, holds nothing, or the variety
/// is unknown to the catalog.
#[must_use]
pub fn sell_variety(
    collection: &[CollectedVariety],
    variety_id: &VarietyId,
    is_mutant: bool,
    quantity: u32,
) -> Option<SaleOutcome> {
    let def = catalog::variety(variety_id.as_str())?;
    let mut next = collection.to_vec();
    let entry = next.iter_mut().find(|e| e.matches(variety_id, is_mutant))?;
    let sold = quantity.min(entry.count);
    if sold == 0 {
        return None;
    }
    entry.count -= sold;

    let unit_price = if is_mutant {
        def.sell_price.saturating_mul(MUTANT_PRICE_MULTIPLIER)
    } else {
        def.sell_price
    };
    Some(SaleOutcome {
        collection: next,
        sold,
        coins: unit_price.saturating_mul(sold),
    })
}

/// Counts distinct hybrid varieties ever harvested.
#[must_use]
pub fn harvested_hybrid_count(collection: &[CollectedVariety]) -> usize {
    collection
        .iter()
        .filter(|entry| {
            catalog::variety(entry.variety_id.as_str())
                .is_some_and(|def| def.breed_type == BreedType::Hybrid)
        })
        .map(|entry| entry.variety_id.as_str())
        .collect::<AHashSet<_>>()
        .len()
}

/// The reward for completing the dex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CosmicHeartGrant {
    /// Collection with the cosmic-heart entry added.
    pub collection: Vec<CollectedVariety>,
    /// Seed to add to the shed.
    pub seed_variety_id: VarietyId,
}

/// Grants `cosmic-heart` once every other catalog variety is discovered.
///
/// Idempotent: returns `None` once the entry exists.
#[must_use]
pub fn check_cosmic_heart(
    collection: &[CollectedVariety],
    today: &DayKey,
) -> Option<CosmicHeartGrant> {
    let heart = VarietyId::COSMIC_HEART;
    if has_variety(collection, &heart) {
        return None;
    }
    let discovered: AHashSet<&str> = collection.iter().map(|e| e.variety_id.as_str()).collect();
    let complete = VARIETIES
        .iter()
        .filter(|def| def.id != heart.as_str())
        .all(|def| discovered.contains(def.id));
    if !complete {
        return None;
    }

    info!("Dex complete, granting cosmic heart");
    let mut next = collection.to_vec();
    next.push(CollectedVariety::new(heart.clone(), false, today.clone()));
    Some(CosmicHeartGrant {
        collection: next,
        seed_variety_id: heart,
    })
}
