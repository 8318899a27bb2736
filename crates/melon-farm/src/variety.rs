//! Weighted variety selection at planting time.

use crate::catalog::{self, VarietyDef};
use crate::galaxy::GalaxyId;
use crate::plot::SeedQuality;
use melon_common::{RandomSource, VarietyId};

/// Chance an injected seed draws from its target galaxy alone.
pub const INJECTION_TARGET_CHANCE: f64 = 0.80;

/// Picks one entry from `(item, weight)` candidates.
///
/// Draws `r` uniformly in `[0, total)` and subtracts weights in order until
/// `r <= 0`. The last candidate absorbs float rounding. Returns `None` only
/// for an empty candidate list.
pub fn weighted_pick<T: Clone>(candidates: &[(T, f64)], rng: &mut dyn RandomSource) -> Option<T> {
    let (last, _) = candidates.last()?;
    let total: f64 = candidates.iter().map(|(_, w)| w.max(0.0)).sum();
    let mut r = rng.next_f64() * total;
    for (item, weight) in candidates {
        r -= weight.max(0.0);
        if r <= 0.0 {
            return Some(item.clone());
        }
    }
    Some(last.clone())
}

fn pool(galaxies: &[GalaxyId]) -> Vec<&'static VarietyDef> {
    let defs: Vec<_> = galaxies
        .iter()
        .flat_map(|galaxy| catalog::varieties_in(*galaxy))
        .collect();
    if defs.is_empty() {
        catalog::varieties_in(GalaxyId::DEFAULT).collect()
    } else {
        defs
    }
}

fn roll_from(galaxies: &[GalaxyId], quality: SeedQuality, rng: &mut dyn RandomSource) -> VarietyId {
    let candidates: Vec<(VarietyId, f64)> = pool(galaxies)
        .into_iter()
        .map(|def| {
            (
                def.variety_id(),
                def.drop_rate * quality.weight_multiplier(def.rarity),
            )
        })
        .collect();
    // The default galaxy is never empty, so the pick cannot miss.
    weighted_pick(&candidates, rng).unwrap_or_else(|| catalog::VARIETIES[0].variety_id())
}

/// Rolls a variety from every unlocked galaxy.
///
/// Better seeds multiply the weight of rare-and-above varieties only; common
/// odds are untouched. An empty pool falls back to the default galaxy.
pub fn roll_variety(
    unlocked: &[GalaxyId],
    quality: SeedQuality,
    rng: &mut dyn RandomSource,
) -> VarietyId {
    roll_from(unlocked, quality, rng)
}

/// Rolls a variety for an injected seed.
///
/// 80% of the time the pool is `target` alone; otherwise it is the other
/// unlocked galaxies, or `target` again when nothing else is unlocked.
pub fn roll_injected_variety(
    target: GalaxyId,
    unlocked: &[GalaxyId],
    quality: SeedQuality,
    rng: &mut dyn RandomSource,
) -> VarietyId {
    if rng.chance(INJECTION_TARGET_CHANCE) {
        return roll_from(&[target], quality, rng);
    }
    let others: Vec<GalaxyId> = unlocked.iter().copied().filter(|g| *g != target).collect();
    if others.is_empty() {
        roll_from(&[target], quality, rng)
    } else {
        roll_from(&others, quality, rng)
    }
}
