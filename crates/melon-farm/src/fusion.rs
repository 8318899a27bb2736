//! Gene fusion: turning harvested fragments into new seeds.
//!
//! Every function here is pure. It inspects the fragment inventory and
//! returns an outcome, or `None` when the fusion cannot be performed. The
//! caller removes the consumed fragments (see [`consume_fragments`]) and
//! adds back any returned one.

use crate::catalog::{self, BreedType, Rarity};
use crate::galaxy::{Element, GalaxyId, HybridPair};
use crate::variety::weighted_pick;
use ahash::{AHashMap, AHashSet};
use melon_common::{FragmentId, RandomSource, VarietyId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Base success rate of a five-element fusion.
pub const FIVE_ELEMENT_BASE_RATE: f64 = 0.5;

/// Distinct hybrids that must have been harvested before five-element fusion.
pub const FIVE_ELEMENT_HYBRID_GATE: usize = 3;

/// Same-variety streak that triggers pity.
pub const PITY_STREAK: u32 = 3;

/// A consumable token dropped on harvest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneFragment {
    /// Fragment id.
    pub id: FragmentId,
    /// Galaxy of the source variety.
    pub galaxy_id: GalaxyId,
    /// Source variety.
    pub variety_id: VarietyId,
    /// Rarity of the source variety.
    pub rarity: Rarity,
    /// Harvest time (ms epoch).
    pub obtained_at: i64,
}

impl GeneFragment {
    fn rank(&self) -> (u8, i64) {
        (self.rarity.stars(), self.obtained_at)
    }
}

/// Removes the given fragment ids from an inventory.
#[must_use]
pub fn consume_fragments(inventory: &[GeneFragment], consumed: &[FragmentId]) -> Vec<GeneFragment> {
    let consumed: AHashSet<&FragmentId> = consumed.iter().collect();
    inventory
        .iter()
        .filter(|f| !consumed.contains(&f.id))
        .cloned()
        .collect()
}

/// Picks the best fragment per key: most stars, then most recent.
fn best_by<K, F>(fragments: &[GeneFragment], key: F) -> AHashMap<K, &GeneFragment>
where
    K: std::hash::Hash + Eq,
    F: Fn(&GeneFragment) -> Option<K>,
{
    let mut best: AHashMap<K, &GeneFragment> = AHashMap::new();
    for fragment in fragments {
        let Some(k) = key(fragment) else { continue };
        best.entry(k)
            .and_modify(|current| {
                if fragment.rank() > current.rank() {
                    *current = fragment;
                }
            })
            .or_insert(fragment);
    }
    best
}

fn sanitize_bonus(bonus: f64) -> f64 {
    if bonus.is_finite() {
        bonus.max(0.0)
    } else {
        0.0
    }
}

/// Success rate of a pairwise fusion, always within `[0, 1]`.
#[must_use]
pub fn fusion_success_rate(a: Rarity, b: Rarity, modifier_bonus: f64) -> f64 {
    let has = |r| a == r || b == r;
    let base = if has(Rarity::Legendary) {
        0.90
    } else if has(Rarity::Epic) {
        0.70
    } else if a == Rarity::Rare && b == Rarity::Rare {
        0.55
    } else if has(Rarity::Rare) {
        0.50
    } else {
        0.30
    };
    (base + sanitize_bonus(modifier_bonus)).clamp(0.0, 1.0)
}

/// Result of a pairwise fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct PairFusionOutcome {
    /// Whether the fusion succeeded.
    pub success: bool,
    /// Rate the draw was made against.
    pub success_rate: f64,
    /// Hybrid pair the fragments formed.
    pub galaxy_pair: HybridPair,
    /// Fragments consumed (both of them).
    pub consumed: Vec<FragmentId>,
    /// On failure, one of the two fragments goes back to the inventory.
    pub returned_gene: Option<GeneFragment>,
}

/// Attempts to fuse two fragments from different main galaxies.
///
/// Returns `None` when the galaxies match or do not form a hybrid pair.
/// Draws once for success, then once more on failure to pick the returned
/// fragment.
#[must_use]
pub fn attempt_fusion(
    first: &GeneFragment,
    second: &GeneFragment,
    modifier_bonus: f64,
    rng: &mut dyn RandomSource,
) -> Option<PairFusionOutcome> {
    if first.galaxy_id == second.galaxy_id {
        return None;
    }
    let galaxy_pair = HybridPair::from_galaxies(first.galaxy_id, second.galaxy_id)?;
    let success_rate = fusion_success_rate(first.rarity, second.rarity, modifier_bonus);
    let success = rng.chance(success_rate);

    let returned_gene = if success {
        None
    } else {
        let pair = [first, second];
        Some(pair[rng.index(pair.len())].clone())
    };
    debug!(
        "Pair fusion {} at {:.2}: {}",
        galaxy_pair,
        success_rate,
        if success { "success" } else { "failed" }
    );
    Some(PairFusionOutcome {
        success,
        success_rate,
        galaxy_pair,
        consumed: vec![first.id.clone(), second.id.clone()],
        returned_gene,
    })
}

/// Rolls one of a pair's three hybrids, weighted by drop rate.
#[must_use]
pub fn roll_hybrid_variety(pair: HybridPair, rng: &mut dyn RandomSource) -> Option<VarietyId> {
    let candidates: Vec<(VarietyId, f64)> = catalog::hybrids_of(pair)
        .map(|def| (def.variety_id(), def.drop_rate))
        .collect();
    weighted_pick(&candidates, rng)
}

/// Pity state carried between five-element fusions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FusionHistory {
    /// Variety of the last successful fusion.
    pub last_variety_id: Option<VarietyId>,
    /// Consecutive attempts without a new variety.
    pub same_variety_streak: u32,
    /// Prismatic varieties produced so far.
    pub obtained_prismatic_variety_ids: Vec<VarietyId>,
}

impl FusionHistory {
    /// Checks if the next roll is restricted to unobtained varieties.
    #[must_use]
    pub fn pity_active(&self) -> bool {
        self.same_variety_streak >= PITY_STREAK
    }

    fn after_success(&self, variety_id: &VarietyId) -> Self {
        let same_variety_streak = if self.last_variety_id.as_ref() == Some(variety_id) {
            self.same_variety_streak.saturating_add(1)
        } else {
            1
        };
        let mut obtained = self.obtained_prismatic_variety_ids.clone();
        if !obtained.contains(variety_id) {
            obtained.push(variety_id.clone());
        }
        Self {
            last_variety_id: Some(variety_id.clone()),
            same_variety_streak,
            obtained_prismatic_variety_ids: obtained,
        }
    }

    fn after_failure(&self) -> Self {
        Self {
            same_variety_streak: self.same_variety_streak.saturating_add(1),
            ..self.clone()
        }
    }
}

/// Best fragment per main element, or `None` if any element is missing.
#[must_use]
pub fn select_five_element_fragments(fragments: &[GeneFragment]) -> Option<Vec<GeneFragment>> {
    let best = best_by(fragments, |f| f.galaxy_id.element());
    Element::ALL
        .iter()
        .map(|element| best.get(element).map(|f| (*f).clone()))
        .collect()
}

/// Success rate of a five-element fusion over the chosen fragments.
#[must_use]
pub fn five_element_success_rate(selected: &[GeneFragment]) -> f64 {
    if selected.is_empty() {
        return FIVE_ELEMENT_BASE_RATE;
    }
    let total: f64 = selected.iter().map(|f| f.rarity.fusion_bonus()).sum();
    (FIVE_ELEMENT_BASE_RATE + total / selected.len() as f64).clamp(0.0, 1.0)
}

fn roll_prismatic(history: &FusionHistory, rng: &mut dyn RandomSource) -> (VarietyId, bool) {
    let all: Vec<(VarietyId, f64)> = catalog::varieties_of(BreedType::Prismatic)
        .map(|def| (def.variety_id(), def.drop_rate))
        .collect();
    let unobtained: Vec<(VarietyId, f64)> = all
        .iter()
        .filter(|(id, _)| !history.obtained_prismatic_variety_ids.contains(id))
        .cloned()
        .collect();

    let pity = history.pity_active() && !unobtained.is_empty();
    let pool = if pity { &unobtained } else { &all };
    // The prismatic catalog is never empty.
    let picked = weighted_pick(pool, rng).unwrap_or_else(|| VarietyId::new("rainbow-melon"));
    (picked, pity)
}

/// Result of a five-element fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct FiveElementOutcome {
    /// Whether the fusion succeeded.
    pub success: bool,
    /// Rate the draw was made against.
    pub success_rate: f64,
    /// Prismatic seed produced on success.
    pub seed_variety_id: Option<VarietyId>,
    /// Whether pity restricted the pool.
    pub pity_applied: bool,
    /// The five fragments consumed.
    pub consumed: Vec<FragmentId>,
    /// On failure, one of the five goes back to the inventory.
    pub returned_gene: Option<GeneFragment>,
    /// Updated pity state.
    pub history: FusionHistory,
}

/// Attempts a five-element fusion.
///
/// Requires a fragment from each main galaxy and at least three distinct
/// hybrids harvested. Draws once for success, then once for the variety
/// (success) or the returned fragment (failure).
#[must_use]
pub fn attempt_five_element_fusion(
    fragments: &[GeneFragment],
    harvested_hybrids: usize,
    history: &FusionHistory,
    rng: &mut dyn RandomSource,
) -> Option<FiveElementOutcome> {
    if harvested_hybrids < FIVE_ELEMENT_HYBRID_GATE {
        return None;
    }
    let selected = select_five_element_fragments(fragments)?;
    let success_rate = five_element_success_rate(&selected);
    let consumed = selected.iter().map(|f| f.id.clone()).collect();

    if rng.chance(success_rate) {
        let (variety_id, pity_applied) = roll_prismatic(history, rng);
        info!(
            "Five-element fusion produced {}{}",
            variety_id,
            if pity_applied { " (pity)" } else { "" }
        );
        Some(FiveElementOutcome {
            success: true,
            success_rate,
            history: history.after_success(&variety_id),
            seed_variety_id: Some(variety_id),
            pity_applied,
            consumed,
            returned_gene: None,
        })
    } else {
        debug!("Five-element fusion failed at {:.2}", success_rate);
        let returned = selected[rng.index(selected.len())].clone();
        Some(FiveElementOutcome {
            success: false,
            success_rate,
            seed_variety_id: None,
            pity_applied: false,
            consumed,
            returned_gene: Some(returned),
            history: history.after_failure(),
        })
    }
}

/// Result of a set-completion fusion. These never fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetFusionOutcome {
    /// The dark-matter seed produced.
    pub seed_variety_id: VarietyId,
    /// Fragments consumed, one per set member.
    pub consumed: Vec<FragmentId>,
}

fn complete_set<K>(
    fragments: &[GeneFragment],
    members: &[K],
    key: impl Fn(&GeneFragment) -> Option<K>,
    output: VarietyId,
) -> Option<SetFusionOutcome>
where
    K: std::hash::Hash + Eq,
{
    let best = best_by(fragments, key);
    let consumed = members
        .iter()
        .map(|member| best.get(member).map(|f| f.id.clone()))
        .collect::<Option<Vec<_>>>()?;
    info!("Set fusion produced {}", output);
    Some(SetFusionOutcome {
        seed_variety_id: output,
        consumed,
    })
}

/// Fuses one fragment of every prismatic variety into `void-melon`.
#[must_use]
pub fn attempt_void_fusion(fragments: &[GeneFragment]) -> Option<SetFusionOutcome> {
    let members: Vec<&'static str> = catalog::varieties_of(BreedType::Prismatic)
        .map(|def| def.id)
        .collect();
    complete_set(
        fragments,
        &members,
        |f| {
            catalog::variety(f.variety_id.as_str())
                .filter(|def| def.breed_type == BreedType::Prismatic)
                .map(|def| def.id)
        },
        VarietyId::VOID_MELON,
    )
}

/// Fuses one fragment of every hybrid pair into `blackhole-melon`.
#[must_use]
pub fn attempt_black_hole_fusion(fragments: &[GeneFragment]) -> Option<SetFusionOutcome> {
    complete_set(
        fragments,
        &HybridPair::all(),
        |f| catalog::variety(f.variety_id.as_str()).and_then(|def| def.hybrid_pair),
        VarietyId::BLACKHOLE_MELON,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use melon_common::{FixedRng, ScriptedRng};
    use proptest::prelude::*;

    fn fragment(id: &str, variety: &'static str, obtained_at: i64) -> GeneFragment {
        let def = catalog::variety(variety).expect("known variety");
        GeneFragment {
            id: FragmentId::new(id),
            galaxy_id: def.galaxy,
            variety_id: def.variety_id(),
            rarity: def.rarity,
            obtained_at,
        }
    }

    fn five_elements() -> Vec<GeneFragment> {
        vec![
            fragment("e", "jelly-melon", 1),
            fragment("f", "ember-melon", 2),
            fragment("w", "dew-melon", 3),
            fragment("o", "sprout-melon", 4),
            fragment("m", "copper-melon", 5),
        ]
    }

    fn rarity_strategy() -> impl Strategy<Value = Rarity> {
        prop_oneof![
            Just(Rarity::Common),
            Just(Rarity::Rare),
            Just(Rarity::Epic),
            Just(Rarity::Legendary),
        ]
    }

    #[test]
    fn test_success_rate_table() {
        use Rarity::{Common, Epic, Legendary, Rare};
        let cases = [
            (Legendary, Common, 0.90),
            (Epic, Rare, 0.70),
            (Rare, Rare, 0.55),
            (Rare, Common, 0.50),
            (Common, Common, 0.30),
        ];
        for (a, b, expected) in cases {
            assert!((fusion_success_rate(a, b, 0.0) - expected).abs() < 1e-9);
            assert!((fusion_success_rate(b, a, 0.0) - expected).abs() < 1e-9);
        }
        assert!((fusion_success_rate(Legendary, Legendary, 0.15) - 1.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn test_success_rate_bounded(
            a in rarity_strategy(),
            b in rarity_strategy(),
            bonus in prop::num::f64::ANY,
        ) {
            let rate = fusion_success_rate(a, b, bonus);
            prop_assert!((0.0..=1.0).contains(&rate));
        }
    }

    #[test]
    fn test_same_galaxy_cannot_fuse() {
        let a = fragment("a", "jelly-melon", 1);
        let b = fragment("b", "clay-melon", 2);
        assert!(attempt_fusion(&a, &b, 0.0, &mut FixedRng::new(0.0)).is_none());
    }

    #[test]
    fn test_non_main_galaxy_cannot_fuse() {
        let a = fragment("a", "jelly-melon", 1);
        let b = fragment("b", "steam-melon", 2);
        assert!(attempt_fusion(&a, &b, 0.0, &mut FixedRng::new(0.0)).is_none());
    }

    #[test]
    fn test_pair_fusion_success_and_failure() {
        let fire = fragment("a", "ember-melon", 1);
        let water = fragment("b", "dew-melon", 2);

        let ok = attempt_fusion(&fire, &water, 0.0, &mut FixedRng::new(0.1)).expect("fusable");
        assert!(ok.success);
        assert_eq!(ok.galaxy_pair.to_string(), "fire-water");
        assert!(ok.returned_gene.is_none());
        assert_eq!(ok.consumed.len(), 2);

        let mut rng = ScriptedRng::new(vec![0.95, 0.7]);
        let failed = attempt_fusion(&fire, &water, 0.0, &mut rng).expect("fusable");
        assert!(!failed.success);
        assert_eq!(failed.returned_gene, Some(water));
    }

    #[test]
    fn test_hybrid_roll_stays_in_pair() {
        let pair = HybridPair::new(Element::Fire, Element::Water).expect("pair");
        let id = roll_hybrid_variety(pair, &mut FixedRng::new(0.0)).expect("hybrid");
        assert_eq!(id.as_str(), "steam-melon");
        let id = roll_hybrid_variety(pair, &mut FixedRng::new(0.99)).expect("hybrid");
        assert_eq!(catalog::variety(id.as_str()).and_then(|d| d.hybrid_pair), Some(pair));
    }

    #[test]
    fn test_five_element_picks_best_per_galaxy() {
        let mut fragments = five_elements();
        fragments.push(fragment("e2", "moss-melon", 0));
        fragments.push(fragment("e3", "jelly-melon", 9));
        let selected = select_five_element_fragments(&fragments).expect("complete");
        assert_eq!(selected[0].id, FragmentId::new("e2"));
        assert_eq!(selected.len(), 5);

        let mut missing = five_elements();
        missing.pop();
        assert!(select_five_element_fragments(&missing).is_none());
    }

    #[test]
    fn test_five_element_tie_breaks_on_recency() {
        for newer_first in [true, false] {
            let mut fragments = five_elements();
            fragments.remove(0);
            let newer = fragment("earth-new", "jelly-melon", 50);
            let older = fragment("earth-old", "jelly-melon", 10);
            if newer_first {
                fragments.extend([newer, older]);
            } else {
                fragments.extend([older, newer]);
            }
            let selected = select_five_element_fragments(&fragments).expect("complete");
            assert_eq!(selected[0].id, FragmentId::new("earth-new"));
        }
    }

    #[test]
    fn test_five_element_rate_averages_bonus() {
        assert!((five_element_success_rate(&five_elements()) - 0.5).abs() < 1e-9);
        let mut fragments = five_elements();
        fragments[0] = fragment("e", "terra-heart-melon", 1);
        assert!((five_element_success_rate(&fragments) - 0.56).abs() < 1e-9);
    }

    #[test]
    fn test_five_element_requires_hybrid_gate() {
        let history = FusionHistory::default();
        let out = attempt_five_element_fusion(&five_elements(), 2, &history, &mut FixedRng::new(0.0));
        assert!(out.is_none());
    }

    #[test]
    fn test_five_element_streak_tracking() {
        let history = FusionHistory::default();
        let out = attempt_five_element_fusion(&five_elements(), 3, &history, &mut FixedRng::new(0.0))
            .expect("performable");
        assert!(out.success);
        assert_eq!(out.seed_variety_id.as_ref().map(VarietyId::as_str), Some("rainbow-melon"));
        assert_eq!(out.history.same_variety_streak, 1);
        assert_eq!(out.consumed.len(), 5);

        let again = attempt_five_element_fusion(&five_elements(), 3, &out.history, &mut FixedRng::new(0.0))
            .expect("performable");
        assert_eq!(again.history.same_variety_streak, 2);

        let failed = attempt_five_element_fusion(&five_elements(), 3, &again.history, &mut FixedRng::new(0.9))
            .expect("performable");
        assert!(!failed.success);
        assert!(failed.returned_gene.is_some());
        assert_eq!(failed.history.same_variety_streak, 3);
        assert_eq!(failed.history.last_variety_id, again.history.last_variety_id);
    }

    #[test]
    fn test_pity_picks_unobtained_variety() {
        let history = FusionHistory {
            last_variety_id: Some(VarietyId::new("rainbow-melon")),
            same_variety_streak: 3,
            obtained_prismatic_variety_ids: vec![VarietyId::new("rainbow-melon")],
        };
        for draw in [0.0, 0.3, 0.6, 0.99] {
            let mut rng = ScriptedRng::new(vec![0.0, draw]);
            let out = attempt_five_element_fusion(&five_elements(), 3, &history, &mut rng)
                .expect("performable");
            let id = out.seed_variety_id.expect("success");
            assert!(out.pity_applied);
            assert!(!history.obtained_prismatic_variety_ids.contains(&id));
            assert_eq!(out.history.same_variety_streak, 1);
        }
    }

    #[test]
    fn test_pity_falls_back_when_everything_obtained() {
        let history = FusionHistory {
            last_variety_id: Some(VarietyId::new("galaxy-melon")),
            same_variety_streak: 5,
            obtained_prismatic_variety_ids: catalog::varieties_of(BreedType::Prismatic)
                .map(|d| d.variety_id())
                .collect(),
        };
        let out = attempt_five_element_fusion(&five_elements(), 3, &history, &mut FixedRng::new(0.0))
            .expect("performable");
        assert!(!out.pity_applied);
        assert!(out.seed_variety_id.is_some());
    }

    #[test]
    fn test_void_fusion_needs_every_prismatic() {
        let mut fragments: Vec<GeneFragment> = catalog::varieties_of(BreedType::Prismatic)
            .enumerate()
            .map(|(i, def)| fragment(&format!("p{i}"), def.id, i as i64))
            .collect();
        let out = attempt_void_fusion(&fragments).expect("complete set");
        assert_eq!(out.seed_variety_id, VarietyId::VOID_MELON);
        assert_eq!(out.consumed.len(), 5);

        fragments.pop();
        assert!(attempt_void_fusion(&fragments).is_none());
    }

    #[test]
    fn test_void_fusion_prefers_newest_duplicate() {
        let prismatic: Vec<&'static str> = catalog::varieties_of(BreedType::Prismatic)
            .map(|def| def.id)
            .collect();
        let mut fragments: Vec<GeneFragment> = prismatic
            .iter()
            .enumerate()
            .map(|(i, id)| fragment(&format!("p{i}"), *id, 100 + i as i64))
            .collect();
        fragments.push(fragment("p0-old", prismatic[0], 1));
        fragments.insert(0, fragment("p0-new", prismatic[0], 500));

        let out = attempt_void_fusion(&fragments).expect("complete set");
        assert_eq!(out.consumed.len(), 5);
        assert!(out.consumed.contains(&FragmentId::new("p0-new")));
        assert!(!out.consumed.contains(&FragmentId::new("p0")));
        assert!(!out.consumed.contains(&FragmentId::new("p0-old")));
    }

    #[test]
    fn test_black_hole_fusion_needs_every_pair() {
        let fragments: Vec<GeneFragment> = HybridPair::all()
            .into_iter()
            .enumerate()
            .map(|(i, pair)| {
                let def = catalog::hybrids_of(pair).next().expect("hybrid");
                fragment(&format!("h{i}"), def.id, i as i64)
            })
            .collect();
        let out = attempt_black_hole_fusion(&fragments).expect("complete set");
        assert_eq!(out.seed_variety_id, VarietyId::BLACKHOLE_MELON);
        assert_eq!(out.consumed.len(), 10);

        assert!(attempt_black_hole_fusion(&fragments[1..]).is_none());
    }

    #[test]
    fn test_consume_fragments_removes_ids() {
        let fragments = five_elements();
        let left = consume_fragments(&fragments, &[FragmentId::new("e"), FragmentId::new("m")]);
        assert_eq!(left.len(), 3);
        assert!(left.iter().all(|f| f.id.as_str() != "e"));
    }
}
