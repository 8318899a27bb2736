//! Garden plots.
//!
//! A plot cycles empty -> growing -> (mature | withered | stolen) -> empty.
//! `accumulated_minutes` is the source of truth; `progress` is derived from
//! it and the variety's maturity time.

use crate::catalog::{self, Rarity};
use crate::fusion::GeneFragment;
use crate::galaxy::GalaxyId;
use crate::variety::{roll_injected_variety, roll_variety};
use melon_common::{sanitize_millis, DayKey, FragmentId, PlotId, RandomSource, VarietyId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Mutation chance every freshly planted seed starts with.
pub const BASE_MUTATION_CHANCE: f64 = 0.02;

/// Progress at which the planted variety becomes visible.
pub const REVEAL_THRESHOLD: f64 = 0.60;

/// Lifecycle state of a plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlotState {
    /// Nothing planted.
    #[default]
    Empty,
    /// Planted and accumulating minutes.
    Growing,
    /// Fully grown, ready to harvest.
    Mature,
    /// Died; clear to reuse.
    Withered,
    /// Taken by a thief; clear to reuse.
    Stolen,
}

impl PlotState {
    /// Checks if a thief can target a plot in this state.
    #[must_use]
    pub const fn is_occupied_crop(self) -> bool {
        matches!(self, Self::Growing | Self::Mature)
    }
}

/// Quality of the seed a plot was planted with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum SeedQuality {
    /// Standard seed.
    #[default]
    Normal,
    /// Doubles the weight of rare-and-above varieties.
    Epic,
    /// Quadruples the weight of rare-and-above varieties.
    Legendary,
}

impl SeedQuality {
    /// Weight multiplier applied to varieties of the given rarity.
    #[must_use]
    pub const fn weight_multiplier(self, rarity: Rarity) -> f64 {
        match (self, rarity) {
            (_, Rarity::Common) | (Self::Normal, _) => 1.0,
            (Self::Epic, _) => 2.0,
            (Self::Legendary, _) => 4.0,
        }
    }

    /// One tier lower; normal stays normal.
    #[must_use]
    pub const fn downgrade(self) -> Self {
        match self {
            Self::Legendary => Self::Epic,
            Self::Epic | Self::Normal => Self::Normal,
        }
    }
}

/// Outcome of the single mutation roll a plot gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationStatus {
    /// No mutation (either not rolled yet, missed, or no effect).
    #[default]
    None,
    /// Became a mutant.
    Positive,
    /// Withered or lost seed quality.
    Negative,
}

/// A thief lurking on a plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thief {
    /// When the thief showed up (ms epoch).
    pub appeared_at: i64,
    /// When the theft resolves (ms epoch).
    pub steal_at: i64,
}

/// One garden slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Plot {
    /// Stable index.
    pub id: PlotId,
    /// Lifecycle state.
    pub state: PlotState,
    /// Seed quality, once planted.
    pub seed_quality: Option<SeedQuality>,
    /// Variety, assigned at planting.
    pub variety_id: Option<VarietyId>,
    /// Growth progress in `[0, 1]`.
    pub progress: f64,
    /// Growth minutes received so far.
    pub accumulated_minutes: u32,
    /// Result of the mutation roll.
    pub mutation_status: MutationStatus,
    /// Pending mutation chance; 0 once the roll happened.
    pub mutation_chance: f64,
    /// Mutant crop flag.
    pub is_mutant: bool,
    /// Active thief, if any.
    pub thief: Option<Thief>,
    /// Star tracker attached.
    pub has_tracker: bool,
    /// Day the seed went in.
    pub planted_date: Option<DayKey>,
    /// Day of the last growth update.
    pub last_update_date: Option<DayKey>,
    /// Last time this plot saw activity (ms epoch).
    pub last_activity_timestamp: i64,
}

impl Default for Plot {
    fn default() -> Self {
        Self::empty(PlotId::new(0))
    }
}

impl Plot {
    /// Creates an empty plot.
    #[must_use]
    pub fn empty(id: PlotId) -> Self {
        Self {
            id,
            state: PlotState::Empty,
            seed_quality: None,
            variety_id: None,
            progress: 0.0,
            accumulated_minutes: 0,
            mutation_status: MutationStatus::None,
            mutation_chance: 0.0,
            is_mutant: false,
            thief: None,
            has_tracker: false,
            planted_date: None,
            last_update_date: None,
            last_activity_timestamp: 0,
        }
    }

    /// Checks if the variety is visible to the player.
    #[must_use]
    pub fn is_revealed(&self) -> bool {
        self.progress >= REVEAL_THRESHOLD
    }

    /// Checks if the mutation roll is still ahead.
    #[must_use]
    pub fn mutation_pending(&self) -> bool {
        self.mutation_status == MutationStatus::None && self.mutation_chance > 0.0
    }

    /// Returns the plot cleared back to empty, keeping its id.
    #[must_use]
    pub fn cleared(&self) -> Self {
        Self::empty(self.id)
    }
}

/// Plants a known variety into an empty plot.
///
/// Returns `None` if the plot is occupied or the variety is unknown.
#[must_use]
pub fn plant_variety(
    plot: &Plot,
    variety_id: VarietyId,
    quality: SeedQuality,
    now: i64,
) -> Option<Plot> {
    if plot.state != PlotState::Empty {
        return None;
    }
    catalog::variety(variety_id.as_str())?;

    let now = sanitize_millis(now);
    let today = DayKey::from_millis(now);
    debug!("Planted {} in plot {}", variety_id, plot.id);
    Some(Plot {
        id: plot.id,
        state: PlotState::Growing,
        seed_quality: Some(quality),
        variety_id: Some(variety_id),
        progress: 0.0,
        accumulated_minutes: 0,
        mutation_status: MutationStatus::None,
        mutation_chance: BASE_MUTATION_CHANCE,
        is_mutant: false,
        thief: None,
        has_tracker: false,
        planted_date: Some(today.clone()),
        last_update_date: Some(today),
        last_activity_timestamp: now,
    })
}

/// Plants a random seed, rolling the variety from the unlocked galaxies.
#[must_use]
pub fn plant_seed(
    plot: &Plot,
    quality: SeedQuality,
    unlocked: &[GalaxyId],
    now: i64,
    rng: &mut dyn RandomSource,
) -> Option<Plot> {
    if plot.state != PlotState::Empty {
        return None;
    }
    let variety_id = roll_variety(unlocked, quality, rng);
    plant_variety(plot, variety_id, quality, now)
}

/// Plants an injected seed biased toward `target` galaxy.
#[must_use]
pub fn inject_seed(
    plot: &Plot,
    target: GalaxyId,
    unlocked: &[GalaxyId],
    quality: SeedQuality,
    now: i64,
    rng: &mut dyn RandomSource,
) -> Option<Plot> {
    if plot.state != PlotState::Empty {
        return None;
    }
    let variety_id = roll_injected_variety(target, unlocked, quality, rng);
    plant_variety(plot, variety_id, quality, now)
}

/// Everything a harvest produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Harvest {
    /// The plot, now empty.
    pub plot: Plot,
    /// Harvested variety.
    pub variety_id: VarietyId,
    /// Whether the melon is a mutant.
    pub is_mutant: bool,
    /// Gene fragment dropped by the melon.
    pub fragment: GeneFragment,
}

/// Harvests a mature plot. Returns `None` for any other state.
#[must_use]
pub fn harvest_plot(plot: &Plot, now: i64) -> Option<Harvest> {
    if plot.state != PlotState::Mature {
        return None;
    }
    let variety_id = plot.variety_id.clone()?;
    let def = catalog::variety(variety_id.as_str())?;
    let now = sanitize_millis(now);

    let fragment = GeneFragment {
        id: FragmentId::for_harvest(plot.id, now),
        galaxy_id: def.galaxy,
        variety_id: variety_id.clone(),
        rarity: def.rarity,
        obtained_at: now,
    };
    debug!("Harvested {} from plot {}", variety_id, plot.id);
    Some(Harvest {
        plot: plot.cleared(),
        variety_id,
        is_mutant: plot.is_mutant,
        fragment,
    })
}

/// Clears a withered or stolen plot. Returns `None` for any other state.
#[must_use]
pub fn clear_plot(plot: &Plot) -> Option<Plot> {
    matches!(plot.state, PlotState::Withered | PlotState::Stolen).then(|| plot.cleared())
}

/// Grows the plot list to `count` slots. Never shrinks.
#[must_use]
pub fn ensure_plot_count(plots: &[Plot], count: usize) -> Vec<Plot> {
    let mut next = plots.to_vec();
    for index in plots.len()..count {
        next.push(Plot::empty(PlotId::new(index as u32)));
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use melon_common::{FixedRng, MS_PER_DAY};

    const NOW: i64 = 20_000 * MS_PER_DAY;

    fn growing(id: &'static str) -> Plot {
        plant_variety(
            &Plot::empty(PlotId::new(0)),
            VarietyId::new(id),
            SeedQuality::Normal,
            NOW,
        )
        .expect("empty plot accepts seed")
    }

    #[test]
    fn test_seed_quality_multiplier_only_boosts_rare_tail() {
        assert!((SeedQuality::Legendary.weight_multiplier(Rarity::Common) - 1.0).abs() < 1e-9);
        assert!((SeedQuality::Epic.weight_multiplier(Rarity::Rare) - 2.0).abs() < 1e-9);
        assert!((SeedQuality::Legendary.weight_multiplier(Rarity::Epic) - 4.0).abs() < 1e-9);
        assert!((SeedQuality::Normal.weight_multiplier(Rarity::Legendary) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_seed_quality_downgrade() {
        assert_eq!(SeedQuality::Legendary.downgrade(), SeedQuality::Epic);
        assert_eq!(SeedQuality::Epic.downgrade(), SeedQuality::Normal);
        assert_eq!(SeedQuality::Normal.downgrade(), SeedQuality::Normal);
    }

    #[test]
    fn test_planting_sets_fresh_state() {
        let plot = growing("jelly-melon");
        assert_eq!(plot.state, PlotState::Growing);
        assert!((plot.mutation_chance - BASE_MUTATION_CHANCE).abs() < f64::EPSILON);
        assert_eq!(plot.planted_date, Some(DayKey::from_millis(NOW)));
        assert_eq!(plot.last_activity_timestamp, NOW);
        assert!(plot.mutation_pending());
    }

    #[test]
    fn test_planting_rejects_occupied_or_unknown() {
        let plot = growing("jelly-melon");
        assert!(plant_variety(&plot, VarietyId::new("clay-melon"), SeedQuality::Normal, NOW).is_none());
        let empty = Plot::empty(PlotId::new(1));
        assert!(plant_variety(&empty, VarietyId::new("nope"), SeedQuality::Normal, NOW).is_none());
    }

    #[test]
    fn test_plant_seed_rolls_from_unlocked() {
        let mut rng = FixedRng::new(0.0);
        let plot = plant_seed(
            &Plot::empty(PlotId::new(2)),
            SeedQuality::Legendary,
            &[GalaxyId::ThickEarth],
            NOW,
            &mut rng,
        )
        .expect("planted");
        let def = catalog::variety(plot.variety_id.as_ref().expect("variety").as_str())
            .expect("catalog");
        assert_eq!(def.galaxy, GalaxyId::ThickEarth);
    }

    #[test]
    fn test_harvest_requires_mature() {
        let mut plot = growing("moss-melon");
        assert!(harvest_plot(&plot, NOW).is_none());

        plot.state = PlotState::Mature;
        plot.progress = 1.0;
        plot.is_mutant = true;
        let harvest = harvest_plot(&plot, NOW + 5).expect("harvest");
        assert_eq!(harvest.plot.state, PlotState::Empty);
        assert_eq!(harvest.plot.id, plot.id);
        assert!(harvest.is_mutant);
        assert_eq!(harvest.fragment.rarity, Rarity::Rare);
        assert_eq!(harvest.fragment.galaxy_id, GalaxyId::ThickEarth);
        assert_eq!(harvest.fragment.obtained_at, NOW + 5);
    }

    #[test]
    fn test_clear_only_dead_plots() {
        let mut plot = growing("jelly-melon");
        assert!(clear_plot(&plot).is_none());
        plot.state = PlotState::Stolen;
        assert_eq!(clear_plot(&plot).map(|p| p.state), Some(PlotState::Empty));
    }

    #[test]
    fn test_ensure_plot_count_only_grows() {
        let plots = ensure_plot_count(&[], 4);
        assert_eq!(plots.len(), 4);
        assert_eq!(plots[3].id, PlotId::new(3));
        assert_eq!(ensure_plot_count(&plots, 2).len(), 4);
    }

    #[test]
    fn test_plot_deserializes_with_missing_fields() {
        let plot: Plot = serde_json::from_str(r#"{"id":5,"state":"growing"}"#).expect("plot");
        assert_eq!(plot.id, PlotId::new(5));
        assert_eq!(plot.state, PlotState::Growing);
        assert_eq!(plot.accumulated_minutes, 0);
    }
}
