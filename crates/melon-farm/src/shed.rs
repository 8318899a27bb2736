//! The shed: consumable items and stored seeds.

use crate::plot::{Plot, PlotState, SeedQuality};
use crate::thief::capture_thief;
use melon_common::{DayKey, VarietyId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Fusion bonus granted by one gene modifier.
pub const GENE_MODIFIER_BONUS: f64 = 0.15;

/// Pending mutation chance after a mutation-gun shot.
pub const MUTATION_GUN_CHANCE: f64 = 0.5;

/// Consumable shed items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShedItem {
    /// Adds to the next fusion's success rate.
    GeneModifier,
    /// Raises a plot's pending mutation chance.
    MutationGun,
    /// Blocks thieves for the rest of the day.
    GuardianBarrier,
    /// Catches an active thief.
    TrapNet,
    /// Recovers a plot when its thief strikes.
    StarTracker,
}

impl ShedItem {
    /// All items.
    pub const ALL: [Self; 5] = [
        Self::GeneModifier,
        Self::MutationGun,
        Self::GuardianBarrier,
        Self::TrapNet,
        Self::StarTracker,
    ];

    /// Returns the display name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::GeneModifier => "Gene Modifier",
            Self::MutationGun => "Mutation Gun",
            Self::GuardianBarrier => "Guardian Barrier",
            Self::TrapNet => "Trap Net",
            Self::StarTracker => "Star Tracker",
        }
    }
}

impl fmt::Display for ShedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Shed error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShedError {
    /// Not enough of an item
    #[error("Not enough {item}: need {needed}, have {have}")]
    NotEnough {
        /// Item requested
        item: ShedItem,
        /// Amount needed
        needed: u32,
        /// Amount available
        have: u32,
    },
    /// No seed of the requested kind
    #[error("No seed available: {0}")]
    NoSeed(String),
    /// The item cannot be used on this target
    #[error("{item} cannot be used: {reason}")]
    NotApplicable {
        /// Item requested
        item: ShedItem,
        /// Why the use was rejected
        reason: &'static str,
    },
}

/// Result type for shed operations.
pub type ShedResult<T> = Result<T, ShedError>;

/// Item and seed stock.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShedInventory {
    items: BTreeMap<ShedItem, u32>,
    seeds: BTreeMap<SeedQuality, u32>,
    variety_seeds: BTreeMap<VarietyId, u32>,
    barrier_day: Option<DayKey>,
}

impl ShedInventory {
    /// Creates an empty shed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the count of an item.
    #[must_use]
    pub fn count(&self, item: ShedItem) -> u32 {
        self.items.get(&item).copied().unwrap_or(0)
    }

    /// Adds items.
    pub fn add(&mut self, item: ShedItem, amount: u32) {
        let entry = self.items.entry(item).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Removes items.
    pub fn remove(&mut self, item: ShedItem, amount: u32) -> ShedResult<()> {
        let have = self.count(item);
        if have < amount {
            return Err(ShedError::NotEnough {
                item,
                needed: amount,
                have,
            });
        }
        if have == amount {
            self.items.remove(&item);
        } else {
            self.items.insert(item, have - amount);
        }
        Ok(())
    }

    fn ensure(&self, item: ShedItem) -> ShedResult<()> {
        match self.count(item) {
            0 => Err(ShedError::NotEnough {
                item,
                needed: 1,
                have: 0,
            }),
            _ => Ok(()),
        }
    }

    /// Returns the number of seeds of a quality.
    #[must_use]
    pub fn seed_count(&self, quality: SeedQuality) -> u32 {
        self.seeds.get(&quality).copied().unwrap_or(0)
    }

    /// Stores random seeds.
    pub fn add_seeds(&mut self, quality: SeedQuality, amount: u32) {
        let entry = self.seeds.entry(quality).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Takes one random seed.
    pub fn take_seed(&mut self, quality: SeedQuality) -> ShedResult<()> {
        match self.seeds.get_mut(&quality) {
            Some(count) if *count > 0 => {
                *count -= 1;
                if *count == 0 {
                    self.seeds.remove(&quality);
                }
                Ok(())
            }
            _ => Err(ShedError::NoSeed(format!("{quality:?}"))),
        }
    }

    /// Returns the number of seeds of a known variety.
    #[must_use]
    pub fn variety_seed_count(&self, variety_id: &VarietyId) -> u32 {
        self.variety_seeds.get(variety_id).copied().unwrap_or(0)
    }

    /// Stores a seed of a known variety (fusion outputs, rewards).
    pub fn add_variety_seed(&mut self, variety_id: VarietyId) {
        let entry = self.variety_seeds.entry(variety_id).or_insert(0);
        *entry = entry.saturating_add(1);
    }

    /// Takes one seed of a known variety.
    pub fn take_variety_seed(&mut self, variety_id: &VarietyId) -> ShedResult<()> {
        match self.variety_seeds.get_mut(variety_id) {
            Some(count) if *count > 0 => {
                *count -= 1;
                if *count == 0 {
                    self.variety_seeds.remove(variety_id);
                }
                Ok(())
            }
            _ => Err(ShedError::NoSeed(variety_id.to_string())),
        }
    }

    /// Iterates stored seeds of known varieties.
    pub fn variety_seeds(&self) -> impl Iterator<Item = (&VarietyId, u32)> + '_ {
        self.variety_seeds.iter().map(|(id, &count)| (id, count))
    }

    /// Checks if a guardian barrier covers the given day.
    #[must_use]
    pub fn barrier_active(&self, today: &DayKey) -> bool {
        self.barrier_day.as_ref() == Some(today)
    }

    /// Consumes a gene modifier and returns its fusion bonus.
    pub fn use_gene_modifier(&mut self) -> ShedResult<f64> {
        self.remove(ShedItem::GeneModifier, 1)?;
        Ok(GENE_MODIFIER_BONUS)
    }

    /// Consumes a guardian barrier for today.
    pub fn activate_guardian_barrier(&mut self, today: &DayKey) -> ShedResult<()> {
        if self.barrier_active(today) {
            return Err(ShedError::NotApplicable {
                item: ShedItem::GuardianBarrier,
                reason: "already active today",
            });
        }
        self.remove(ShedItem::GuardianBarrier, 1)?;
        debug!("Guardian barrier active for {}", today);
        self.barrier_day = Some(today.clone());
        Ok(())
    }

    /// Shoots a growing plot whose mutation roll is still ahead.
    pub fn fire_mutation_gun(&mut self, plot: &Plot) -> ShedResult<Plot> {
        if plot.state != PlotState::Growing || !plot.mutation_pending() {
            return Err(ShedError::NotApplicable {
                item: ShedItem::MutationGun,
                reason: "mutation already rolled",
            });
        }
        self.remove(ShedItem::MutationGun, 1)?;
        Ok(Plot {
            mutation_chance: plot.mutation_chance.max(MUTATION_GUN_CHANCE),
            ..plot.clone()
        })
    }

    /// Catches the thief on a plot.
    pub fn use_trap_net(&mut self, plot: &Plot) -> ShedResult<Plot> {
        self.ensure(ShedItem::TrapNet)?;
        let caught = capture_thief(plot).ok_or(ShedError::NotApplicable {
            item: ShedItem::TrapNet,
            reason: "no thief on plot",
        })?;
        self.remove(ShedItem::TrapNet, 1)?;
        Ok(caught)
    }

    /// Attaches a star tracker to a planted plot.
    pub fn attach_star_tracker(&mut self, plot: &Plot) -> ShedResult<Plot> {
        if !plot.state.is_occupied_crop() || plot.has_tracker {
            return Err(ShedError::NotApplicable {
                item: ShedItem::StarTracker,
                reason: "plot has no crop or already tracked",
            });
        }
        self.remove(ShedItem::StarTracker, 1)?;
        Ok(Plot {
            has_tracker: true,
            ..plot.clone()
        })
    }
}
