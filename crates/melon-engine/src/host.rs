//! The farm host.
//!
//! Each public method is one complete transition: read the snapshot it needs
//! from the store, run the engine, persist the result. `&mut self` keeps
//! transitions from overlapping.

use crate::config::FarmConfig;
use crate::store::{keys, KeyValueStore};
use melon_common::{
    sanitize_millis, DayKey, FarmResult, FragmentId, PlotId, RandomSource, StolenRecordId,
    VarietyId,
};
use melon_farm::{
    apply_growth_with_mutation, attempt_black_hole_fusion, attempt_five_element_fusion,
    attempt_fusion, attempt_void_fusion, calculate_offline_growth, check_cosmic_heart, clear_plot,
    consume_fragments, ensure_plot_count, get_plot_count, get_unlocked_galaxies,
    get_wither_status, harvest_plot, harvested_hybrid_count, inject_seed, on_app_open,
    plant_seed, plant_variety, record_harvest, resolve_stolen_record, roll_hybrid_variety,
    rotate_weather_state, sell_variety, wither_plots, CollectedVariety, Creature,
    FiveElementOutcome, FusionHistory, GalaxyId, GeneFragment, PairFusionOutcome, Plot,
    PlotState, SeedQuality, SetFusionOutcome, ShedInventory, ShedResult, StolenRecord,
    TickContext, TickOutcome, WeatherState,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// When the player was last seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityLog {
    /// Last activity (ms epoch); 0 for a brand-new farm.
    pub last_active_at: i64,
}

/// Which seed to plant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedChoice {
    /// A random seed of a quality, rolled from the unlocked galaxies.
    Random(SeedQuality),
    /// A random seed biased toward an unlocked galaxy. Also consumes one
    /// fragment of that galaxy.
    Injected {
        /// Galaxy to favor.
        target: GalaxyId,
        /// Seed quality.
        quality: SeedQuality,
    },
    /// A stored seed of a known variety.
    Variety(VarietyId),
}

/// Result of an app resume.
#[derive(Debug, Clone, Default)]
pub struct ResumeReport {
    /// Minutes since the player was last active.
    pub inactive_minutes: u32,
    /// Growth minutes credited for the absence.
    pub growth_minutes: u32,
    /// Plots that withered from neglect.
    pub withered: Vec<PlotId>,
    /// The catch-up tick, when one ran.
    pub tick: Option<TickOutcome>,
}

/// Result of opening the app.
#[derive(Debug, Clone, PartialEq)]
pub struct AppOpenReport {
    /// Rotated weather.
    pub weather: WeatherState,
    /// Creatures now on screen.
    pub creatures: Vec<Creature>,
}

/// Result of a harvest.
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestReport {
    /// Harvested variety.
    pub variety_id: VarietyId,
    /// Mutant flag.
    pub is_mutant: bool,
    /// Fragment added to the inventory.
    pub fragment: GeneFragment,
    /// Galaxies this harvest unlocked.
    pub newly_unlocked: Vec<GalaxyId>,
    /// Whether the harvest completed the dex.
    pub cosmic_heart_granted: bool,
}

/// Result of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleReceipt {
    /// Units sold.
    pub sold: u32,
    /// Coins earned.
    pub coins: u32,
}

/// Result of a pairwise fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct PairFusionReport {
    /// Engine outcome.
    pub outcome: PairFusionOutcome,
    /// Hybrid seed added to the shed on success.
    pub seed_variety_id: Option<VarietyId>,
}

/// Drives the farm engine over a persistent store.
pub struct FarmHost<S: KeyValueStore, R: RandomSource> {
    store: S,
    rng: R,
    starting_plots: usize,
}

impl<S: KeyValueStore, R: RandomSource> FarmHost<S, R> {
    /// Creates a host with default settings.
    pub fn new(store: S, rng: R) -> Self {
        Self::with_config(store, rng, &FarmConfig::default())
    }

    /// Creates a host using a configuration.
    pub fn with_config(store: S, rng: R, config: &FarmConfig) -> Self {
        Self {
            store,
            rng,
            starting_plots: config.starting_plots.max(1),
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consumes the host, returning the store.
    pub fn into_store(self) -> S {
        self.store
    }

    // === Snapshots ===

    /// Current plots, grown to the count the collection has earned.
    pub fn plots(&self) -> Vec<Plot> {
        let stored: Vec<Plot> = self.store.load(keys::PLOTS);
        ensure_plot_count(&stored, self.plot_count())
    }

    /// Plots the player has earned.
    pub fn plot_count(&self) -> usize {
        get_plot_count(&self.collection()).max(self.starting_plots)
    }

    /// Gene fragment inventory.
    pub fn fragments(&self) -> Vec<GeneFragment> {
        self.store.load(keys::FRAGMENTS)
    }

    /// The dex.
    pub fn collection(&self) -> Vec<CollectedVariety> {
        self.store.load(keys::COLLECTION)
    }

    /// Galaxies open for planting.
    pub fn unlocked_galaxies(&self) -> Vec<GalaxyId> {
        get_unlocked_galaxies(&self.collection())
    }

    /// Five-element pity state.
    pub fn fusion_history(&self) -> FusionHistory {
        self.store.load(keys::FUSION_HISTORY)
    }

    /// Theft history.
    pub fn stolen_history(&self) -> Vec<StolenRecord> {
        self.store.load(keys::STOLEN_HISTORY)
    }

    /// Current weather.
    pub fn weather(&self) -> WeatherState {
        self.store.load(keys::WEATHER)
    }

    /// Creatures on screen.
    pub fn creatures(&self) -> Vec<Creature> {
        self.store.load(keys::CREATURES)
    }

    /// Shed stock.
    pub fn shed(&self) -> ShedInventory {
        self.store.load(keys::SHED)
    }

    /// Last activity record.
    pub fn activity(&self) -> ActivityLog {
        self.store.load(keys::ACTIVITY)
    }

    fn touch(&mut self, now: i64) -> FarmResult<()> {
        let last_active_at = self.activity().last_active_at.max(now);
        self.store
            .save(keys::ACTIVITY, &ActivityLog { last_active_at })?;
        Ok(())
    }

    fn plot_index(plots: &[Plot], plot_id: PlotId) -> Option<usize> {
        plots.iter().position(|p| p.id == plot_id)
    }

    // === Time ===

    /// Grows every plot and runs thieves.
    pub fn tick(
        &mut self,
        now: i64,
        growth_minutes: f64,
        focus_minutes_today: f64,
    ) -> FarmResult<TickOutcome> {
        let now = sanitize_millis(now);
        let plots = self.plots();
        let barrier = self.shed().barrier_active(&DayKey::from_millis(now));
        let ctx = TickContext::new(now, growth_minutes, focus_minutes_today, barrier);

        let outcome = apply_growth_with_mutation(&plots, growth_minutes, &ctx, &mut self.rng);
        self.store.save(keys::PLOTS, &outcome.plots)?;

        if !outcome.stolen_records.is_empty() {
            let mut history = self.stolen_history();
            history.extend(outcome.stolen_records.iter().cloned());
            self.store.save(keys::STOLEN_HISTORY, &history)?;
        }
        self.touch(now)?;
        Ok(outcome)
    }

    /// Catches up after the app was away.
    ///
    /// Past the wither threshold, growing plots wither instead of growing.
    /// Otherwise the absence is credited as capped offline growth.
    pub fn resume(&mut self, now: i64, focus_minutes_today: f64) -> FarmResult<ResumeReport> {
        let now = sanitize_millis(now);
        let activity = self.activity();
        if activity.last_active_at == 0 {
            debug!("First launch, nothing to catch up");
            self.touch(now)?;
            return Ok(ResumeReport::default());
        }

        let status = get_wither_status(activity.last_active_at, now);
        if status.should_wither {
            let plots = self.plots();
            let next = wither_plots(&plots, activity.last_active_at, now);
            let withered: Vec<PlotId> = plots
                .iter()
                .zip(&next)
                .filter(|(before, after)| before.state != after.state)
                .map(|(_, after)| after.id)
                .collect();
            info!(
                "Away {} minutes, {} plot(s) withered",
                status.inactive_minutes,
                withered.len()
            );
            self.store.save(keys::PLOTS, &next)?;
            self.touch(now)?;
            return Ok(ResumeReport {
                inactive_minutes: status.inactive_minutes,
                growth_minutes: 0,
                withered,
                tick: None,
            });
        }

        let growth = calculate_offline_growth(f64::from(status.inactive_minutes));
        info!(
            "Away {} minutes, crediting {} growth minutes",
            status.inactive_minutes, growth
        );
        let outcome = self.tick(now, f64::from(growth), focus_minutes_today)?;
        Ok(ResumeReport {
            inactive_minutes: status.inactive_minutes,
            growth_minutes: growth,
            withered: Vec::new(),
            tick: Some(outcome),
        })
    }

    /// Rotates the weather and lets creatures come and go.
    pub fn app_open(&mut self, now: i64) -> FarmResult<AppOpenReport> {
        let weather = rotate_weather_state(&self.weather(), now, &mut self.rng);
        let creatures = on_app_open(&self.creatures(), now, &mut self.rng);
        self.store.save(keys::WEATHER, &weather)?;
        self.store.save(keys::CREATURES, &creatures)?;
        Ok(AppOpenReport { weather, creatures })
    }

    // === Plots ===

    /// Plants a seed from the shed. Returns `None` if the plot is not empty
    /// or the seed (or injection fragment) is missing.
    pub fn plant(&mut self, plot_id: PlotId, seed: &SeedChoice, now: i64) -> FarmResult<Option<Plot>> {
        let mut plots = self.plots();
        let Some(index) = Self::plot_index(&plots, plot_id) else {
            return Ok(None);
        };
        if plots[index].state != PlotState::Empty {
            return Ok(None);
        }
        let mut shed = self.shed();
        let mut fragments_after = None;

        let planted = match seed {
            SeedChoice::Random(quality) => {
                if shed.take_seed(*quality).is_err() {
                    return Ok(None);
                }
                let unlocked = self.unlocked_galaxies();
                plant_seed(&plots[index], *quality, &unlocked, now, &mut self.rng)
            },
            SeedChoice::Injected { target, quality } => {
                let unlocked = self.unlocked_galaxies();
                let fragments = self.fragments();
                let fuel = fragments
                    .iter()
                    .filter(|f| f.galaxy_id == *target)
                    .min_by_key(|f| f.obtained_at);
                let (Some(fuel), true) = (fuel, unlocked.contains(target)) else {
                    return Ok(None);
                };
                if shed.take_seed(*quality).is_err() {
                    return Ok(None);
                }
                fragments_after = Some(consume_fragments(&fragments, &[fuel.id.clone()]));
                inject_seed(&plots[index], *target, &unlocked, *quality, now, &mut self.rng)
            },
            SeedChoice::Variety(variety_id) => {
                if shed.take_variety_seed(variety_id).is_err() {
                    return Ok(None);
                }
                plant_variety(&plots[index], variety_id.clone(), SeedQuality::Normal, now)
            },
        };
        let Some(planted) = planted else {
            return Ok(None);
        };

        // Costs are written before the reward.
        self.store.save(keys::SHED, &shed)?;
        if let Some(fragments) = fragments_after {
            self.store.save(keys::FRAGMENTS, &fragments)?;
        }
        plots[index] = planted.clone();
        self.store.save(keys::PLOTS, &plots)?;
        self.touch(now)?;
        Ok(Some(planted))
    }

    /// Harvests a mature plot into the dex and fragment inventory.
    pub fn harvest(&mut self, plot_id: PlotId, now: i64) -> FarmResult<Option<HarvestReport>> {
        let mut plots = self.plots();
        let Some(index) = Self::plot_index(&plots, plot_id) else {
            return Ok(None);
        };
        let Some(harvest) = harvest_plot(&plots[index], now) else {
            return Ok(None);
        };
        plots[index] = harvest.plot.clone();

        let today = DayKey::from_millis(sanitize_millis(now));
        let before = self.collection();
        let mut collection = record_harvest(&before, &harvest.variety_id, harvest.is_mutant, &today);
        let mut shed = self.shed();
        let cosmic_heart_granted = match check_cosmic_heart(&collection, &today) {
            Some(grant) => {
                shed.add_variety_seed(grant.seed_variety_id);
                collection = grant.collection;
                true
            },
            None => false,
        };

        let was_unlocked = get_unlocked_galaxies(&before);
        let newly_unlocked: Vec<GalaxyId> = get_unlocked_galaxies(&collection)
            .into_iter()
            .filter(|g| !was_unlocked.contains(g))
            .collect();
        for galaxy in &newly_unlocked {
            info!("Galaxy unlocked: {}", galaxy);
        }

        let mut fragments = self.fragments();
        fragments.push(harvest.fragment.clone());
        let plot_target = get_plot_count(&collection).max(self.starting_plots);
        let plots = ensure_plot_count(&plots, plot_target);

        self.store.save(keys::PLOTS, &plots)?;
        self.store.save(keys::COLLECTION, &collection)?;
        self.store.save(keys::FRAGMENTS, &fragments)?;
        self.store.save(keys::SHED, &shed)?;
        self.touch(now)?;

        Ok(Some(HarvestReport {
            variety_id: harvest.variety_id,
            is_mutant: harvest.is_mutant,
            fragment: harvest.fragment,
            newly_unlocked,
            cosmic_heart_granted,
        }))
    }

    /// Clears a withered or stolen plot.
    pub fn clear(&mut self, plot_id: PlotId) -> FarmResult<bool> {
        let mut plots = self.plots();
        let Some(index) = Self::plot_index(&plots, plot_id) else {
            return Ok(false);
        };
        let Some(cleared) = clear_plot(&plots[index]) else {
            return Ok(false);
        };
        plots[index] = cleared;
        self.store.save(keys::PLOTS, &plots)?;
        Ok(true)
    }

    /// Sells dex stock.
    pub fn sell(
        &mut self,
        variety_id: &VarietyId,
        is_mutant: bool,
        quantity: u32,
    ) -> FarmResult<Option<SaleReceipt>> {
        let Some(sale) = sell_variety(&self.collection(), variety_id, is_mutant, quantity) else {
            return Ok(None);
        };
        self.store.save(keys::COLLECTION, &sale.collection)?;
        Ok(Some(SaleReceipt {
            sold: sale.sold,
            coins: sale.coins,
        }))
    }

    /// Marks a theft resolved.
    pub fn resolve_theft(
        &mut self,
        record_id: &StolenRecordId,
        recovered_count: u32,
        now: i64,
    ) -> FarmResult<bool> {
        let history = self.stolen_history();
        let Some(next) = resolve_stolen_record(&history, record_id, recovered_count, now) else {
            return Ok(false);
        };
        self.store.save(keys::STOLEN_HISTORY, &next)?;
        Ok(true)
    }

    // === Shed ===

    /// Edits the shed (purchases, rewards).
    pub fn update_shed(&mut self, edit: impl FnOnce(&mut ShedInventory)) -> FarmResult<()> {
        let mut shed = self.shed();
        edit(&mut shed);
        self.store.save(keys::SHED, &shed)?;
        Ok(())
    }

    fn use_item_on_plot(
        &mut self,
        plot_id: PlotId,
        apply: impl FnOnce(&mut ShedInventory, &Plot) -> ShedResult<Plot>,
    ) -> FarmResult<Option<Plot>> {
        let mut plots = self.plots();
        let Some(index) = Self::plot_index(&plots, plot_id) else {
            return Ok(None);
        };
        let mut shed = self.shed();
        let next = match apply(&mut shed, &plots[index]) {
            Ok(next) => next,
            Err(e) => {
                debug!("Item not used on plot {}: {}", plot_id, e);
                return Ok(None);
            },
        };
        plots[index] = next.clone();
        self.store.save(keys::PLOTS, &plots)?;
        self.store.save(keys::SHED, &shed)?;
        Ok(Some(next))
    }

    /// Fires the mutation gun at a plot.
    pub fn fire_mutation_gun(&mut self, plot_id: PlotId) -> FarmResult<Option<Plot>> {
        self.use_item_on_plot(plot_id, ShedInventory::fire_mutation_gun)
    }

    /// Catches the thief on a plot.
    pub fn use_trap_net(&mut self, plot_id: PlotId) -> FarmResult<Option<Plot>> {
        self.use_item_on_plot(plot_id, ShedInventory::use_trap_net)
    }

    /// Attaches a star tracker to a plot.
    pub fn attach_star_tracker(&mut self, plot_id: PlotId) -> FarmResult<Option<Plot>> {
        self.use_item_on_plot(plot_id, ShedInventory::attach_star_tracker)
    }

    /// Raises a guardian barrier for today.
    pub fn activate_guardian_barrier(&mut self, now: i64) -> FarmResult<bool> {
        let mut shed = self.shed();
        let today = DayKey::from_millis(sanitize_millis(now));
        if let Err(e) = shed.activate_guardian_barrier(&today) {
            debug!("Barrier not raised: {}", e);
            return Ok(false);
        }
        self.store.save(keys::SHED, &shed)?;
        Ok(true)
    }

    // === Fusion ===

    fn apply_fragments(
        &mut self,
        fragments: &[GeneFragment],
        consumed: &[FragmentId],
        returned: Option<&GeneFragment>,
    ) -> FarmResult<()> {
        let mut remaining = consume_fragments(fragments, consumed);
        remaining.extend(returned.cloned());
        self.store.save(keys::FRAGMENTS, &remaining)?;
        Ok(())
    }

    /// Fuses two fragments, optionally spending a gene modifier.
    pub fn fuse_pair(
        &mut self,
        first: &FragmentId,
        second: &FragmentId,
        use_modifier: bool,
    ) -> FarmResult<Option<PairFusionReport>> {
        if first == second {
            return Ok(None);
        }
        let fragments = self.fragments();
        let find = |id: &FragmentId| fragments.iter().find(|f| f.id == *id);
        let (Some(a), Some(b)) = (find(first), find(second)) else {
            return Ok(None);
        };

        let mut shed = self.shed();
        let bonus = if use_modifier {
            match shed.use_gene_modifier() {
                Ok(bonus) => bonus,
                Err(e) => {
                    debug!("Fusion not attempted: {}", e);
                    return Ok(None);
                },
            }
        } else {
            0.0
        };
        let Some(outcome) = attempt_fusion(a, b, bonus, &mut self.rng) else {
            return Ok(None);
        };

        let seed_variety_id = if outcome.success {
            roll_hybrid_variety(outcome.galaxy_pair, &mut self.rng)
        } else {
            None
        };
        if let Some(seed) = &seed_variety_id {
            info!("Pair fusion produced {}", seed);
            shed.add_variety_seed(seed.clone());
        }

        self.apply_fragments(&fragments, &outcome.consumed, outcome.returned_gene.as_ref())?;
        self.store.save(keys::SHED, &shed)?;
        Ok(Some(PairFusionReport {
            outcome,
            seed_variety_id,
        }))
    }

    /// Runs a five-element fusion.
    pub fn fuse_five_elements(&mut self) -> FarmResult<Option<FiveElementOutcome>> {
        let fragments = self.fragments();
        let hybrids = harvested_hybrid_count(&self.collection());
        let history = self.fusion_history();
        let Some(outcome) = attempt_five_element_fusion(&fragments, hybrids, &history, &mut self.rng)
        else {
            return Ok(None);
        };

        self.apply_fragments(&fragments, &outcome.consumed, outcome.returned_gene.as_ref())?;
        self.store.save(keys::FUSION_HISTORY, &outcome.history)?;
        if let Some(seed) = &outcome.seed_variety_id {
            self.update_shed(|shed| shed.add_variety_seed(seed.clone()))?;
        }
        Ok(Some(outcome))
    }

    fn apply_set_fusion(
        &mut self,
        fragments: &[GeneFragment],
        outcome: Option<SetFusionOutcome>,
    ) -> FarmResult<Option<SetFusionOutcome>> {
        let Some(outcome) = outcome else {
            return Ok(None);
        };
        self.apply_fragments(fragments, &outcome.consumed, None)?;
        self.update_shed(|shed| shed.add_variety_seed(outcome.seed_variety_id.clone()))?;
        Ok(Some(outcome))
    }

    /// Fuses one fragment of each prismatic variety into a void melon seed.
    pub fn fuse_void(&mut self) -> FarmResult<Option<SetFusionOutcome>> {
        let fragments = self.fragments();
        let outcome = attempt_void_fusion(&fragments);
        self.apply_set_fusion(&fragments, outcome)
    }

    /// Fuses one fragment of each hybrid pair into a black hole melon seed.
    pub fn fuse_black_hole(&mut self) -> FarmResult<Option<SetFusionOutcome>> {
        let fragments = self.fragments();
        let outcome = attempt_black_hole_fusion(&fragments);
        self.apply_set_fusion(&fragments, outcome)
    }
}
