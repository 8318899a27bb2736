//! Plot growth, the one-shot mutation roll, and time accounting.
//!
//! Growth is driven by whole minutes handed in by the host: real elapsed
//! time (capped for offline catch-up) plus boosted focus minutes.

use crate::catalog;
use crate::plot::{MutationStatus, Plot, PlotState};
use melon_common::{minutes_between, sanitize_minutes, DayKey, RandomSource};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Progress at which the mutation roll fires.
pub const MUTATION_THRESHOLD: f64 = 0.20;

/// Share of mutation hits that turn positive.
const POSITIVE_MUTATION_CUTOFF: f64 = 0.40;

/// Upper bound of the negative mutation band.
const NEGATIVE_MUTATION_CUTOFF: f64 = 0.70;

/// Offline minutes that pass through unchanged (24h).
pub const OFFLINE_FULL_MINUTES: u32 = 1440;

/// Inactivity after which plots wither instead of growing (72h).
pub const WITHER_MINUTES: u32 = 4320;

/// Focus minutes up to which the lower boost multiplier applies.
pub const FOCUS_BOOST_TIER_MINUTES: u32 = 120;

/// Growth minutes per focus minute, up to the tier.
pub const FOCUS_BOOST_LOW: u32 = 10;

/// Growth minutes per focus minute, past the tier.
pub const FOCUS_BOOST_HIGH: u32 = 20;

/// What the mutation roll did to a plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationOutcome {
    /// The chance roll missed.
    Missed,
    /// The plot became a mutant.
    Positive,
    /// The plot withered on the spot.
    Withered,
    /// The seed lost one quality tier.
    Downgraded,
    /// The roll hit but nothing happened.
    NoEffect,
}

impl MutationOutcome {
    /// Checks if the plot ended up as a mutant.
    #[must_use]
    pub const fn is_mutant(self) -> bool {
        matches!(self, Self::Positive)
    }
}

/// Performs the single mutation roll. The returned plot always has
/// `mutation_chance == 0`, so the roll never repeats.
#[must_use]
pub fn roll_mutation(plot: &Plot, rng: &mut dyn RandomSource) -> (Plot, MutationOutcome) {
    let mut next = plot.clone();
    next.mutation_chance = 0.0;

    if rng.next_f64() >= plot.mutation_chance {
        next.is_mutant = false;
        return (next, MutationOutcome::Missed);
    }

    let roll = rng.next_f64();
    let outcome = if roll < POSITIVE_MUTATION_CUTOFF {
        next.is_mutant = true;
        next.mutation_status = MutationStatus::Positive;
        MutationOutcome::Positive
    } else if roll < NEGATIVE_MUTATION_CUTOFF {
        next.mutation_status = MutationStatus::Negative;
        if rng.chance(0.5) {
            next.state = PlotState::Withered;
            next.progress = 0.0;
            next.accumulated_minutes = 0;
            next.thief = None;
            MutationOutcome::Withered
        } else {
            next.seed_quality = next.seed_quality.map(|q| q.downgrade());
            MutationOutcome::Downgraded
        }
    } else {
        MutationOutcome::NoEffect
    };
    debug!("Plot {} mutation roll: {:?}", plot.id, outcome);
    (next, outcome)
}

/// Result of one growth step on one plot.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthUpdate {
    /// The updated plot.
    pub plot: Plot,
    /// Progress crossed the reveal threshold during this step.
    pub just_revealed: bool,
    /// Set when the mutation roll fired during this step.
    pub mutation_outcome: Option<MutationOutcome>,
}

/// Advances a growing plot by `growth_minutes`.
///
/// Non-growing plots and plots without a known variety are returned
/// unchanged. Negative or non-finite minutes count as zero, so progress
/// never decreases through growth.
#[must_use]
pub fn update_plot_growth(
    plot: &Plot,
    growth_minutes: f64,
    now: i64,
    rng: &mut dyn RandomSource,
) -> GrowthUpdate {
    let unchanged = || GrowthUpdate {
        plot: plot.clone(),
        just_revealed: false,
        mutation_outcome: None,
    };
    if plot.state != PlotState::Growing {
        return unchanged();
    }
    let Some(mature_minutes) = plot.variety_id.as_ref().and_then(catalog::mature_minutes) else {
        return unchanged();
    };

    let minutes = sanitize_minutes(growth_minutes);
    let mature_minutes = mature_minutes.max(1);
    let previous = plot.progress;

    let mut next = plot.clone();
    next.accumulated_minutes = plot
        .accumulated_minutes
        .saturating_add(minutes)
        .min(mature_minutes);
    next.progress = (f64::from(next.accumulated_minutes) / f64::from(mature_minutes)).min(1.0);
    next.state = if next.progress >= 1.0 {
        PlotState::Mature
    } else {
        PlotState::Growing
    };
    if minutes > 0 {
        next.last_activity_timestamp = now.max(0);
        next.last_update_date = Some(DayKey::from_millis(now));
    }

    let mut just_revealed = previous < crate::plot::REVEAL_THRESHOLD && next.is_revealed();

    let mut mutation_outcome = None;
    if previous < MUTATION_THRESHOLD
        && next.progress >= MUTATION_THRESHOLD
        && next.mutation_pending()
    {
        let (rolled, outcome) = roll_mutation(&next, rng);
        next = rolled;
        mutation_outcome = Some(outcome);
        if outcome == MutationOutcome::Withered {
            just_revealed = false;
        }
    }

    GrowthUpdate {
        plot: next,
        just_revealed,
        mutation_outcome,
    }
}

/// Growth minutes credited for time spent offline.
///
/// Up to 24h passes through; 24h to 72h is capped at 24h; beyond 72h the
/// plots wither instead and no growth is credited.
#[must_use]
pub fn calculate_offline_growth(offline_minutes: f64) -> u32 {
    let minutes = sanitize_minutes(offline_minutes);
    if minutes <= OFFLINE_FULL_MINUTES {
        minutes
    } else if minutes <= WITHER_MINUTES {
        OFFLINE_FULL_MINUTES
    } else {
        0
    }
}

/// Growth minutes earned by focus time: 10x up to two hours, 20x beyond.
#[must_use]
pub fn calculate_focus_boost(focus_minutes: f64) -> u32 {
    let minutes = sanitize_minutes(focus_minutes);
    let multiplier = if minutes <= FOCUS_BOOST_TIER_MINUTES {
        FOCUS_BOOST_LOW
    } else {
        FOCUS_BOOST_HIGH
    };
    minutes.saturating_mul(multiplier)
}

/// Inactivity assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WitherStatus {
    /// Whole minutes since the last activity.
    pub inactive_minutes: u32,
    /// Inactivity reached the wither threshold.
    pub should_wither: bool,
}

/// Checks whether inactivity since `last_activity` withers the garden.
#[must_use]
pub fn get_wither_status(last_activity: i64, now: i64) -> WitherStatus {
    let inactive_minutes = minutes_between(last_activity, now);
    WitherStatus {
        inactive_minutes,
        should_wither: inactive_minutes >= WITHER_MINUTES,
    }
}

/// Withers every growing or mature plot inactive for 72h or more.
///
/// A plot's effective activity is the later of its own timestamp and the
/// player's `last_active_at`.
#[must_use]
pub fn wither_plots(plots: &[Plot], last_active_at: i64, now: i64) -> Vec<Plot> {
    plots
        .iter()
        .map(|plot| {
            if !plot.state.is_occupied_crop() {
                return plot.clone();
            }
            let effective = plot.last_activity_timestamp.max(last_active_at);
            if !get_wither_status(effective, now).should_wither {
                return plot.clone();
            }
            debug!("Plot {} withered from inactivity", plot.id);
            Plot {
                state: PlotState::Withered,
                thief: None,
                ..plot.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::{plant_variety, SeedQuality, BASE_MUTATION_CHANCE};
    use melon_common::{FixedRng, PlotId, ScriptedRng, VarietyId, MS_PER_MINUTE};
    use proptest::prelude::*;

    const NOW: i64 = 1_700_000_000_000;

    /// jelly-melon matures in 1440 minutes.
    fn jelly() -> Plot {
        plant_variety(
            &Plot::empty(PlotId::new(0)),
            VarietyId::new("jelly-melon"),
            SeedQuality::Legendary,
            NOW,
        )
        .expect("planted")
    }

    #[test]
    fn test_growth_accumulates_and_matures() {
        let mut rng = FixedRng::new(0.99);
        let step = update_plot_growth(&jelly(), 720.0, NOW, &mut rng);
        assert_eq!(step.plot.accumulated_minutes, 720);
        assert!((step.plot.progress - 0.5).abs() < 1e-9);
        assert_eq!(step.plot.state, PlotState::Growing);

        let step = update_plot_growth(&step.plot, 10_000.0, NOW, &mut rng);
        assert_eq!(step.plot.accumulated_minutes, 1440);
        assert!((step.plot.progress - 1.0).abs() < 1e-9);
        assert_eq!(step.plot.state, PlotState::Mature);
    }

    #[test]
    fn test_growth_floors_minutes_and_ignores_bad_input() {
        let mut rng = FixedRng::new(0.99);
        let step = update_plot_growth(&jelly(), 10.9, NOW, &mut rng);
        assert_eq!(step.plot.accumulated_minutes, 10);

        for bad in [-5.0, f64::NAN, f64::NEG_INFINITY] {
            let step = update_plot_growth(&jelly(), bad, NOW, &mut rng);
            assert_eq!(step.plot.accumulated_minutes, 0);
        }
    }

    #[test]
    fn test_non_growing_plot_is_untouched() {
        let empty = Plot::empty(PlotId::new(1));
        let step = update_plot_growth(&empty, 500.0, NOW, &mut FixedRng::new(0.0));
        assert_eq!(step.plot, empty);
        assert!(!step.just_revealed);
        assert!(step.mutation_outcome.is_none());
    }

    #[test]
    fn test_reveal_fires_once_on_crossing() {
        let mut rng = FixedRng::new(0.99);
        let step = update_plot_growth(&jelly(), 863.0, NOW, &mut rng);
        assert!(!step.just_revealed);
        let step = update_plot_growth(&step.plot, 1.0, NOW, &mut rng);
        assert!(step.just_revealed);
        let step = update_plot_growth(&step.plot, 1.0, NOW, &mut rng);
        assert!(!step.just_revealed);
    }

    #[test]
    fn test_mutation_fires_once_at_threshold() {
        let mut rng = FixedRng::new(0.99);
        let below = update_plot_growth(&jelly(), 287.0, NOW, &mut rng);
        assert!(below.mutation_outcome.is_none());
        assert!((below.plot.mutation_chance - BASE_MUTATION_CHANCE).abs() < 1e-9);

        let crossed = update_plot_growth(&below.plot, 1.0, NOW, &mut rng);
        assert_eq!(crossed.mutation_outcome, Some(MutationOutcome::Missed));
        assert!(crossed.plot.mutation_chance.abs() < f64::EPSILON);

        let after = update_plot_growth(&crossed.plot, 100.0, NOW, &mut rng);
        assert!(after.mutation_outcome.is_none());
    }

    #[test]
    fn test_roll_mutation_branches() {
        let plot = jelly();

        let (p, o) = roll_mutation(&plot, &mut ScriptedRng::new(vec![0.0, 0.1]));
        assert_eq!(o, MutationOutcome::Positive);
        assert!(p.is_mutant);
        assert_eq!(p.mutation_status, MutationStatus::Positive);

        let (p, o) = roll_mutation(&plot, &mut ScriptedRng::new(vec![0.0, 0.5, 0.2]));
        assert_eq!(o, MutationOutcome::Withered);
        assert_eq!(p.state, PlotState::Withered);
        assert_eq!(p.accumulated_minutes, 0);

        let (p, o) = roll_mutation(&plot, &mut ScriptedRng::new(vec![0.0, 0.5, 0.7]));
        assert_eq!(o, MutationOutcome::Downgraded);
        assert_eq!(p.seed_quality, Some(SeedQuality::Epic));
        assert_eq!(p.state, PlotState::Growing);

        let (p, o) = roll_mutation(&plot, &mut ScriptedRng::new(vec![0.0, 0.8]));
        assert_eq!(o, MutationOutcome::NoEffect);
        assert_eq!(p.mutation_status, MutationStatus::None);

        let (p, o) = roll_mutation(&plot, &mut ScriptedRng::new(vec![0.5]));
        assert_eq!(o, MutationOutcome::Missed);
        assert!(!p.is_mutant);
    }

    #[test]
    fn test_mutation_wither_clears_reveal() {
        let mut plot = jelly();
        plot.mutation_chance = 1.0;
        // Jump straight past both thresholds; roll hits, negative, wither.
        let step = update_plot_growth(&plot, 1000.0, NOW, &mut ScriptedRng::new(vec![0.0, 0.5, 0.1]));
        assert_eq!(step.mutation_outcome, Some(MutationOutcome::Withered));
        assert_eq!(step.plot.state, PlotState::Withered);
        assert!(!step.just_revealed);
    }

    #[test]
    fn test_offline_growth_boundaries() {
        assert_eq!(calculate_offline_growth(0.0), 0);
        assert_eq!(calculate_offline_growth(1440.0), 1440);
        assert_eq!(calculate_offline_growth(1441.0), 1440);
        assert_eq!(calculate_offline_growth(4320.0), 1440);
        assert_eq!(calculate_offline_growth(4321.0), 0);
        assert_eq!(calculate_offline_growth(f64::NAN), 0);
    }

    #[test]
    fn test_focus_boost_tiers() {
        assert_eq!(calculate_focus_boost(0.0), 0);
        assert_eq!(calculate_focus_boost(25.0), 250);
        assert_eq!(calculate_focus_boost(120.0), 1200);
        assert_eq!(calculate_focus_boost(121.0), 2420);
    }

    #[test]
    fn test_wither_status_threshold() {
        let just_under = NOW + i64::from(WITHER_MINUTES - 1) * MS_PER_MINUTE;
        assert!(!get_wither_status(NOW, just_under).should_wither);
        let at = NOW + i64::from(WITHER_MINUTES) * MS_PER_MINUTE;
        let status = get_wither_status(NOW, at);
        assert!(status.should_wither);
        assert_eq!(status.inactive_minutes, WITHER_MINUTES);
    }

    #[test]
    fn test_wither_plots_uses_latest_activity() {
        let mut stale = jelly();
        stale.last_activity_timestamp = 0;
        let empty = Plot::empty(PlotId::new(3));
        let later = NOW + i64::from(WITHER_MINUTES) * MS_PER_MINUTE;

        let withered = wither_plots(&[stale.clone(), empty.clone()], NOW, later);
        assert_eq!(withered[0].state, PlotState::Withered);
        assert_eq!(withered[1], empty);

        let kept = wither_plots(&[stale], later - MS_PER_MINUTE, later);
        assert_eq!(kept[0].state, PlotState::Growing);
    }

    proptest! {
        #[test]
        fn prop_progress_monotonic_and_bounded(
            steps in proptest::collection::vec(0.0f64..2000.0, 1..12),
            draw in 0.0f64..1.0,
        ) {
            let mut rng = FixedRng::new(draw);
            let mut plot = jelly();
            for minutes in steps {
                let before = plot.progress;
                let step = update_plot_growth(&plot, minutes, NOW, &mut rng);
                if step.plot.state == PlotState::Withered {
                    break;
                }
                prop_assert!(step.plot.progress >= before);
                prop_assert!(step.plot.progress <= 1.0);
                plot = step.plot;
            }
        }

        #[test]
        fn prop_roll_mutation_always_zeroes_chance(chance in 0.0f64..1.0, a in 0.0f64..1.0, b in 0.0f64..1.0, c in 0.0f64..1.0) {
            let mut plot = jelly();
            plot.mutation_chance = chance;
            let (rolled, _) = roll_mutation(&plot, &mut ScriptedRng::new(vec![a, b, c]));
            prop_assert!(rolled.mutation_chance.abs() < f64::EPSILON);
        }
    }
}
