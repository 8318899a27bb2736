//! Thieves and the batch growth tick.
//!
//! Each tick grows every plot, then resolves or spawns thieves. A thief
//! waits 30 minutes before stealing; a star tracker on the plot turns the
//! theft into an automatic recovery.

use crate::growth::{update_plot_growth, MutationOutcome};
use crate::plot::{Plot, PlotState, Thief};
use melon_common::{
    sanitize_minutes, sanitize_millis, PlotId, RandomSource, StolenRecordId, VarietyId,
    MS_PER_MINUTE,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Minutes between a thief appearing and stealing.
pub const THIEF_STEAL_DELAY_MINUTES: i64 = 30;

/// Milliseconds between a thief appearing and stealing.
pub const THIEF_STEAL_DELAY_MS: i64 = THIEF_STEAL_DELAY_MINUTES * MS_PER_MINUTE;

/// Chance of a thief per plot per tick for a given day's focus minutes.
///
/// More focus means lower risk: 0.5% from an hour, 2% from 25 minutes,
/// 5% otherwise.
#[must_use]
pub fn get_thief_appearance_chance(focus_minutes_today: f64) -> f64 {
    match sanitize_minutes(focus_minutes_today) {
        60.. => 0.005,
        25.. => 0.02,
        _ => 0.05,
    }
}

/// A theft kept in the player's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StolenRecord {
    /// Record id.
    pub id: StolenRecordId,
    /// Plot the melon was taken from.
    pub plot_id: PlotId,
    /// The stolen variety.
    pub variety_id: VarietyId,
    /// When the theft happened (ms epoch).
    pub stolen_at: i64,
    /// Whether the player has dealt with it.
    pub resolved: bool,
    /// Units recovered.
    pub recovered_count: u32,
    /// When it was resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovered_at: Option<i64>,
}

/// Marks a stolen record resolved. Returns `None` if the id is unknown or
/// the record is already resolved.
#[must_use]
pub fn resolve_stolen_record(
    records: &[StolenRecord],
    id: &StolenRecordId,
    recovered_count: u32,
    now: i64,
) -> Option<Vec<StolenRecord>> {
    let mut next = records.to_vec();
    let record = next.iter_mut().find(|r| r.id == *id && !r.resolved)?;
    record.resolved = true;
    record.recovered_count = recovered_count;
    record.recovered_at = Some(sanitize_millis(now));
    Some(next)
}

/// Removes an active thief from a plot (trap net). Returns `None` if there
/// is no thief to catch.
#[must_use]
pub fn capture_thief(plot: &Plot) -> Option<Plot> {
    plot.thief?;
    debug!("Captured thief on plot {}", plot.id);
    Some(Plot {
        thief: None,
        ..plot.clone()
    })
}

/// Per-tick inputs from the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    /// Current time (ms epoch).
    pub now: i64,
    /// Focus minutes completed today.
    pub focus_minutes_today: f64,
    /// Whether a guardian barrier covers today.
    pub barrier_active: bool,
    /// Whether new thieves may appear this tick.
    pub thief_spawn_enabled: bool,
}

impl TickContext {
    /// Builds a context where thieves may spawn only if the tick grows plots.
    #[must_use]
    pub fn new(now: i64, growth_minutes: f64, focus_minutes_today: f64, barrier_active: bool) -> Self {
        Self {
            now,
            focus_minutes_today,
            barrier_active,
            thief_spawn_enabled: sanitize_minutes(growth_minutes) > 0,
        }
    }
}

/// A mutation worth announcing to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationToast {
    /// Plot that mutated.
    pub plot_id: PlotId,
    /// Its variety.
    pub variety_id: Option<VarietyId>,
}

/// Everything a batch tick produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickOutcome {
    /// Updated plots, same order as the input.
    pub plots: Vec<Plot>,
    /// Plots whose variety became visible.
    pub revealed: Vec<PlotId>,
    /// Every mutation roll that fired, per plot.
    pub mutations: Vec<(PlotId, MutationOutcome)>,
    /// Positive mutations to announce.
    pub mutation_toasts: Vec<MutationToast>,
    /// New thefts for the host to append to history.
    pub stolen_records: Vec<StolenRecord>,
    /// Plots whose tracker recovered a theft.
    pub recovered: Vec<PlotId>,
}

fn resolve_thief(
    plot: Plot,
    thief: Thief,
    ctx: &TickContext,
    outcome: &mut TickOutcome,
) -> Plot {
    if plot.has_tracker {
        info!("Tracker recovered plot {} from a thief", plot.id);
        outcome.recovered.push(plot.id);
        return Plot {
            thief: None,
            has_tracker: false,
            ..plot
        };
    }
    let Some(variety_id) = plot.variety_id.clone() else {
        return Plot { thief: None, ..plot };
    };

    info!("Thief stole {} from plot {}", variety_id, plot.id);
    let stolen_at = ctx.now.max(thief.steal_at);
    outcome.stolen_records.push(StolenRecord {
        id: StolenRecordId::for_theft(plot.id, stolen_at),
        plot_id: plot.id,
        variety_id,
        stolen_at,
        resolved: false,
        recovered_count: 0,
        recovered_at: None,
    });
    Plot {
        state: PlotState::Stolen,
        thief: None,
        has_tracker: false,
        ..plot
    }
}

/// Grows every plot by `growth_minutes`, then resolves and spawns thieves.
#[must_use]
pub fn apply_growth_with_mutation(
    plots: &[Plot],
    growth_minutes: f64,
    ctx: &TickContext,
    rng: &mut dyn RandomSource,
) -> TickOutcome {
    let now = sanitize_millis(ctx.now);
    let appearance_chance = get_thief_appearance_chance(ctx.focus_minutes_today);
    let mut outcome = TickOutcome::default();

    for plot in plots {
        let step = update_plot_growth(plot, growth_minutes, now, rng);
        if step.just_revealed {
            outcome.revealed.push(plot.id);
        }
        if let Some(mutation) = step.mutation_outcome {
            outcome.mutations.push((plot.id, mutation));
            if mutation.is_mutant() && step.plot.is_mutant {
                outcome.mutation_toasts.push(MutationToast {
                    plot_id: plot.id,
                    variety_id: step.plot.variety_id.clone(),
                });
            }
        }

        let mut next = step.plot;
        if !next.state.is_occupied_crop() {
            // A plot that just withered cannot keep a thief.
            next.thief = None;
        }

        next = match next.thief {
            Some(thief) if now >= thief.steal_at => resolve_thief(next, thief, ctx, &mut outcome),
            Some(_) => next,
            None => {
                let eligible = ctx.thief_spawn_enabled
                    && !ctx.barrier_active
                    && next.state.is_occupied_crop()
                    && next.variety_id.is_some();
                if eligible && rng.chance(appearance_chance) {
                    debug!("Thief appeared on plot {}", next.id);
                    next.thief = Some(Thief {
                        appeared_at: now,
                        steal_at: now + THIEF_STEAL_DELAY_MS,
                    });
                }
                next
            }
        };
        outcome.plots.push(next);
    }
    outcome
}
