//! Ambient creatures that visit the farm when the app opens.
//!
//! At most one creature is on screen at a time.

use melon_common::{sanitize_millis, CreatureId, RandomSource, ScreenPercent};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Chance of a visit per app open, when nothing is active.
pub const SPAWN_CHANCE: f64 = 0.10;

/// Shortest visit (ms).
pub const MIN_TTL_MS: i64 = 5_000;

/// Longest visit (ms, inclusive).
pub const MAX_TTL_MS: i64 = 15_000;

/// Horizontal spawn band, in viewport percent.
const X_RANGE: (f64, f64) = (10.0, 90.0);

/// Vertical spawn band, in viewport percent.
const Y_RANGE: (f64, f64) = (15.0, 75.0);

/// Creature species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CreatureKind {
    /// Butterfly.
    Butterfly,
    /// Ladybug.
    Ladybug,
    /// Bee.
    Bee,
    /// Firefly.
    Firefly,
    /// Snail.
    Snail,
}

impl CreatureKind {
    /// All species.
    pub const ALL: [Self; 5] = [
        Self::Butterfly,
        Self::Ladybug,
        Self::Bee,
        Self::Firefly,
        Self::Snail,
    ];
}

/// A visiting creature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creature {
    /// Creature id.
    pub id: CreatureId,
    /// Species.
    #[serde(rename = "type")]
    pub kind: CreatureKind,
    /// Screen position.
    #[serde(flatten)]
    pub position: ScreenPercent,
    /// When the creature leaves (ms epoch).
    pub expires_at: i64,
}

impl Creature {
    /// Checks if the creature is still visible at `now`.
    #[must_use]
    pub fn is_active(&self, now: i64) -> bool {
        self.expires_at > now
    }
}

/// Prunes expired creatures and maybe spawns one.
///
/// The result holds at most one creature: of several still-active ones, the
/// one staying longest is kept. Draws, in order: spawn chance, species, x, y,
/// lifetime. No draws happen while a creature is still active.
#[must_use]
pub fn on_app_open(creatures: &[Creature], now: i64, rng: &mut dyn RandomSource) -> Vec<Creature> {
    let now = sanitize_millis(now);
    let staying = creatures
        .iter()
        .filter(|c| c.is_active(now))
        .max_by_key(|c| c.expires_at);
    if let Some(creature) = staying {
        return vec![creature.clone()];
    }
    if !rng.chance(SPAWN_CHANCE) {
        return Vec::new();
    }

    let kind = CreatureKind::ALL[rng.index(CreatureKind::ALL.len())];
    let position = ScreenPercent::new(rng.range_f64(X_RANGE.0, X_RANGE.1), rng.range_f64(Y_RANGE.0, Y_RANGE.1));
    let ttl = rng.range_f64(MIN_TTL_MS as f64, (MAX_TTL_MS + 1) as f64) as i64;
    debug!("{:?} visits for {}ms", kind, ttl);

    vec![Creature {
        id: CreatureId::spawned_at(now),
        kind,
        position,
        expires_at: now + ttl,
    }]
}
