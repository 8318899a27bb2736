//! Farm weather, rotated every six hours.
//!
//! Rotation keeps phase: `last_change_at` advances by whole periods rather
//! than snapping to the current time.

use melon_common::{sanitize_millis, RandomSource, MS_PER_HOUR};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Time between weather rolls.
pub const ROTATION_MS: i64 = 6 * MS_PER_HOUR;

/// Chance that a roll lands on a rainbow.
pub const RAINBOW_CHANCE: f64 = 0.05;

/// Weather shown over the farm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Weather {
    /// Clear skies.
    #[default]
    Sunny,
    /// Overcast.
    Cloudy,
    /// Rain.
    Rainy,
    /// Night sky.
    Night,
    /// Rare rainbow.
    Rainbow,
}

impl Weather {
    /// Weather drawn uniformly when the rainbow roll misses.
    pub const COMMON: [Self; 4] = [Self::Sunny, Self::Cloudy, Self::Rainy, Self::Night];

    /// Get the display name for this weather.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Sunny => "Sunny",
            Self::Cloudy => "Cloudy",
            Self::Rainy => "Rainy",
            Self::Night => "Night",
            Self::Rainbow => "Rainbow",
        }
    }
}

/// Persisted weather.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeatherState {
    /// Current weather; `None` before the first roll.
    pub current: Option<Weather>,
    /// When the weather last changed (ms epoch).
    pub last_change_at: i64,
}

/// Rolls a new weather: 5% rainbow, otherwise uniform over the rest.
pub fn roll_weather(rng: &mut dyn RandomSource) -> Weather {
    if rng.chance(RAINBOW_CHANCE) {
        Weather::Rainbow
    } else {
        Weather::COMMON[rng.index(Weather::COMMON.len())]
    }
}

/// Applies every rotation due at `now`.
///
/// A first call rolls the initial weather. A change time in the future is
/// clamped to `now`. Only the last of several due rolls is kept.
#[must_use]
pub fn rotate_weather_state(
    state: &WeatherState,
    now: i64,
    rng: &mut dyn RandomSource,
) -> WeatherState {
    let now = sanitize_millis(now);
    let Some(mut current) = state.current else {
        let weather = roll_weather(rng);
        debug!("Initial weather: {}", weather.display_name());
        return WeatherState {
            current: Some(weather),
            last_change_at: now,
        };
    };

    let last = sanitize_millis(state.last_change_at);
    if last > now {
        return WeatherState {
            current: Some(current),
            last_change_at: now,
        };
    }

    let rotations = (now - last) / ROTATION_MS;
    if rotations == 0 {
        return *state;
    }
    for _ in 0..rotations {
        current = roll_weather(rng);
    }
    debug!(
        "Weather rotated {} time(s), now {}",
        rotations,
        current.display_name()
    );
    WeatherState {
        current: Some(current),
        last_change_at: last + rotations * ROTATION_MS,
    }
}
