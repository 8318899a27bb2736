//! Randomness port.
//!
//! Every probabilistic rule in the farm draws from a [`RandomSource`] passed
//! in by the caller. Production hosts use [`FastRng`]; tests pin outcomes
//! with [`FixedRng`] or [`ScriptedRng`].

/// A source of uniform randomness in `[0, 1)`.
pub trait RandomSource {
    /// Returns the next uniform draw in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Returns true with probability `p` (one draw).
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Returns a uniform value in `[min, max)` (one draw).
    fn range_f64(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    /// Returns a uniform index in `0..len` (one draw). `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize {
        let i = (self.next_f64() * len as f64).floor() as usize;
        i.min(len.saturating_sub(1))
    }
}

/// Production randomness backed by `fastrand`.
#[derive(Debug, Clone)]
pub struct FastRng {
    inner: fastrand::Rng,
}

impl FastRng {
    /// Creates a generator seeded from system entropy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: fastrand::Rng::new(),
        }
    }

    /// Creates a deterministic generator.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            inner: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Default for FastRng {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for FastRng {
    fn next_f64(&mut self) -> f64 {
        self.inner.f64()
    }
}

/// Largest value a stub source will hand out, keeping draws inside `[0, 1)`.
const MAX_DRAW: f64 = 1.0 - f64::EPSILON;

/// Always returns the same value.
#[derive(Debug, Clone, Copy)]
pub struct FixedRng(f64);

impl FixedRng {
    /// Creates a source that always yields `value` (clamped into `[0, 1)`).
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, MAX_DRAW))
    }
}

impl RandomSource for FixedRng {
    fn next_f64(&mut self) -> f64 {
        self.0
    }
}

/// Replays a fixed script of draws, cycling when it runs out.
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    draws: Vec<f64>,
    cursor: usize,
}

impl ScriptedRng {
    /// Creates a source that yields `draws` in order. An empty script yields 0.
    #[must_use]
    pub fn new(draws: impl Into<Vec<f64>>) -> Self {
        Self {
            draws: draws
                .into()
                .into_iter()
                .map(|d| d.clamp(0.0, MAX_DRAW))
                .collect(),
            cursor: 0,
        }
    }

    /// Number of draws consumed so far.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedRng {
    fn next_f64(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let value = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        value
    }
}
