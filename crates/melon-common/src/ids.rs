//! ID types for plots, varieties, and persisted records.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Identifier of a plant variety in the static catalog (e.g. `"jelly-melon"`).
///
/// Catalog ids are borrowed `'static` strings; ids read back from a save are
/// owned. Both compare by content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarietyId(Cow<'static, str>);

impl VarietyId {
    /// Creates a variety ID from any string.
    #[must_use]
    pub fn new(id: impl Into<Cow<'static, str>>) -> Self {
        Self(id.into())
    }

    /// Creates a variety ID from a static catalog string.
    #[must_use]
    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Dark-matter product of the prismatic set fusion.
    pub const VOID_MELON: Self = Self::from_static("void-melon");

    /// Dark-matter product of the hybrid-pair set fusion.
    pub const BLACKHOLE_MELON: Self = Self::from_static("blackhole-melon");

    /// Granted automatically once every other variety is discovered.
    pub const COSMIC_HEART: Self = Self::from_static("cosmic-heart");
}

impl fmt::Display for VarietyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for VarietyId {
    fn from(id: &'static str) -> Self {
        Self::from_static(id)
    }
}

/// Stable index of a garden plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlotId(u32);

impl PlotId {
    /// Creates a plot ID from a raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a gene fragment in the player's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(String);

impl FragmentId {
    /// Creates a fragment ID from a raw string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives the id of the fragment produced by harvesting `plot` at `at_ms`.
    #[must_use]
    pub fn for_harvest(plot: PlotId, at_ms: i64) -> Self {
        Self(format!("gene-{plot}-{at_ms}"))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a stolen-plot history record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StolenRecordId(String);

impl StolenRecordId {
    /// Derives the record id for a theft from `plot` at `at_ms`.
    #[must_use]
    pub fn for_theft(plot: PlotId, at_ms: i64) -> Self {
        Self(format!("stolen-{plot}-{at_ms}"))
    }

    /// Creates a record ID from a raw string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of an ambient creature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreatureId(String);

impl CreatureId {
    /// Derives the id of a creature spawned at `at_ms`.
    #[must_use]
    pub fn spawned_at(at_ms: i64) -> Self {
        Self(format!("creature-{at_ms}"))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
