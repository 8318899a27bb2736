//! # Melon Common
//!
//! Common types, utilities, and shared abstractions for the melon farm.
//!
//! This crate provides foundational types used across the farm crates:
//! - ID types (VarietyId, PlotId, FragmentId)
//! - Wall-clock helpers (ms epoch, day keys)
//! - The injectable randomness port
//! - Screen coordinates for ambient entities
//! - Schema version information for saved records
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;
pub mod rng;
pub mod time;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::rng::*;
    pub use crate::time::*;
    pub use crate::version::*;
}

pub use prelude::*;
