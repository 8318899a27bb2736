//! # Melon Farm
//!
//! The farm simulation engine.
//!
//! Every function takes an explicit state snapshot plus an injected
//! randomness source and returns new values. Nothing here performs I/O.
//! - Variety catalog and weighted seed rolls
//! - Plot growth, the one-shot mutation roll, offline and focus time
//! - Thieves, trackers, and guardian barriers
//! - Gene fusion (pairwise, five-element with pity, set completion)
//! - The dex, galaxy unlocks, and plot milestones
//! - Shed items and seed stock
//! - Weather rotation and visiting creatures

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod catalog;
pub mod collection;
pub mod creature;
pub mod fusion;
pub mod galaxy;
pub mod growth;
pub mod plot;
pub mod shed;
pub mod thief;
pub mod variety;
pub mod weather;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::catalog::*;
    pub use crate::collection::*;
    pub use crate::creature::*;
    pub use crate::fusion::*;
    pub use crate::galaxy::*;
    pub use crate::growth::*;
    pub use crate::plot::*;
    pub use crate::shed::*;
    pub use crate::thief::*;
    pub use crate::variety::*;
    pub use crate::weather::*;
}

pub use prelude::*;
