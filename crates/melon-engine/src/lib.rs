//! # Melon Engine
//!
//! Hosts the farm engine: configuration, persistence, and the
//! read -> compute -> persist loop.
//!
//! - Config: `melon.toml` with safe defaults
//! - Store: the key-value persistence port, versioned JSON records
//! - Migration: per-key upgrades of older records
//! - Host: one method per farm transition

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod host;
pub mod migration;
pub mod store;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::host::*;
    pub use crate::migration::{Migration, MigrationRegistry};
    pub use crate::store::*;
}

pub use prelude::*;
