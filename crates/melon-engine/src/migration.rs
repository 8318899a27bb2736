//! Per-key schema migrations for stored records.
//!
//! Each migration upgrades the raw JSON of one store key by one version.
//! Keys without a registered step keep their shape across that version.

use crate::store::{keys, StoreError, StoreResult};
use ahash::AHashMap;
use melon_farm::catalog;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, info};

/// One upgrade step for a store key.
pub trait Migration {
    /// Store key the migration applies to.
    fn key(&self) -> &'static str;

    /// Version the migration upgrades from.
    fn source_version(&self) -> u32;

    /// Version after the migration.
    fn target_version(&self) -> u32 {
        self.source_version() + 1
    }

    /// Upgrades the data in place.
    fn migrate(&self, data: &mut Value) -> StoreResult<()>;

    /// Human-readable summary.
    fn description(&self) -> &str;
}

/// Registry of migrations keyed by store key, then source version.
#[derive(Default)]
pub struct MigrationRegistry {
    migrations: AHashMap<&'static str, AHashMap<u32, Box<dyn Migration + Send + Sync>>>,
}

impl MigrationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in migration.
    #[must_use]
    pub fn with_builtin_migrations() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(PlotsAccumulatedMinutes));
        registry
    }

    /// Registers a migration.
    pub fn register(&mut self, migration: Box<dyn Migration + Send + Sync>) {
        self.migrations
            .entry(migration.key())
            .or_default()
            .insert(migration.source_version(), migration);
    }

    /// Gets the migration for a key at a source version.
    #[must_use]
    pub fn get(&self, key: &str, source_version: u32) -> Option<&(dyn Migration + Send + Sync)> {
        self.migrations
            .get(key)
            .and_then(|steps| steps.get(&source_version))
            .map(Box::as_ref)
    }

    /// Upgrades `data` for `key` from `from_version` to `to_version`.
    pub fn migrate(
        &self,
        key: &str,
        data: &mut Value,
        from_version: u32,
        to_version: u32,
    ) -> StoreResult<()> {
        let mut current = from_version;
        while current < to_version {
            match self.get(key, current) {
                Some(migration) => {
                    info!(
                        "Migrating {}: {} ({} -> {})",
                        key,
                        migration.description(),
                        current,
                        migration.target_version()
                    );
                    migration.migrate(data)?;
                    current = migration.target_version();
                },
                None => {
                    debug!("No {} migration at version {}, shape unchanged", key, current);
                    current += 1;
                },
            }
        }
        Ok(())
    }
}

/// The shared registry of built-in migrations.
pub fn builtin() -> &'static MigrationRegistry {
    static REGISTRY: OnceLock<MigrationRegistry> = OnceLock::new();
    REGISTRY.get_or_init(MigrationRegistry::with_builtin_migrations)
}

/// v0 plots stored only `progress`; rebuild `accumulatedMinutes` from it
/// and realign `progress` to the rebuilt minutes.
struct PlotsAccumulatedMinutes;

impl Migration for PlotsAccumulatedMinutes {
    fn key(&self) -> &'static str {
        keys::PLOTS
    }

    fn source_version(&self) -> u32 {
        0
    }

    fn migrate(&self, data: &mut Value) -> StoreResult<()> {
        let plots = data.as_array_mut().ok_or_else(|| StoreError::MigrationFailed {
            key: keys::PLOTS.to_string(),
            from: 0,
            reason: "expected a plot list".to_string(),
        })?;

        for plot in plots.iter_mut().filter_map(Value::as_object_mut) {
            if plot.get("accumulatedMinutes").is_some_and(Value::is_u64) {
                continue;
            }
            let progress = plot
                .get("progress")
                .and_then(Value::as_f64)
                .filter(|p| p.is_finite())
                .unwrap_or(0.0)
                .clamp(0.0, 1.0);
            let mature = plot
                .get("varietyId")
                .and_then(Value::as_str)
                .and_then(catalog::variety)
                .map_or(0, |def| def.mature_minutes);
            // Round up so the progress rebuilt from minutes never drops.
            let minutes = (progress * f64::from(mature)).ceil().min(f64::from(mature)) as u64;
            plot.insert("accumulatedMinutes".to_string(), Value::from(minutes));
            if mature > 0 {
                plot.insert(
                    "progress".to_string(),
                    Value::from(minutes as f64 / f64::from(mature)),
                );
            }
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "rebuild accumulated minutes from progress"
    }
}
