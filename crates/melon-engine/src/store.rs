//! Key-value persistence for farm records.
//!
//! This module provides:
//! - KeyValueStore: the persistence port the host writes through
//! - Versioned envelopes and per-key migration on load
//! - JsonFileStore: one `<key>.json` per key, atomic writes
//! - MemoryStore: in-process store for tests and tools
//!
//! Loading never fails: a missing, malformed, or too-new record yields the
//! record's default with a warning.

use crate::migration;
use ahash::AHashMap;
use melon_common::{FarmError, VersionCompatibility, CURRENT_SCHEMA_VERSION, LEGACY_SCHEMA_VERSION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Store keys for each persisted record.
pub mod keys {
    /// `Vec<Plot>`
    pub const PLOTS: &str = "plots";
    /// `Vec<GeneFragment>`
    pub const FRAGMENTS: &str = "fragments";
    /// `Vec<CollectedVariety>`
    pub const COLLECTION: &str = "collection";
    /// `FusionHistory`
    pub const FUSION_HISTORY: &str = "fusion-history";
    /// `Vec<StolenRecord>`
    pub const STOLEN_HISTORY: &str = "stolen-history";
    /// `WeatherState`
    pub const WEATHER: &str = "weather";
    /// `Vec<Creature>`
    pub const CREATURES: &str = "creatures";
    /// `ShedInventory`
    pub const SHED: &str = "shed";
    /// `ActivityLog`
    pub const ACTIVITY: &str = "activity";
}

/// Errors that can occur in the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Invalid key.
    #[error("Invalid store key: {0}")]
    InvalidKey(String),

    /// Record written by a newer build.
    #[error("Record version mismatch: expected at most {expected}, found {found}")]
    VersionMismatch {
        /// Newest supported version.
        expected: u32,
        /// Found version.
        found: u32,
    },

    /// Migration failed.
    #[error("Failed to migrate {key} from version {from}: {reason}")]
    MigrationFailed {
        /// Store key.
        key: String,
        /// Source version.
        from: u32,
        /// Reason for failure.
        reason: String,
    },

    /// Atomic write failed.
    #[error("Atomic write failed: {0}")]
    AtomicWriteFailed(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for FarmError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io(e) => Self::Io(e),
            StoreError::Serialization(msg) => Self::Serialization(msg),
            StoreError::VersionMismatch { expected, found } => Self::VersionMismatch {
                expected,
                actual: found,
            },
            other => Self::Persistence(other.to_string()),
        }
    }
}

/// The on-disk wrapper around every record.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    data: T,
}

/// Splits a stored value into `(version, data)`. Bare values are legacy.
fn split_envelope(value: Value) -> (u32, Value) {
    match value {
        Value::Object(mut map)
            if map.len() == 2
                && map.contains_key("data")
                && map.get("version").is_some_and(Value::is_u64) =>
        {
            let version = map.get("version").and_then(Value::as_u64).unwrap_or(0);
            let data = map.remove("data").unwrap_or(Value::Null);
            (u32::try_from(version).unwrap_or(u32::MAX), data)
        },
        other => (LEGACY_SCHEMA_VERSION, other),
    }
}

/// Decodes a stored record, migrating older versions.
pub fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> StoreResult<T> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| StoreError::Deserialization(e.to_string()))?;
    let (version, mut data) = split_envelope(value);

    match VersionCompatibility::of(version) {
        VersionCompatibility::TooNew => {
            return Err(StoreError::VersionMismatch {
                expected: CURRENT_SCHEMA_VERSION,
                found: version,
            });
        },
        VersionCompatibility::MigrationRequired => {
            migration::builtin().migrate(key, &mut data, version, CURRENT_SCHEMA_VERSION)?;
        },
        VersionCompatibility::Current => {},
    }

    serde_json::from_value(data).map_err(|e| StoreError::Deserialization(e.to_string()))
}

/// Encodes a record in the current envelope.
pub fn encode<T: Serialize>(value: &T) -> StoreResult<String> {
    serde_json::to_string(&Envelope {
        version: CURRENT_SCHEMA_VERSION,
        data: value,
    })
    .map_err(|e| StoreError::Serialization(e.to_string()))
}

/// The persistence port.
pub trait KeyValueStore {
    /// Reads the raw stored string for a key.
    fn load_raw(&self, key: &str) -> StoreResult<Option<String>>;

    /// Writes the raw string for a key.
    fn save_raw(&mut self, key: &str, value: &str) -> StoreResult<()>;

    /// Loads a record, falling back to its default on any problem.
    fn load<T: DeserializeOwned + Default>(&self, key: &str) -> T
    where
        Self: Sized,
    {
        let raw = match self.load_raw(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                warn!("Failed to read {}: {}, using defaults", key, e);
                return T::default();
            },
        };
        decode(key, &raw).unwrap_or_else(|e| {
            warn!("Malformed {}: {}, using defaults", key, e);
            T::default()
        })
    }

    /// Saves a record in the current envelope.
    fn save<T: Serialize>(&mut self, key: &str, value: &T) -> StoreResult<()>
    where
        Self: Sized,
    {
        let raw = encode(value)?;
        self.save_raw(key, &raw)
    }
}

fn validate_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// One JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Returns the store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json.tmp"))
    }
}

impl KeyValueStore for JsonFileStore {
    fn load_raw(&self, key: &str) -> StoreResult<Option<String>> {
        validate_key(key)?;
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn save_raw(&mut self, key: &str, value: &str) -> StoreResult<()> {
        validate_key(key)?;
        fs::create_dir_all(&self.dir)?;
        let temp_path = self.temp_path(key);
        let final_path = self.path(key);

        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(value.as_bytes())?;
            writer.flush()?;
        }

        fs::rename(&temp_path, &final_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StoreError::AtomicWriteFailed(e.to_string())
        })?;

        debug!("Atomic write complete for {}", key);
        Ok(())
    }
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: AHashMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn load_raw(&self, key: &str) -> StoreResult<Option<String>> {
        validate_key(key)?;
        Ok(self.entries.get(key).cloned())
    }

    fn save_raw(&mut self, key: &str, value: &str) -> StoreResult<()> {
        validate_key(key)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use melon_farm::{FusionHistory, Plot, PlotState, WeatherState};
    use tempfile::TempDir;

    #[test]
    fn test_envelope_round_trip() {
        let mut store = MemoryStore::new();
        let history = FusionHistory {
            same_variety_streak: 2,
            ..FusionHistory::default()
        };
        store.save(keys::FUSION_HISTORY, &history).expect("save");

        let raw = store
            .load_raw(keys::FUSION_HISTORY)
            .expect("read")
            .expect("present");
        assert!(raw.starts_with("{\"version\":1,"));
        let loaded: FusionHistory = store.load(keys::FUSION_HISTORY);
        assert_eq!(loaded, history);
    }

    #[test]
    fn test_missing_and_malformed_fall_back() {
        let mut store = MemoryStore::new();
        let plots: Vec<Plot> = store.load(keys::PLOTS);
        assert!(plots.is_empty());

        store.save_raw(keys::WEATHER, "{not json").expect("save");
        let weather: WeatherState = store.load(keys::WEATHER);
        assert_eq!(weather, WeatherState::default());
    }

    #[test]
    fn test_too_new_falls_back() {
        let mut store = MemoryStore::new();
        store
            .save_raw(keys::FRAGMENTS, r#"{"version":99,"data":[]}"#)
            .expect("save");
        assert!(matches!(
            decode::<Vec<Value>>(keys::FRAGMENTS, r#"{"version":99,"data":[]}"#),
            Err(StoreError::VersionMismatch { found: 99, .. })
        ));
        let fragments: Vec<Value> = store.load(keys::FRAGMENTS);
        assert!(fragments.is_empty());
    }

    #[test]
    fn test_legacy_plots_are_migrated() {
        let mut store = MemoryStore::new();
        store
            .save_raw(
                keys::PLOTS,
                r#"[{"id":0,"state":"growing","varietyId":"jelly-melon","progress":0.25}]"#,
            )
            .expect("save");
        let plots: Vec<Plot> = store.load(keys::PLOTS);
        assert_eq!(plots.len(), 1);
        assert_eq!(plots[0].state, PlotState::Growing);
        assert_eq!(plots[0].accumulated_minutes, 360);
    }

    #[test]
    fn test_object_with_extra_fields_is_not_an_envelope() {
        let value = serde_json::json!({"version": 1, "data": 3, "other": true});
        let (version, data) = split_envelope(value.clone());
        assert_eq!(version, LEGACY_SCHEMA_VERSION);
        assert_eq!(data, value);
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.save_raw("../escape", "1"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_json_file_store_atomic_save() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut store = JsonFileStore::new(temp_dir.path().join("saves"));
        let plots = vec![Plot::empty(melon_common::PlotId::new(0))];
        store.save(keys::PLOTS, &plots).expect("save");

        assert!(store.dir().join("plots.json").exists());
        assert!(!store.dir().join("plots.json.tmp").exists());
        let loaded: Vec<Plot> = store.load(keys::PLOTS);
        assert_eq!(loaded, plots);

        let reopened = JsonFileStore::new(store.dir());
        let loaded: Vec<Plot> = reopened.load(keys::PLOTS);
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_store_error_converts_to_farm_error() {
        let err: FarmError = StoreError::VersionMismatch {
            expected: 1,
            found: 3,
        }
        .into();
        assert!(matches!(err, FarmError::VersionMismatch { actual: 3, .. }));
    }
}
