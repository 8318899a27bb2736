//! Host configuration.
//!
//! Loaded from `melon.toml`. A missing or unreadable file falls back to
//! defaults; the host never refuses to start over configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "melon.toml";

/// Errors writing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML serialization error
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Host configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FarmConfig {
    /// Directory holding one JSON file per store key
    pub save_dir: PathBuf,
    /// Default tracing filter directive
    pub log_filter: String,
    /// Emit JSON log lines instead of text
    pub log_json: bool,
    /// RNG seed (None = seeded from entropy)
    pub rng_seed: Option<u64>,
    /// Seconds between growth ticks
    pub tick_interval_secs: u64,
    /// Plots a new farm starts with
    pub starting_plots: usize,
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("saves"),
            log_filter: "melon=info".to_string(),
            log_json: false,
            rng_seed: None,
            tick_interval_secs: 60,
            starting_plots: 4,
        }
    }
}

impl FarmConfig {
    /// Load configuration from `melon.toml` in the working directory.
    pub fn load() -> Self {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let mut contents = String::new();
        if let Err(e) = fs::File::open(path).and_then(|mut f| f.read_to_string(&mut contents)) {
            warn!("Failed to read config file: {e}");
            return Self::default();
        }

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                info!("Loaded config from {}", path.display());
                config.validate();
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_interval_secs = self.tick_interval_secs.clamp(1, 3600);
        self.starting_plots = self.starting_plots.clamp(1, 10);
        if self.log_filter.trim().is_empty() {
            self.log_filter = Self::default().log_filter;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = FarmConfig::default();
        assert_eq!(config.tick_interval_secs, 60);
        assert_eq!(config.starting_plots, 4);
        assert_eq!(config.rng_seed, None);
    }

    #[test]
    fn test_config_validation() {
        let mut config = FarmConfig {
            tick_interval_secs: 0,
            starting_plots: 50,
            log_filter: "  ".to_string(),
            ..FarmConfig::default()
        };
        config.validate();
        assert_eq!(config.tick_interval_secs, 1);
        assert_eq!(config.starting_plots, 10);
        assert_eq!(config.log_filter, "melon=info");
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join(CONFIG_FILE);

        let config = FarmConfig {
            rng_seed: Some(12345),
            starting_plots: 6,
            ..FarmConfig::default()
        };
        config.save_to(&config_path).expect("Failed to save config");

        let loaded = FarmConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_or_invalid() {
        let config = FarmConfig::load_from("/nonexistent/path/melon.toml");
        assert_eq!(config, FarmConfig::default());

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&path, "starting_plots = \"many\"").expect("write");
        assert_eq!(FarmConfig::load_from(&path), FarmConfig::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: FarmConfig = toml::from_str("rng_seed = 7").expect("parse");
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.tick_interval_secs, 60);
    }

    proptest! {
        #[test]
        fn test_validate_always_in_range(tick in 0u64..100_000, plots in 0usize..1000) {
            let mut config = FarmConfig {
                tick_interval_secs: tick,
                starting_plots: plots,
                ..FarmConfig::default()
            };
            config.validate();
            prop_assert!((1..=3600).contains(&config.tick_interval_secs));
            prop_assert!((1..=10).contains(&config.starting_plots));
        }
    }
}
