//! # Melon
//!
//! Runs one resume pass over the saved farm (offline catch-up, weather,
//! creatures), then optionally a number of timed growth ticks.
//!
//! Usage: `melon [CONFIG] [--ticks N]`

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use melon_common::{FastRng, RandomSource, MS_PER_MINUTE};
use melon_engine::{FarmConfig, FarmHost, JsonFileStore, KeyValueStore, CONFIG_FILE};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (defaults to `melon.toml`)
    config: Option<PathBuf>,

    /// Growth ticks to run after the resume pass
    #[arg(long, default_value_t = 0)]
    ticks: u32,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn init_logging(config: &FarmConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(config.log_filter.parse()?);
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
    Ok(())
}

fn run_ticks<S: KeyValueStore, R: RandomSource>(
    host: &mut FarmHost<S, R>,
    config: &FarmConfig,
    ticks: u32,
) -> Result<()> {
    let interval = Duration::from_secs(config.tick_interval_secs);
    let mut last = now_millis();

    for _ in 0..ticks {
        thread::sleep(interval);
        let now = now_millis();
        // Carry the sub-minute remainder into the next tick.
        let minutes = (now - last) / MS_PER_MINUTE;
        last += minutes * MS_PER_MINUTE;

        let outcome = host.tick(now, minutes as f64, 0.0)?;
        for toast in &outcome.mutation_toasts {
            info!("Plot {} mutated!", toast.plot_id);
        }
        for record in &outcome.stolen_records {
            warn!("A thief stole {} from plot {}", record.variety_id, record.plot_id);
        }
    }
    Ok(())
}

/// Main entry point.
fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let config = FarmConfig::load_from(&config_path);
    init_logging(&config)?;

    info!("Melon farm starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let rng = config.rng_seed.map_or_else(FastRng::new, FastRng::with_seed);
    let store = JsonFileStore::new(&config.save_dir);
    let mut host = FarmHost::with_config(store, rng, &config);

    let now = now_millis();
    let resume = host.resume(now, 0.0)?;
    if !resume.withered.is_empty() {
        warn!("{} plot(s) withered while away", resume.withered.len());
    }
    let open = host.app_open(now)?;
    if let Some(weather) = open.weather.current {
        info!("Weather: {}", weather.display_name());
    }
    info!(
        "{} plots, {} galaxies unlocked",
        host.plots().len(),
        host.unlocked_galaxies().len()
    );

    run_ticks(&mut host, &config, args.ticks)?;

    info!("Melon farm shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["melon"]).expect("parse");
        assert_eq!(args.config, None);
        assert_eq!(args.ticks, 0);
    }

    #[test]
    fn test_args_config_and_ticks() {
        let args = Args::try_parse_from(["melon", "farm.toml", "--ticks", "3"]).expect("parse");
        assert_eq!(args.config, Some(PathBuf::from("farm.toml")));
        assert_eq!(args.ticks, 3);
    }

    #[test]
    fn test_args_reject_unknown_flag() {
        assert!(Args::try_parse_from(["melon", "--tick", "3"]).is_err());
        assert!(Args::try_parse_from(["melon", "--ticks", "many"]).is_err());
    }
}
