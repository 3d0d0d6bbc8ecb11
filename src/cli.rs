//! Command-line interface parsing for the weather dashboard
//!
//! This module handles parsing of CLI arguments using clap and turning them
//! into a `DashboardConfig`.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::cache::CachePolicy;
use crate::config::DashboardConfig;

/// Error types for CLI argument handling
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    /// No API key on the command line or in the environment
    #[error("Missing API key: pass --api-key or set OPENWEATHER_API_KEY")]
    MissingApiKey,

    /// A --city value was blank
    #[error("Invalid city: city names must not be blank")]
    EmptyCity,

    /// The refresh interval was zero
    #[error("Invalid interval: the refresh interval must be at least 1 second")]
    InvalidInterval,
}

/// Weather dashboard - live conditions for tracked cities plus a search
#[derive(Parser, Debug)]
#[command(name = "weatherdash")]
#[command(about = "Live weather dashboard with a world map")]
#[command(version)]
pub struct Cli {
    /// OpenWeatherMap API key
    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Track this city instead of the default list (repeatable)
    ///
    /// Examples:
    ///   weatherdash --city Paris --city Berlin
    #[arg(long = "city", value_name = "NAME")]
    pub cities: Vec<String>,

    /// Search for this city on startup
    #[arg(long, value_name = "NAME")]
    pub search: Option<String>,

    /// Seconds between automatic refreshes
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Re-fetch cached cities older than this many seconds
    /// (default: cached cities are never re-fetched)
    #[arg(long, value_name = "SECS")]
    pub cache_ttl: Option<u64>,

    /// Where to write the map (default: weather_map.html in the temp directory)
    #[arg(long, value_name = "PATH")]
    pub map_path: Option<PathBuf>,

    /// Write the map but do not open it in a browser
    #[arg(long)]
    pub no_browser: bool,

    /// Alternative API root
    #[arg(long, value_name = "URL", hide = true)]
    pub base_url: Option<String>,
}

impl DashboardConfig {
    /// Creates a DashboardConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(DashboardConfig)` with defaults for everything not given
    /// * `Err(CliError)` if the key is missing or an argument is invalid
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let api_key = cli
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(CliError::MissingApiKey)?;

        let mut config = DashboardConfig::new(api_key);

        if !cli.cities.is_empty() {
            if cli.cities.iter().any(|c| c.trim().is_empty()) {
                return Err(CliError::EmptyCity);
            }
            config.tracked_cities = cli.cities.iter().map(|c| c.trim().to_string()).collect();
        }
        if let Some(search) = &cli.search {
            config.initial_search = search.trim().to_string();
        }
        match cli.interval {
            Some(0) => return Err(CliError::InvalidInterval),
            Some(secs) => config.refresh_interval = Duration::from_secs(secs),
            None => {}
        }
        if let Some(secs) = cli.cache_ttl {
            config.cache_policy = CachePolicy::Ttl(Duration::from_secs(secs));
        }
        if let Some(path) = &cli.map_path {
            config.map_path = path.clone();
        }
        if let Some(url) = &cli.base_url {
            config.base_url = url.clone();
        }
        config.open_browser = !cli.no_browser;

        Ok(config)
    }
}
