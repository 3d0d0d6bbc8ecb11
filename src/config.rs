//! Dashboard configuration
//!
//! All settings have compiled-in defaults except the API key; the command line
//! (see `cli`) can override them at startup.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CachePolicy;
use crate::data::weather::OPENWEATHER_BASE_URL;
use crate::map::MapRenderer;

/// Cities refreshed every cycle when none are given on the command line
pub const DEFAULT_TRACKED_CITIES: [&str; 4] = ["London", "New York", "Tokyo", "Sydney"];

/// Interval between periodic refresh cycles
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300); // 5 minutes

/// Number of three-hour forecast intervals shown for the searched city (~24h)
pub const DEFAULT_FORECAST_INTERVALS: usize = 8;

/// Complete runtime configuration
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// OpenWeatherMap API key
    pub api_key: String,
    /// API root, without the trailing resource name
    pub base_url: String,
    /// Cities refreshed every cycle, in display order
    pub tracked_cities: Vec<String>,
    /// Search value used by the first cycle
    pub initial_search: String,
    /// Interval between periodic cycles
    pub refresh_interval: Duration,
    /// Freshness policy for cached current conditions
    pub cache_policy: CachePolicy,
    /// Where the map artifact is written
    pub map_path: PathBuf,
    /// Whether each cycle opens the map in the default browser
    pub open_browser: bool,
    /// Maximum forecast entries rendered for the searched city
    pub forecast_intervals: usize,
}

impl DashboardConfig {
    /// Creates a configuration with every default except the API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENWEATHER_BASE_URL.to_string(),
            tracked_cities: DEFAULT_TRACKED_CITIES.iter().map(|c| c.to_string()).collect(),
            initial_search: String::new(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            cache_policy: CachePolicy::default(),
            map_path: MapRenderer::default_path(),
            open_browser: true,
            forecast_intervals: DEFAULT_FORECAST_INTERVALS,
        }
    }
}
