//! Refresh cycle and background scheduler
//!
//! A refresh cycle resolves the set of cities to show, fetches all of them
//! concurrently through the cache, renders their text blocks in a stable
//! order, regenerates the map artifact and hands it to a viewer. The
//! scheduler runs one cycle at startup, one per periodic tick and one per
//! manual request, and reports results over a tokio channel so the UI has a
//! single update path.

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::WeatherCache;
use crate::config::{DashboardConfig, DEFAULT_FORECAST_INTERVALS, DEFAULT_REFRESH_INTERVAL};
use crate::data::{FetchError, ForecastEntry, WeatherClient, WeatherRecord};
use crate::map::{MapArtifact, MapRenderer};

/// Ordered, de-duplicated list of cities for one cycle
///
/// Tracked cities come first in their configured order. A non-blank search
/// value is appended unless it already names a tracked city (compared
/// ASCII-case-insensitively), in which case the tracked spelling is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitySet {
    cities: Vec<String>,
    searched: Option<String>,
}

impl CitySet {
    /// Builds the city set from the tracked list and the raw search value
    pub fn resolve(tracked: &[String], search: &str) -> Self {
        let mut cities: Vec<String> = Vec::with_capacity(tracked.len() + 1);
        for city in tracked {
            let city = city.trim();
            if !city.is_empty() && !cities.iter().any(|c| c.eq_ignore_ascii_case(city)) {
                cities.push(city.to_string());
            }
        }

        let search = search.trim();
        let searched = if search.is_empty() {
            None
        } else if let Some(existing) = cities.iter().find(|c| c.eq_ignore_ascii_case(search)) {
            Some(existing.clone())
        } else {
            cities.push(search.to_string());
            Some(search.to_string())
        };

        Self { cities, searched }
    }

    /// Cities in display order
    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    /// The searched city, if the search value was non-blank
    pub fn searched(&self) -> Option<&str> {
        self.searched.as_deref()
    }

    /// Returns true if `city` is the searched city
    pub fn is_searched(&self, city: &str) -> bool {
        self.searched.as_deref() == Some(city)
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

/// Short-range forecast for the searched city
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastBlock {
    pub city: String,
    pub entries: Vec<ForecastEntry>,
}

impl ForecastBlock {
    /// Header line followed by one line per entry and a blank line
    pub fn text_block(&self) -> String {
        let mut text = format!("\u{1F4C5} 24-Hour Forecast for {}:\n", self.city);
        for entry in &self.entries {
            text.push_str(&entry.text_line());
        }
        text.push('\n');
        text
    }
}

/// Everything one cycle produced
#[derive(Debug, Clone)]
pub struct RefreshResult {
    /// Successfully fetched records, in city-set order
    pub records: Vec<WeatherRecord>,
    /// One text block per record, same order as `records`
    pub blocks: Vec<String>,
    /// Forecast for the searched city, if it succeeded
    pub forecast: Option<ForecastBlock>,
    /// The map written this cycle; `None` if writing it failed
    pub map: Option<MapArtifact>,
    /// Wall-clock time the cycle finished
    pub completed_at: DateTime<Local>,
}

impl RefreshResult {
    /// Full output text: each city block, with the forecast right after the searched city
    pub fn text(&self) -> String {
        let mut text = String::new();
        for (record, block) in self.records.iter().zip(&self.blocks) {
            text.push_str(block);
            if let Some(forecast) = self.forecast.as_ref().filter(|f| f.city == record.city) {
                text.push_str(&forecast.text_block());
            }
        }
        text
    }

    /// Status line, e.g. `Updated: 14:05:09`
    pub fn status_line(&self) -> String {
        format!("Updated: {}", self.completed_at.format("%H:%M:%S"))
    }
}

/// Something that can display a freshly written map
pub trait MapViewer: Send + Sync {
    fn show(&self, artifact: &MapArtifact) -> std::io::Result<()>;
}

/// Opens the map in the system's default browser
#[derive(Debug, Default)]
pub struct BrowserViewer;

impl MapViewer for BrowserViewer {
    fn show(&self, artifact: &MapArtifact) -> std::io::Result<()> {
        if !has_graphical_display(|name| std::env::var_os(name)) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "no graphical display to open the map in",
            ));
        }
        webbrowser::open(&artifact.file_url())
    }
}

/// A text-mode browser would take over the dashboard's terminal, so on
/// X11/Wayland platforms a browser is only launched inside a desktop session.
fn has_graphical_display(var: impl Fn(&str) -> Option<OsString>) -> bool {
    if cfg!(any(target_os = "macos", target_os = "windows")) {
        return true;
    }
    ["DISPLAY", "WAYLAND_DISPLAY"]
        .iter()
        .any(|name| var(name).is_some_and(|value| !value.is_empty()))
}

/// Leaves the map on disk without opening it
#[derive(Debug, Default)]
pub struct NoopViewer;

impl MapViewer for NoopViewer {
    fn show(&self, _artifact: &MapArtifact) -> std::io::Result<()> {
        Ok(())
    }
}

/// One fetch-all, render, map, display pass
#[derive(Clone)]
pub struct RefreshCycle {
    client: WeatherClient,
    cache: WeatherCache,
    renderer: MapRenderer,
    viewer: Arc<dyn MapViewer>,
    tracked: Vec<String>,
    forecast_intervals: usize,
}

impl RefreshCycle {
    /// Creates a cycle that does not open the map anywhere
    pub fn new(
        client: WeatherClient,
        cache: WeatherCache,
        renderer: MapRenderer,
        tracked: Vec<String>,
    ) -> Self {
        Self {
            client,
            cache,
            renderer,
            viewer: Arc::new(NoopViewer),
            tracked,
            forecast_intervals: DEFAULT_FORECAST_INTERVALS,
        }
    }

    /// Builds a cycle from the dashboard configuration
    pub fn from_config(config: &DashboardConfig) -> Result<Self, FetchError> {
        let client = WeatherClient::new(config.api_key.clone())?.with_base_url(&config.base_url);
        let viewer: Arc<dyn MapViewer> = if config.open_browser {
            Arc::new(BrowserViewer)
        } else {
            Arc::new(NoopViewer)
        };

        Ok(Self::new(
            client,
            WeatherCache::new(config.cache_policy),
            MapRenderer::new(config.map_path.clone()),
            config.tracked_cities.clone(),
        )
        .with_viewer(viewer)
        .with_forecast_intervals(config.forecast_intervals))
    }

    /// Replace the map viewer
    pub fn with_viewer(mut self, viewer: Arc<dyn MapViewer>) -> Self {
        self.viewer = viewer;
        self
    }

    /// Limit the number of forecast entries rendered for the searched city
    pub fn with_forecast_intervals(mut self, intervals: usize) -> Self {
        self.forecast_intervals = intervals;
        self
    }

    /// The cache shared by every run of this cycle
    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }

    /// Resolves the city set for the given search value
    pub fn city_set(&self, search: &str) -> CitySet {
        CitySet::resolve(&self.tracked, search)
    }

    /// Runs one cycle
    ///
    /// Never fails: cities whose fetch failed are left out, and a map that
    /// cannot be written or opened is logged and reported as `map: None`.
    pub async fn run(&self, cities: &CitySet) -> RefreshResult {
        info!(
            cities = cities.len(),
            searched = cities.searched().unwrap_or(""),
            "refresh cycle started"
        );

        let fetches = cities
            .cities()
            .iter()
            .map(|city| self.cache.get_or_fetch(&self.client, city));
        let outcomes = join_all(fetches).await;

        let mut records = Vec::new();
        let mut blocks = Vec::new();
        let mut forecast = None;
        for (city, outcome) in cities.cities().iter().zip(outcomes) {
            let Some(record) = outcome else {
                continue;
            };
            blocks.push(record.text_block());
            if cities.is_searched(city) {
                forecast = self.fetch_forecast(city).await;
            }
            records.push(record);
        }

        let map = match self.renderer.render(&records) {
            Ok(artifact) => {
                // Viewers may block (browser launch), keep them off the runtime
                let viewer = Arc::clone(&self.viewer);
                let shown = artifact.clone();
                match tokio::task::spawn_blocking(move || viewer.show(&shown)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        warn!(error = %err, path = %artifact.path.display(), "failed to open map");
                    }
                    Err(err) => warn!(error = %err, "map viewer task failed"),
                }
                Some(artifact)
            }
            Err(err) => {
                warn!(error = %err, "failed to write map");
                None
            }
        };

        info!(
            succeeded = records.len(),
            failed = cities.len() - records.len(),
            "refresh cycle finished"
        );

        RefreshResult {
            records,
            blocks,
            forecast,
            map,
            completed_at: Local::now(),
        }
    }

    /// Uncached forecast fetch; failures and empty forecasts yield `None`
    async fn fetch_forecast(&self, city: &str) -> Option<ForecastBlock> {
        match self.client.fetch_forecast(city).await {
            Ok(mut entries) if !entries.is_empty() => {
                entries.truncate(self.forecast_intervals);
                Some(ForecastBlock {
                    city: city.to_string(),
                    entries,
                })
            }
            Ok(_) => None,
            Err(err) => {
                debug!(city, error = %err, "forecast fetch failed");
                None
            }
        }
    }
}

/// Messages sent from the background scheduler to the UI
#[derive(Debug, Clone)]
pub enum RefreshMessage {
    /// A cycle started
    RefreshStarted,
    /// A cycle finished
    RefreshCompleted(Box<RefreshResult>),
}

/// Configuration for the periodic timer
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Interval between periodic cycles
    pub interval: Duration,
    /// Whether periodic cycles run at all (startup and manual cycles always do)
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
            enabled: true,
        }
    }
}

/// Handle for controlling the background scheduler
///
/// The scheduler owns the cycle and runs at most one cycle at a time. A
/// manual request that arrives mid-cycle waits for it to finish; several
/// waiting requests collapse into one run with the latest search value.
pub struct RefreshHandle {
    /// Channel for receiving refresh messages
    pub receiver: mpsc::Receiver<RefreshMessage>,
    request_tx: mpsc::UnboundedSender<String>,
    shutdown_tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Spawns the scheduler task and starts the startup cycle immediately
    ///
    /// `initial_search` is used until the first manual request replaces it;
    /// periodic cycles reuse the most recent search value.
    pub fn spawn(cycle: RefreshCycle, config: RefreshConfig, initial_search: impl Into<String>) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(32);
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<String>();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let mut search = initial_search.into();

        tokio::spawn(async move {
            if run_and_report(&cycle, &search, &msg_tx).await.is_err() {
                return;
            }

            let period = config.interval;
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick(), if config.enabled => {
                        debug!("periodic refresh");
                    }
                    request = request_rx.recv() => {
                        let Some(value) = request else {
                            break;
                        };
                        search = value;
                        while let Ok(newer) = request_rx.try_recv() {
                            search = newer;
                        }
                        debug!(search = %search, "manual refresh");
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }

                if run_and_report(&cycle, &search, &msg_tx).await.is_err() {
                    break;
                }
            }

            debug!("refresh scheduler stopped");
        });

        Self {
            receiver: msg_rx,
            request_tx,
            shutdown_tx,
        }
    }

    /// Requests a cycle with the given search value
    pub fn request_refresh(&self, search: impl Into<String>) {
        let _ = self.request_tx.send(search.into());
    }

    /// Shuts down the scheduler after the current cycle
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Runs one cycle and reports it; fails only if the receiver is gone
async fn run_and_report(
    cycle: &RefreshCycle,
    search: &str,
    tx: &mpsc::Sender<RefreshMessage>,
) -> Result<(), mpsc::error::SendError<RefreshMessage>> {
    tx.send(RefreshMessage::RefreshStarted).await?;
    let cities = cycle.city_set(search);
    let result = cycle.run(&cities).await;
    tx.send(RefreshMessage::RefreshCompleted(Box::new(result))).await
}

/// Checks for pending refresh messages without blocking
///
/// # Returns
/// * `Some(RefreshMessage)` if a message was available
/// * `None` if no messages are pending
pub fn try_recv(handle: &mut RefreshHandle) -> Option<RefreshMessage> {
    handle.receiver.try_recv().ok()
}
