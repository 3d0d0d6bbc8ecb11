//! Weather dashboard - live conditions for tracked cities
//!
//! A terminal UI application that refreshes current weather for a fixed list
//! of cities plus a searched city every few minutes and opens a world map of
//! the results in the browser.

use std::fs::{self, OpenOptions};
use std::io;
use std::panic;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use directories::ProjectDirs;
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use weatherdash::app::{App, AppCommand};
use weatherdash::cli::Cli;
use weatherdash::config::DashboardConfig;
use weatherdash::refresh::{try_recv, RefreshConfig, RefreshCycle, RefreshHandle};
use weatherdash::ui;

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// This ensures the terminal is usable even if the application panics.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Attempt to restore the terminal
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        // Call the original panic hook
        original_hook(panic_info);
    }));
}

/// Directory for the log file: XDG cache dir, or the temp dir without a home
fn log_dir() -> PathBuf {
    ProjectDirs::from("", "", "weatherdash")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(std::env::temp_dir)
}

/// Sends tracing output to a log file, since the terminal belongs to the UI.
/// Logging is skipped if the file cannot be opened.
fn init_tracing() -> Option<PathBuf> {
    let dir = log_dir();
    fs::create_dir_all(&dir).ok()?;
    let path = dir.join("weatherdash.log");
    let file = OpenOptions::new().create(true).append(true).open(&path).ok()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .ok()?;

    Some(path)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match DashboardConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(2);
        }
    };

    if let Some(path) = init_tracing() {
        tracing::info!(log = %path.display(), "Starting weatherdash v{}", env!("CARGO_PKG_VERSION"));
    }

    let cycle = RefreshCycle::from_config(&config)?;
    tracing::info!(
        cities = config.tracked_cities.len(),
        interval_secs = config.refresh_interval.as_secs(),
        cache_policy = ?cycle.cache().policy(),
        "dashboard configured"
    );
    let refresh_config = RefreshConfig {
        interval: config.refresh_interval,
        enabled: true,
    };

    // Set up panic hook to restore terminal on crash
    setup_panic_hook();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config.initial_search.clone());

    // Starts the startup cycle immediately
    let mut handle = RefreshHandle::spawn(cycle, refresh_config, config.initial_search.clone());

    // Main event loop
    loop {
        while let Some(message) = try_recv(&mut handle) {
            app.apply(message);
        }

        terminal.draw(|f| ui::render_dashboard(f, &app))?;

        // Poll for keyboard events with 100ms timeout
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if let Some(AppCommand::Refresh(search)) = app.handle_key(key) {
                    handle.request_refresh(search);
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    handle.shutdown().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    tracing::info!("weatherdash stopped");
    Ok(())
}
