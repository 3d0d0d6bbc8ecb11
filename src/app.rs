//! Application state management for the weather dashboard
//!
//! This module contains the dashboard state, keyboard handling and the single
//! place where refresh results are applied to what the user sees.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::path::PathBuf;

use crate::refresh::RefreshMessage;

/// Application state enum representing the current view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Waiting for the first refresh cycle to finish
    Loading,
    /// Showing the results of at least one cycle
    Dashboard,
}

/// Actions the event loop must perform on behalf of the app
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Run a refresh cycle with this search value
    Refresh(String),
}

/// Main application struct managing state and data
pub struct App {
    /// Current application state/view
    pub state: AppState,
    /// Contents of the search field
    pub search: String,
    /// Output pane text, one entry per line
    pub output: Vec<String>,
    /// Status line text
    pub status: String,
    /// Whether a cycle is in flight
    pub refreshing: bool,
    /// Path of the most recently written map
    pub map_path: Option<PathBuf>,
    /// Scroll offset of the output pane
    pub scroll_offset: u16,
    /// Flag to show help overlay
    pub show_help: bool,
    /// Flag indicating the application should quit
    pub should_quit: bool,
}

impl App {
    /// Creates a new App with the given initial search value
    pub fn new(initial_search: impl Into<String>) -> Self {
        Self {
            state: AppState::Loading,
            search: initial_search.into(),
            output: Vec::new(),
            status: "Ready".to_string(),
            refreshing: false,
            map_path: None,
            scroll_offset: 0,
            show_help: false,
            should_quit: false,
        }
    }

    /// Handles keyboard input and updates state accordingly
    ///
    /// # Key Bindings
    /// - Printable characters / `Backspace`: Edit the search field
    /// - `Enter`: Search and refresh
    /// - `F5`: Refresh with the current search value
    /// - `Up`/`Down`/`PageUp`/`PageDown`/`Home`/`End`: Scroll output
    /// - `F1`: Toggle help
    /// - `Esc` / `Ctrl-C`: Quit (Esc closes help first)
    pub fn handle_key(&mut self, key_event: KeyEvent) -> Option<AppCommand> {
        if key_event.kind == KeyEventKind::Release {
            return None;
        }

        if key_event.modifiers.contains(KeyModifiers::CONTROL)
            && key_event.code == KeyCode::Char('c')
        {
            self.should_quit = true;
            return None;
        }

        // Help overlay intercepts all keys when shown
        if self.show_help {
            if matches!(key_event.code, KeyCode::Esc | KeyCode::F(1)) {
                self.show_help = false;
            }
            return None;
        }

        match key_event.code {
            KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::F(1) => {
                self.show_help = true;
            }
            KeyCode::Enter | KeyCode::F(5) => {
                return Some(AppCommand::Refresh(self.search.trim().to_string()));
            }
            KeyCode::Backspace => {
                self.search.pop();
            }
            KeyCode::Char(c) if !key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                self.search.push(c);
            }
            KeyCode::Up => self.scroll_up(1),
            KeyCode::Down => self.scroll_down(1),
            KeyCode::PageUp => self.scroll_up(10),
            KeyCode::PageDown => self.scroll_down(10),
            KeyCode::Home => self.scroll_to_top(),
            KeyCode::End => self.scroll_to_bottom(),
            _ => {}
        }
        None
    }

    /// Applies a message from the background scheduler
    pub fn apply(&mut self, message: RefreshMessage) {
        match message {
            RefreshMessage::RefreshStarted => {
                self.refreshing = true;
                self.status = "Refreshing...".to_string();
            }
            RefreshMessage::RefreshCompleted(result) => {
                self.refreshing = false;
                self.output = result.text().lines().map(str::to_string).collect();
                self.status = result.status_line();
                self.map_path = result.map.as_ref().map(|m| m.path.clone());
                self.state = AppState::Dashboard;
                self.scroll_offset = self.scroll_offset.min(self.max_scroll());
            }
        }
    }

    fn max_scroll(&self) -> u16 {
        u16::try_from(self.output.len().saturating_sub(1)).unwrap_or(u16::MAX)
    }

    /// Scrolls the output up, stopping at 0
    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    /// Scrolls the output down, stopping at the last line
    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines).min(self.max_scroll());
    }

    /// Scrolls to the top of the output
    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
    }

    /// Scrolls so the last line is at the top of the pane
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.max_scroll();
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::WeatherRecord;
    use crate::map::MapArtifact;
    use crate::refresh::RefreshResult;
    use chrono::Local;

    /// Helper to create a KeyEvent for testing
    fn key_event(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn result_with(cities: &[&str]) -> RefreshResult {
        let records: Vec<WeatherRecord> = cities
            .iter()
            .map(|c| WeatherRecord {
                city: c.to_string(),
                temperature: 12.0,
                humidity: 40,
                conditions: "clear sky".to_string(),
                latitude: 0.0,
                longitude: 0.0,
            })
            .collect();
        let blocks = records.iter().map(|r| r.text_block()).collect();
        RefreshResult {
            records,
            blocks,
            forecast: None,
            map: Some(MapArtifact {
                path: PathBuf::from("/tmp/weather_map.html"),
                point_count: cities.len(),
            }),
            completed_at: Local::now(),
        }
    }

    #[test]
    fn test_initial_state_is_loading() {
        let app = App::default();
        assert_eq!(app.state, AppState::Loading);
        assert_eq!(app.status, "Ready");
        assert!(app.output.is_empty());
    }

    #[test]
    fn test_typing_edits_search() {
        let mut app = App::default();
        for c in "Pariss".chars() {
            app.handle_key(key_event(KeyCode::Char(c)));
        }
        app.handle_key(key_event(KeyCode::Backspace));
        assert_eq!(app.search, "Paris");
    }

    #[test]
    fn test_q_is_typed_not_quit() {
        let mut app = App::default();
        app.handle_key(key_event(KeyCode::Char('q')));
        assert!(!app.should_quit);
        assert_eq!(app.search, "q");
    }

    #[test]
    fn test_enter_requests_refresh_with_trimmed_search() {
        let mut app = App::new("  Oslo ");
        let command = app.handle_key(key_event(KeyCode::Enter));
        assert_eq!(command, Some(AppCommand::Refresh("Oslo".to_string())));
    }

    #[test]
    fn test_f5_requests_refresh() {
        let mut app = App::default();
        let command = app.handle_key(key_event(KeyCode::F(5)));
        assert_eq!(command, Some(AppCommand::Refresh(String::new())));
    }

    #[test]
    fn test_esc_quits() {
        let mut app = App::default();
        app.handle_key(key_event(KeyCode::Esc));
        assert!(app.should_quit);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut app = App::default();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
        assert!(app.search.is_empty());
    }

    #[test]
    fn test_help_toggle_and_esc_closes_help_first() {
        let mut app = App::default();
        app.handle_key(key_event(KeyCode::F(1)));
        assert!(app.show_help);

        // Keys are swallowed while help is shown
        app.handle_key(key_event(KeyCode::Char('x')));
        assert!(app.search.is_empty());

        app.handle_key(key_event(KeyCode::Esc));
        assert!(!app.show_help);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_refresh_started_sets_status() {
        let mut app = App::default();
        app.apply(RefreshMessage::RefreshStarted);
        assert!(app.refreshing);
        assert_eq!(app.status, "Refreshing...");
    }

    #[test]
    fn test_refresh_completed_updates_output() {
        let mut app = App::default();
        app.apply(RefreshMessage::RefreshStarted);
        app.apply(RefreshMessage::RefreshCompleted(Box::new(result_with(&[
            "London", "Tokyo",
        ]))));

        assert_eq!(app.state, AppState::Dashboard);
        assert!(!app.refreshing);
        assert!(app.status.starts_with("Updated: "));
        assert_eq!(app.map_path, Some(PathBuf::from("/tmp/weather_map.html")));
        assert!(app.output[0].contains("London"));
        assert!(app.output.iter().any(|l| l.contains("Tokyo")));
    }

    #[test]
    fn test_completed_with_no_records_clears_output() {
        let mut app = App::default();
        app.apply(RefreshMessage::RefreshCompleted(Box::new(result_with(&["London"]))));
        app.apply(RefreshMessage::RefreshCompleted(Box::new(result_with(&[]))));
        assert!(app.output.is_empty());
        assert_eq!(app.state, AppState::Dashboard);
    }

    #[test]
    fn test_scroll_bounds() {
        let mut app = App::default();
        app.apply(RefreshMessage::RefreshCompleted(Box::new(result_with(&[
            "London", "Tokyo",
        ]))));
        let last = (app.output.len() - 1) as u16;

        app.scroll_up(1);
        assert_eq!(app.scroll_offset, 0);

        app.handle_key(key_event(KeyCode::PageDown));
        app.handle_key(key_event(KeyCode::PageDown));
        assert_eq!(app.scroll_offset, last);

        app.handle_key(key_event(KeyCode::Home));
        assert_eq!(app.scroll_offset, 0);

        app.handle_key(key_event(KeyCode::End));
        assert_eq!(app.scroll_offset, last);
    }

    #[test]
    fn test_scroll_clamped_when_output_shrinks() {
        let mut app = App::default();
        app.apply(RefreshMessage::RefreshCompleted(Box::new(result_with(&[
            "London", "Tokyo", "Sydney",
        ]))));
        app.scroll_to_bottom();
        app.apply(RefreshMessage::RefreshCompleted(Box::new(result_with(&["London"]))));
        assert_eq!(app.scroll_offset, (app.output.len() - 1) as u16);
    }
}
