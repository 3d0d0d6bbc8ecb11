//! Core data models for the weather dashboard
//!
//! This module contains the records produced by the weather API client and the
//! plain-text blocks the dashboard renders from them.

pub mod weather;

pub use weather::{FetchError, WeatherClient};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Current conditions for one city
///
/// Records are immutable once created. A later fetch for the same city
/// replaces the record rather than merging into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    /// City name as it was queried (also the cache key)
    pub city: String,
    /// Current temperature in Celsius
    pub temperature: f64,
    /// Relative humidity percentage (0-100)
    pub humidity: u8,
    /// Free-text condition description, e.g. "light rain"
    pub conditions: String,
    /// Latitude coordinate
    pub latitude: f64,
    /// Longitude coordinate
    pub longitude: f64,
}

/// A single three-hour forecast interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    /// Start of the interval (as reported by the API, UTC)
    pub time: NaiveDateTime,
    /// Forecast temperature in Celsius
    pub temperature: f64,
    /// Free-text condition description
    pub conditions: String,
}

impl WeatherRecord {
    /// Formats the record as the multi-line text block shown in the output pane
    pub fn text_block(&self) -> String {
        format!(
            "\u{1F321} {}:\n   Temperature: {}°C\n   Humidity: {}%\n   Conditions: {}\n\n",
            self.city,
            self.temperature,
            self.humidity,
            title_case(&self.conditions)
        )
    }
}

impl ForecastEntry {
    /// Formats the entry as a single indented line, e.g. `   Mon 15:00: 12.3°C | Light Rain`
    pub fn text_line(&self) -> String {
        format!(
            "   {}: {}°C | {}\n",
            self.time.format("%a %H:%M"),
            self.temperature,
            title_case(&self.conditions)
        )
    }
}

/// Upper-cases the first letter of every word and lower-cases the rest
///
/// Words are split on anything that is not alphabetic, so "light intensity
/// drizzle" becomes "Light Intensity Drizzle".
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}
