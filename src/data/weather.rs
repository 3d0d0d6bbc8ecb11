//! OpenWeatherMap API client
//!
//! This module provides functionality to fetch current conditions and the
//! 5-day/3-hour forecast for a city name from the OpenWeatherMap API and parse
//! them into our data structures.

use std::time::Duration;

use chrono::NaiveDateTime;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use super::{ForecastEntry, WeatherRecord};

/// Base URL for the OpenWeatherMap API
pub const OPENWEATHER_BASE_URL: &str = "http://api.openweathermap.org/data/2.5";

/// Per-request timeout for every outbound call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Unit system requested from the API
const UNITS: &str = "metric";

/// Format of `list[*].dt_txt` in forecast responses
const FORECAST_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors that can occur when fetching weather data
///
/// Callers currently treat every kind the same way (the city is omitted from
/// the cycle), but the kinds are kept apart so they can be told apart later.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request did not complete within the timeout
    #[error("request timed out")]
    Timeout,

    /// The API answered with a non-success status
    #[error("unexpected HTTP status: {0}")]
    Status(u16),

    /// The response body could not be parsed
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The API could not be reached at all
    #[error("network unreachable: {0}")]
    Unreachable(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() {
            FetchError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Unreachable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Malformed(err.to_string())
    }
}

/// Client for fetching weather data from the OpenWeatherMap API
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl WeatherClient {
    /// Create a new WeatherClient with the default endpoint and a 10 second timeout
    pub fn new(api_key: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;
        Ok(Self::with_client(client, api_key))
    }

    /// Create a new WeatherClient with a custom HTTP client
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: OPENWEATHER_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API root (e.g. a mock server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns the API root this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch current conditions for a city
    ///
    /// Only HTTP 200 counts as success. The returned record carries the city
    /// name exactly as queried.
    pub async fn fetch_current(&self, city: &str) -> Result<WeatherRecord, FetchError> {
        let response = self.get("weather", city).await?;
        if response.status() != StatusCode::OK {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        let text = response.text().await?;
        parse_current(city, &text)
    }

    /// Fetch the 5-day/3-hour forecast for a city
    ///
    /// Any 2xx status counts as success. Entries are returned in API order.
    pub async fn fetch_forecast(&self, city: &str) -> Result<Vec<ForecastEntry>, FetchError> {
        let response = self.get("forecast", city).await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        let text = response.text().await?;
        parse_forecast(&text)
    }

    async fn get(&self, resource: &str, city: &str) -> Result<Response, FetchError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), resource);
        let response = self
            .client
            .get(&url)
            .query(&[("q", city), ("appid", self.api_key.as_str()), ("units", UNITS)])
            .send()
            .await?;
        Ok(response)
    }
}

/// Parse a current-conditions response body into a WeatherRecord
fn parse_current(city: &str, body: &str) -> Result<WeatherRecord, FetchError> {
    let response: CurrentResponse = serde_json::from_str(body)?;
    let condition = response
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::Malformed("weather[0] missing".to_string()))?;

    Ok(WeatherRecord {
        city: city.to_string(),
        temperature: response.main.temp,
        humidity: response.main.humidity,
        conditions: condition.description,
        latitude: response.coord.lat,
        longitude: response.coord.lon,
    })
}

/// Parse a forecast response body into forecast entries
fn parse_forecast(body: &str) -> Result<Vec<ForecastEntry>, FetchError> {
    let response: ForecastResponse = serde_json::from_str(body)?;

    response
        .list
        .into_iter()
        .map(|item| {
            let time = NaiveDateTime::parse_from_str(&item.dt_txt, FORECAST_TIME_FORMAT)
                .map_err(|_| FetchError::Malformed(format!("invalid dt_txt: {}", item.dt_txt)))?;
            let condition = item
                .weather
                .into_iter()
                .next()
                .ok_or_else(|| FetchError::Malformed("forecast weather[0] missing".to_string()))?;
            Ok(ForecastEntry {
                time,
                temperature: item.main.temp,
                conditions: condition.description,
            })
        })
        .collect()
}

/// Current conditions response from OpenWeatherMap
#[derive(Debug, Deserialize)]
struct CurrentResponse {
    main: CurrentMain,
    weather: Vec<Condition>,
    coord: Coord,
}

#[derive(Debug, Deserialize)]
struct CurrentMain {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Coord {
    lat: f64,
    lon: f64,
}

/// Forecast response from OpenWeatherMap
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastItem>,
}

#[derive(Debug, Deserialize)]
struct ForecastItem {
    dt_txt: String,
    main: ForecastMain,
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct ForecastMain {
    temp: f64,
}
