//! Geographic map artifact
//!
//! Renders weather records as a Plotly `scattergeo` figure inside a single
//! HTML document and writes it to a fixed path. The file is replaced
//! atomically: the document is written to a temporary file in the same
//! directory and then renamed over the target, so a reader never observes a
//! half-written map.

use reqwest::Url;
use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::data::WeatherRecord;

/// File name of the map artifact inside the temp directory
pub const MAP_FILE_NAME: &str = "weather_map.html";

/// Figure title
pub const MAP_TITLE: &str = "Live Weather Dashboard";

/// Plotly bundle loaded by the generated document
const PLOTLY_JS_URL: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Marker diameter range in pixels; temperatures are scaled into it
const MIN_MARKER_SIZE: f64 = 8.0;
const MAX_MARKER_SIZE: f64 = 30.0;

/// Errors that can occur while producing the map artifact
#[derive(Debug, Error)]
pub enum MapError {
    /// Creating, writing or renaming the file failed
    #[error("failed to write map artifact: {0}")]
    Io(#[from] std::io::Error),

    /// The figure could not be encoded
    #[error("failed to encode map figure: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A written map document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapArtifact {
    /// Where the document was written
    pub path: PathBuf,
    /// Number of plotted cities
    pub point_count: usize,
}

impl MapArtifact {
    /// Local file URL suitable for a browser
    ///
    /// Relative paths are resolved against the working directory, and
    /// characters such as spaces and `#` are percent-encoded.
    pub fn file_url(&self) -> String {
        let absolute = if self.path.is_absolute() {
            self.path.clone()
        } else {
            std::env::current_dir()
                .map(|dir| dir.join(&self.path))
                .unwrap_or_else(|_| self.path.clone())
        };
        Url::from_file_path(&absolute)
            .map(String::from)
            .unwrap_or_else(|()| format!("file://{}", absolute.display()))
    }
}

/// Writes weather maps to a fixed path
#[derive(Debug, Clone)]
pub struct MapRenderer {
    path: PathBuf,
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

impl MapRenderer {
    /// Creates a renderer that writes to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<system temp dir>/weather_map.html`
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join(MAP_FILE_NAME)
    }

    /// Target path of the artifact
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renders `records` and replaces the artifact on disk
    ///
    /// An empty slice still produces a valid document with an empty map.
    pub fn render(&self, records: &[WeatherRecord]) -> Result<MapArtifact, MapError> {
        let html = render_html(&figure(records))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(html.as_bytes())?;
        file.flush()?;
        file.persist(&self.path).map_err(|e| e.error)?;

        Ok(MapArtifact {
            path: self.path.clone(),
            point_count: records.len(),
        })
    }
}

/// Builds the Plotly figure (data + layout) for the given records
pub fn figure(records: &[WeatherRecord]) -> Value {
    let temperatures: Vec<f64> = records.iter().map(|r| r.temperature).collect();
    let sizes = marker_sizes(&temperatures);
    let hover: Vec<Value> = records
        .iter()
        .map(|r| json!([r.temperature, r.humidity, r.conditions]))
        .collect();

    json!({
        "data": [{
            "type": "scattergeo",
            "mode": "markers",
            "lat": records.iter().map(|r| r.latitude).collect::<Vec<_>>(),
            "lon": records.iter().map(|r| r.longitude).collect::<Vec<_>>(),
            "text": records.iter().map(|r| r.city.as_str()).collect::<Vec<_>>(),
            "customdata": hover,
            "hovertemplate": "<b>%{text}</b><br>%{customdata[0]}°C, %{customdata[1]}% humidity<br>%{customdata[2]}<extra></extra>",
            "marker": {
                "size": sizes,
                "color": temperatures,
                "colorscale": "Plasma",
                "showscale": true,
                "colorbar": {"title": {"text": "°C"}},
                "line": {"width": 0.5, "color": "#333333"}
            }
        }],
        "layout": {
            "title": {"text": MAP_TITLE},
            "geo": {
                "projection": {"type": "natural earth"},
                "showcountries": true
            },
            "margin": {"l": 0, "r": 0, "t": 48, "b": 0}
        }
    })
}

/// Scales temperatures linearly into the marker size range
///
/// Plotly rejects negative sizes, so raw temperatures cannot be used directly.
/// When every temperature is equal, all markers get the midpoint size.
fn marker_sizes(temperatures: &[f64]) -> Vec<f64> {
    let min = temperatures.iter().copied().fold(f64::INFINITY, f64::min);
    let max = temperatures.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    temperatures
        .iter()
        .map(|t| {
            if range > f64::EPSILON {
                MIN_MARKER_SIZE + (t - min) / range * (MAX_MARKER_SIZE - MIN_MARKER_SIZE)
            } else {
                (MIN_MARKER_SIZE + MAX_MARKER_SIZE) / 2.0
            }
        })
        .collect()
}

/// Wraps a figure in a standalone HTML page
fn render_html(figure: &Value) -> Result<String, MapError> {
    // "</" inside a script element would end it early (e.g. a city named "</script>")
    let figure_json = serde_json::to_string(figure)?.replace("</", "<\\/");

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{plotly}"></script>
<style>html, body, #map {{ width: 100%; height: 100%; margin: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
const figure = {figure};
Plotly.newPlot("map", figure.data, figure.layout, {{responsive: true}});
</script>
</body>
</html>
"#,
        title = MAP_TITLE,
        plotly = PLOTLY_JS_URL,
        figure = figure_json,
    ))
}
