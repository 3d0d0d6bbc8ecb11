//! In-memory cache of current conditions
//!
//! This module provides a process-lifetime cache keyed by city name. Entries
//! are never evicted; under the default policy they are also never considered
//! stale, so a city is fetched at most once per process. A TTL policy is
//! available for dashboards that want the displayed conditions to move.

mod memory;

pub use memory::{CachePolicy, WeatherCache};
