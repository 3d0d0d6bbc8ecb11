//! Read-through cache for current-conditions records
//!
//! Provides a `WeatherCache` that can be cloned cheaply and shared between the
//! concurrent per-city fetches of a refresh cycle.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::data::{WeatherClient, WeatherRecord};

/// How long a cached record is served before it is fetched again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Serve the first successful record for the lifetime of the process
    #[default]
    Forever,
    /// Treat a record as absent once it is older than the given age
    Ttl(Duration),
}

impl CachePolicy {
    fn is_fresh(&self, stored_at: Instant) -> bool {
        match self {
            CachePolicy::Forever => true,
            CachePolicy::Ttl(ttl) => stored_at.elapsed() < *ttl,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    record: WeatherRecord,
    stored_at: Instant,
}

/// Shared mapping from city name to its last fetched record
///
/// Clones share the same underlying map. No size bound and no eviction: an
/// entry that falls outside its TTL stays in the map until the next
/// successful fetch for that city overwrites it.
#[derive(Debug, Clone, Default)]
pub struct WeatherCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    policy: CachePolicy,
}

impl WeatherCache {
    /// Creates an empty cache with the given freshness policy
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            entries: Arc::default(),
            policy,
        }
    }

    /// Returns the freshness policy
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Returns the stored record for `city` if present and fresh
    pub fn get(&self, city: &str) -> Option<WeatherRecord> {
        let entries = self.entries.read();
        entries
            .get(city)
            .filter(|entry| self.policy.is_fresh(entry.stored_at))
            .map(|entry| entry.record.clone())
    }

    /// Stores `record` under `city`, replacing any previous entry
    pub fn put(&self, city: &str, record: WeatherRecord) {
        self.entries.write().insert(
            city.to_string(),
            CacheEntry {
                record,
                stored_at: Instant::now(),
            },
        );
    }

    /// Number of cities with a stored record (fresh or not)
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing has been stored yet
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Read-through lookup
    ///
    /// On a hit, returns the stored record without touching the network. On a
    /// miss, fetches current conditions and stores them if the fetch succeeds.
    /// Failures are logged at debug level and reported as `None`.
    ///
    /// The lock is never held across the fetch, so two concurrent misses for
    /// the same city both fetch and the later write wins.
    pub async fn get_or_fetch(&self, client: &WeatherClient, city: &str) -> Option<WeatherRecord> {
        if let Some(record) = self.get(city) {
            debug!(city, "cache hit");
            return Some(record);
        }

        match client.fetch_current(city).await {
            Ok(record) => {
                debug!(city, temperature = record.temperature, "fetched current conditions");
                self.put(city, record.clone());
                Some(record)
            }
            Err(err) => {
                debug!(city, error = %err, "fetch failed");
                None
            }
        }
    }
}
