//! Cache configuration and entry types.

use crate::config::{AggregatorConfig, CacheDefaults};
use std::time::Duration;
use tokio::time::Instant;

/// Configuration for a `LoadingCache`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum age of an entry before it is reloaded.
    pub ttl: Duration,
    /// Capacity; `0` disables caching entirely.
    pub max_entries: usize,
    /// Whether a hit resets the entry's freshness clock (LRU) or only reloads do (TTL).
    pub touch_on_read: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(CacheDefaults::TTL_SECS),
            max_entries: CacheDefaults::MAX_ENTRIES,
            touch_on_read: false,
        }
    }
}

impl CacheConfig {
    /// Cache settings for the ref and tag caches of an aggregator.
    pub fn from_aggregator(config: &AggregatorConfig) -> Self {
        Self {
            ttl: config.cache_ttl(),
            max_entries: config.max_cache_entries,
            touch_on_read: config.touch_on_read,
        }
    }

    /// Same settings with a different capacity.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }
}

/// A cached value with its freshness stamp.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    /// When the value was last loaded (or read, in touch-on-read mode).
    pub last_refreshed: Instant,
    /// Refresh order, used to break timestamp ties deterministically.
    pub generation: u64,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, now: Instant, generation: u64) -> Self {
        Self {
            value,
            last_refreshed: now,
            generation,
        }
    }

    /// Whether more than `ttl` has elapsed since the last refresh.
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_refreshed) > ttl
    }

    pub fn touch(&mut self, now: Instant, generation: u64) {
        self.last_refreshed = now;
        self.generation = generation;
    }
}
