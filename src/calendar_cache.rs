// TTL cache for fetched calendars, layered over a CalendarSource so the
// adapter contract stays fetch-only. Keyed by listing and window; synthetic
// fallback data is never stored.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::availability::DateAvailability;
use crate::source::{CalendarSource, DateWindow, SourceError};

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_entries: 256,
        }
    }
}

#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicUsize,
    misses: AtomicUsize,
    expired: AtomicUsize,
    evictions: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStatsReport {
    pub hits: usize,
    pub misses: usize,
    pub expired: usize,
    pub evictions: usize,
}

struct CacheEntry {
    days: Vec<DateAvailability>,
    stored_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() > ttl
    }
}

fn cache_key(listing_id: &str, window: DateWindow) -> String {
    format!("{}:{}:{}", listing_id, window.start(), window.end())
}

// Calendar cache with TTL expiry and an entry cap. When full, the oldest
// entry is evicted.
pub struct CalendarCache {
    entries: DashMap<String, CacheEntry>,
    config: CacheConfig,
    stats: CacheStats,
}

impl CalendarCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            stats: CacheStats::default(),
        }
    }

    pub fn get(&self, listing_id: &str, window: DateWindow) -> Option<Vec<DateAvailability>> {
        let key = cache_key(listing_id, window);
        match self.entries.get(&key) {
            Some(entry) if !entry.is_expired(self.config.ttl) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.days.clone())
            }
            Some(entry) => {
                drop(entry);
                self.entries.remove(&key);
                self.stats.expired.fetch_add(1, Ordering::Relaxed);
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn store(&self, listing_id: &str, window: DateWindow, days: Vec<DateAvailability>) {
        let key = cache_key(listing_id, window);
        // Refreshing a key that is already cached replaces it in place and
        // must not push out an unrelated entry.
        if self.entries.len() >= self.config.max_entries && !self.entries.contains_key(&key) {
            self.evict_oldest();
        }
        self.entries.insert(
            key,
            CacheEntry {
                days,
                stored_at: Instant::now(),
            },
        );
    }

    // Drop every cached window for one listing, e.g. after a booking is
    // confirmed and its inventory is known to have changed.
    pub fn invalidate_listing(&self, listing_id: &str) -> usize {
        let prefix = format!("{}:", listing_id);
        let keys: Vec<String> = self
            .entries
            .iter()
            .map(|e| e.key().clone())
            .filter(|k| k.starts_with(&prefix))
            .collect();
        let count = keys.len();
        for key in keys {
            self.entries.remove(&key);
        }
        count
    }

    pub fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            expired: self.stats.expired.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
        }
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.value().stored_at)
            .map(|e| e.key().clone());
        if let Some(key) = oldest {
            debug!(key = %key, "evicting oldest calendar cache entry");
            self.entries.remove(&key);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

// Read-through wrapper: serves cached calendars and fills the cache from the
// inner source on a miss. Errors pass through uncached.
pub struct CachingSource<S> {
    inner: S,
    cache: CalendarCache,
}

impl<S: CalendarSource> CachingSource<S> {
    pub fn new(inner: S, config: CacheConfig) -> Self {
        Self {
            inner,
            cache: CalendarCache::new(config),
        }
    }

    pub fn cache(&self) -> &CalendarCache {
        &self.cache
    }
}

#[async_trait]
impl<S: CalendarSource> CalendarSource for CachingSource<S> {
    async fn fetch_calendar(
        &self,
        listing_id: &str,
        window: DateWindow,
    ) -> Result<Vec<DateAvailability>, SourceError> {
        if let Some(days) = self.cache.get(listing_id, window) {
            return Ok(days);
        }

        let days = self.inner.fetch_calendar(listing_id, window).await?;
        self.cache.store(listing_id, window, days.clone());
        Ok(days)
    }
}
