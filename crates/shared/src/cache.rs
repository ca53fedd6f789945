use std::collections::HashMap;
use std::time::{Duration, SystemTime};

/// Freshness window used when nothing else is configured.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<P> {
    pub payload: P,
    pub fetched_at: SystemTime,
}

impl<P> CacheEntry<P> {
    /// Age at `now`. A timestamp in the future counts as zero age.
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.fetched_at).unwrap_or(Duration::ZERO)
    }

    pub fn is_fresh(&self, ttl: Duration, now: SystemTime) -> bool {
        self.age(now) < ttl
    }
}

/// Result of looking a key up against a TTL.
#[derive(Debug, PartialEq)]
pub enum CacheLookup<'a, P> {
    Fresh(&'a CacheEntry<P>),
    Stale(&'a CacheEntry<P>),
    Missing,
}

/// Last good payload per resource key.
///
/// One slot per key; `put` replaces the slot wholesale. Failed refreshes
/// simply never call `put`, so the previous snapshot stays available.
#[derive(Debug, Clone)]
pub struct DataCache<P> {
    entries: HashMap<String, CacheEntry<P>>,
}

impl<P> DataCache<P> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry<P>> {
        self.entries.get(key)
    }

    pub fn is_fresh(&self, key: &str, ttl: Duration, now: SystemTime) -> bool {
        self.get(key).is_some_and(|entry| entry.is_fresh(ttl, now))
    }

    pub fn lookup(&self, key: &str, ttl: Duration, now: SystemTime) -> CacheLookup<'_, P> {
        match self.get(key) {
            Some(entry) if entry.is_fresh(ttl, now) => CacheLookup::Fresh(entry),
            Some(entry) => CacheLookup::Stale(entry),
            None => CacheLookup::Missing,
        }
    }

    pub fn put(&mut self, key: impl Into<String>, payload: P, now: SystemTime) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                payload,
                fetched_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P> Default for DataCache<P> {
    fn default() -> Self {
        Self::new()
    }
}
