//! Remembered file locations
//!
//! Maps a filename to the directory it was last found in, so a repeat lookup
//! can skip the search. Entries are evicted least-recently-used first and are
//! never written to disk.

use std::num::NonZeroUsize;

use lru::LruCache;

/// Default number of remembered locations
pub const DEFAULT_LOCATION_CACHE_CAPACITY: usize = 256;

/// Bounded filename → directory map
#[derive(Debug)]
pub struct LocationCache {
    entries: LruCache<String, String>,
}

impl LocationCache {
    /// Create a cache holding at most `capacity` locations (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Directory `filename` was last seen in, marking it recently used
    pub fn get(&mut self, filename: &str) -> Option<String> {
        self.entries.get(filename).cloned()
    }

    pub fn insert(&mut self, filename: impl Into<String>, directory: impl Into<String>) {
        self.entries.put(filename.into(), directory.into());
    }

    pub fn remove(&mut self, filename: &str) -> Option<String> {
        self.entries.pop(filename)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

impl Default for LocationCache {
    fn default() -> Self {
        Self::new(DEFAULT_LOCATION_CACHE_CAPACITY)
    }
}
