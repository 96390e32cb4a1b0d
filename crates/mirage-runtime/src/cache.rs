//! Caching layer for caption extractions.
//!
//! Provides in-memory caching of extraction results to avoid repeated LLM
//! calls for identical captions. Detection results are not cached: on the
//! image side the expensive, cacheable step is the loaded session itself,
//! which [`crate::detector::YoloDetector`] already shares.

use moka::future::Cache;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use mirage_core::{Caption, ObjectSet};

/// Cache key for an extraction result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(u64);

impl CacheKey {
    /// Create a cache key from a caption.
    pub fn new(caption: &Caption) -> Self {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        caption.as_str().hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// Extraction cache using moka.
pub struct ExtractionCache {
    cache: Cache<CacheKey, ObjectSet>,
}

impl ExtractionCache {
    /// Create a new cache with the given capacity and time-to-live.
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    /// Get a cached extraction for a caption.
    pub async fn get(&self, caption: &Caption) -> Option<ObjectSet> {
        self.cache.get(&CacheKey::new(caption)).await
    }

    /// Store an extraction result.
    pub async fn insert(&self, caption: &Caption, objects: ObjectSet) {
        self.cache.insert(CacheKey::new(caption), objects).await;
        // moka updates entry_count() lazily via background maintenance; flush
        // pending tasks so the count reflects this insert immediately.
        self.cache.run_pending_tasks().await;
    }

    /// Clear the cache.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Get cache statistics.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for ExtractionCache {
    fn default() -> Self {
        Self::new(10_000, Duration::from_secs(3600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caption(text: &str) -> Caption {
        Caption::new(text).unwrap()
    }

    #[tokio::test]
    async fn round_trip() {
        let cache = ExtractionCache::default();
        let objects: ObjectSet = ["dog", "couch"].into_iter().collect();

        cache.insert(&caption("two dogs on a couch"), objects.clone()).await;

        assert_eq!(cache.get(&caption("two dogs on a couch")).await, Some(objects));
        assert_eq!(cache.get(&caption("a different caption")).await, None);
    }

    #[tokio::test]
    async fn keys_differ_per_caption_text() {
        assert_ne!(
            CacheKey::new(&caption("a dog")),
            CacheKey::new(&caption("a cat"))
        );
        assert_eq!(
            CacheKey::new(&caption("a dog")),
            CacheKey::new(&caption("a dog"))
        );
    }
}
