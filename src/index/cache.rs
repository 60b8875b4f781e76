//! Repository key -> built index

use super::VectorIndex;
use ahash::AHashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, info};

struct CacheEntry {
    index: Arc<VectorIndex>,
    last_used: u64,
}

/// Index cache keyed by normalized repository identity
///
/// Holds at most one index per key. Without a capacity the cache grows
/// without bound; with one, the least recently used entry is evicted when a
/// new key is stored. Concurrent builds are not deduplicated here: callers
/// sharing a cache across tasks must serialize access (the pipeline keeps it
/// behind an async mutex).
pub struct IndexCache {
    entries: AHashMap<String, CacheEntry>,
    capacity: Option<NonZeroUsize>,
    clock: u64,
}

impl IndexCache {
    /// Create a cache; `capacity` of `None` means unbounded
    pub fn new(capacity: Option<NonZeroUsize>) -> Self {
        Self {
            entries: AHashMap::new(),
            capacity,
            clock: 0,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Return the cached index for `key`, building it on a miss.
    ///
    /// The builder runs only on a miss and its result is stored only when it
    /// succeeds; an error leaves the cache exactly as it was.
    pub async fn get_or_build<F, Fut, E>(
        &mut self,
        key: &str,
        builder: F,
    ) -> Result<Arc<VectorIndex>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<VectorIndex, E>>,
    {
        if let Some(index) = self.get(key) {
            debug!("Index cache hit: {}", key);
            return Ok(index);
        }

        info!("Index cache miss, building: {}", key);
        let index = Arc::new(builder().await?);
        self.insert(key, index.clone());
        Ok(index)
    }

    /// Build a fresh index for `key` and swap it in.
    ///
    /// The previous entry, if any, keeps serving until the new build
    /// succeeds; on failure it is left untouched.
    pub async fn rebuild<F, Fut, E>(&mut self, key: &str, builder: F) -> Result<Arc<VectorIndex>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<VectorIndex, E>>,
    {
        info!("Rebuilding index: {}", key);
        let index = Arc::new(builder().await?);
        self.insert(key, index.clone());
        Ok(index)
    }

    /// Look up `key`, marking it as recently used
    pub fn get(&mut self, key: &str) -> Option<Arc<VectorIndex>> {
        self.clock += 1;
        let now = self.clock;
        self.entries.get_mut(key).map(|entry| {
            entry.last_used = now;
            entry.index.clone()
        })
    }

    /// Store `index` under `key`, replacing any previous entry
    pub fn insert(&mut self, key: &str, index: Arc<VectorIndex>) {
        if !self.entries.contains_key(key) {
            self.evict_for_insert();
        }
        self.clock += 1;
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                index,
                last_used: self.clock,
            },
        );
    }

    /// Drop the entry for `key` so the next access rebuilds it
    pub fn invalidate(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            info!("Invalidated cached index: {}", key);
        }
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached keys, most recently used first
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<(&String, u64)> =
            self.entries.iter().map(|(k, e)| (k, e.last_used)).collect();
        keys.sort_by(|a, b| b.1.cmp(&a.1));
        keys.into_iter().map(|(k, _)| k.clone()).collect()
    }

    fn evict_for_insert(&mut self) {
        let Some(capacity) = self.capacity else {
            return;
        };
        while self.entries.len() >= capacity.get() {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone())
            else {
                return;
            };
            info!("Evicting least recently used index: {}", oldest);
            self.entries.remove(&oldest);
        }
    }
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::Chunk;
    use crate::index::VectorIndexError;
    use std::cell::Cell;

    fn tiny_index(text: &str) -> VectorIndex {
        VectorIndex::build(vec![(Chunk::new(text, 0, None), vec![1.0, 0.0])]).unwrap()
    }

    #[tokio::test]
    async fn test_builder_runs_once_per_key() {
        let mut cache = IndexCache::unbounded();
        let calls = Cell::new(0);

        for _ in 0..3 {
            let index = cache
                .get_or_build("github.com/a/b", || async {
                    calls.set(calls.get() + 1);
                    Ok::<_, VectorIndexError>(tiny_index("b"))
                })
                .await
                .unwrap();
            assert_eq!(index.chunks()[0].text, "b");
        }
        assert_eq!(calls.get(), 1);

        assert!(cache.invalidate("github.com/a/b"));
        cache
            .get_or_build("github.com/a/b", || async {
                calls.set(calls.get() + 1);
                Ok::<_, VectorIndexError>(tiny_index("b"))
            })
            .await
            .unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn test_failed_build_stores_nothing() {
        let mut cache = IndexCache::unbounded();

        let result = cache
            .get_or_build("k", || async { VectorIndex::build(Vec::new()) })
            .await;
        assert!(result.is_err());
        assert!(!cache.contains("k"));
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_prior_entry() {
        let mut cache = IndexCache::unbounded();
        cache.insert("k", Arc::new(tiny_index("old")));

        let result = cache
            .rebuild("k", || async { VectorIndex::build(Vec::new()) })
            .await;
        assert!(result.is_err());
        assert_eq!(cache.get("k").unwrap().chunks()[0].text, "old");

        cache
            .rebuild("k", || async { Ok::<_, VectorIndexError>(tiny_index("new")) })
            .await
            .unwrap();
        assert_eq!(cache.get("k").unwrap().chunks()[0].text, "new");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = IndexCache::new(NonZeroUsize::new(2));
        cache.insert("a", Arc::new(tiny_index("a")));
        cache.insert("b", Arc::new(tiny_index("b")));

        // Touch "a" so "b" becomes the eviction candidate
        assert!(cache.get("a").is_some());
        cache.insert("c", Arc::new(tiny_index("c")));

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
        assert_eq!(cache.keys(), vec!["c".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_replacing_existing_key_does_not_evict() {
        let mut cache = IndexCache::new(NonZeroUsize::new(2));
        cache.insert("a", Arc::new(tiny_index("a")));
        cache.insert("b", Arc::new(tiny_index("b")));
        cache.insert("a", Arc::new(tiny_index("a2")));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a").unwrap().chunks()[0].text, "a2");
    }
}
