//! Keyed loading cache with TTL expiry and size-bounded eviction.

use super::traits::{CacheConfig, CacheEntry};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

struct CacheState<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Monotonic counter stamped on every refresh; breaks `last_refreshed` ties.
    generation: u64,
}

/// A cache that computes missing or stale values through a caller-supplied loader.
///
/// One mutex covers the whole instance and is held while the loader runs, so at
/// most one load executes at a time per cache. Loader failures are never
/// cached: the error goes back to the caller and any stale entry is dropped.
pub struct LoadingCache<K, V> {
    name: &'static str,
    config: CacheConfig,
    state: Mutex<CacheState<K, V>>,
}

impl<K, V> LoadingCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    /// Create an empty cache. `name` only appears in logs.
    pub fn new(name: &'static str, config: CacheConfig) -> Self {
        Self {
            name,
            config,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                generation: 0,
            }),
        }
    }

    /// Return the cached value for `key`, loading it when absent or expired.
    pub async fn get<F, Fut, E>(&self, key: K, loader: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if self.config.max_entries == 0 {
            return loader().await;
        }

        let mut state = self.state.lock().await;
        let now = Instant::now();

        if let Some(entry) = state.entries.get(&key) {
            if !entry.is_expired(now, self.config.ttl) {
                debug!("{} cache hit for {:?}", self.name, key);
                let value = entry.value.clone();
                if self.config.touch_on_read {
                    state.generation += 1;
                    let generation = state.generation;
                    if let Some(entry) = state.entries.get_mut(&key) {
                        entry.touch(now, generation);
                    }
                }
                return Ok(value);
            }
        }

        debug!("{} cache miss for {:?}", self.name, key);
        let value = match loader().await {
            Ok(value) => value,
            Err(e) => {
                state.entries.remove(&key);
                return Err(e);
            }
        };

        if !state.entries.contains_key(&key) && state.entries.len() >= self.config.max_entries {
            evict_oldest(&mut state.entries);
        }

        state.generation += 1;
        let entry = CacheEntry::new(value.clone(), Instant::now(), state.generation);
        state.entries.insert(key, entry);
        Ok(value)
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.entries.clear();
        debug!("{} cache cleared", self.name);
    }

    /// Number of entries currently held, expired ones included.
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains_key(&self, key: &K) -> bool {
        self.state.lock().await.entries.contains_key(key)
    }
}

/// Remove the entry with the smallest `(last_refreshed, generation)`.
fn evict_oldest<K: Eq + Hash + Clone, V>(entries: &mut HashMap<K, CacheEntry<V>>) {
    let oldest = entries
        .iter()
        .min_by_key(|(_, entry)| (entry.last_refreshed, entry.generation))
        .map(|(key, _)| key.clone());
    if let Some(key) = oldest {
        entries.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn cache(ttl_secs: u64, max_entries: usize, touch_on_read: bool) -> LoadingCache<String, u32> {
        LoadingCache::new(
            "test",
            CacheConfig {
                ttl: Duration::from_secs(ttl_secs),
                max_entries,
                touch_on_read,
            },
        )
    }

    async fn load(
        cache: &LoadingCache<String, u32>,
        key: &str,
        value: u32,
        calls: &AtomicUsize,
    ) -> u32 {
        cache
            .get(key.to_string(), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(value)
            })
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_within_ttl_skips_loader() {
        let cache = cache(60, 10, false);
        let calls = AtomicUsize::new(0);

        assert_eq!(load(&cache, "a", 1, &calls).await, 1);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(load(&cache, "a", 2, &calls).await, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_reloads() {
        let cache = cache(60, 10, false);
        let calls = AtomicUsize::new(0);

        load(&cache, "a", 1, &calls).await;
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(load(&cache, "a", 2, &calls).await, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_on_read_extends_freshness() {
        let cache = cache(60, 10, true);
        let calls = AtomicUsize::new(0);

        load(&cache, "a", 1, &calls).await;
        tokio::time::advance(Duration::from_secs(40)).await;
        load(&cache, "a", 2, &calls).await;
        tokio::time::advance(Duration::from_secs(40)).await;
        assert_eq!(load(&cache, "a", 3, &calls).await, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_touch_hits_do_not_extend_freshness() {
        let cache = cache(60, 10, false);
        let calls = AtomicUsize::new(0);

        load(&cache, "a", 1, &calls).await;
        tokio::time::advance(Duration::from_secs(40)).await;
        load(&cache, "a", 2, &calls).await;
        tokio::time::advance(Duration::from_secs(40)).await;
        assert_eq!(load(&cache, "a", 3, &calls).await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_removes_least_recently_refreshed() {
        let cache = cache(600, 2, false);
        let calls = AtomicUsize::new(0);

        load(&cache, "a", 1, &calls).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        load(&cache, "b", 2, &calls).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        load(&cache, "c", 3, &calls).await;

        assert_eq!(cache.len().await, 2);
        assert!(!cache.contains_key(&"a".to_string()).await);
        assert!(cache.contains_key(&"b".to_string()).await);
        assert!(cache.contains_key(&"c".to_string()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_ties_use_refresh_order() {
        // Paused clock: every entry shares the same timestamp.
        let cache = cache(600, 2, false);
        let calls = AtomicUsize::new(0);

        load(&cache, "a", 1, &calls).await;
        load(&cache, "b", 2, &calls).await;
        load(&cache, "c", 3, &calls).await;

        assert!(!cache.contains_key(&"a".to_string()).await);
        assert!(cache.contains_key(&"b".to_string()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_touched_entry_survives_eviction() {
        let cache = cache(600, 2, true);
        let calls = AtomicUsize::new(0);

        load(&cache, "a", 1, &calls).await;
        load(&cache, "b", 2, &calls).await;
        load(&cache, "a", 1, &calls).await;
        load(&cache, "c", 3, &calls).await;

        assert!(cache.contains_key(&"a".to_string()).await);
        assert!(!cache.contains_key(&"b".to_string()).await);
    }

    #[tokio::test]
    async fn test_never_exceeds_capacity() {
        for max_entries in 1..5 {
            let cache = cache(600, max_entries, false);
            let calls = AtomicUsize::new(0);
            for i in 0..10u32 {
                load(&cache, &format!("k{}", i % 7), i, &calls).await;
                assert!(cache.len().await <= max_entries);
            }
        }
    }

    #[tokio::test]
    async fn test_zero_capacity_always_loads() {
        let cache = cache(600, 0, false);
        let calls = AtomicUsize::new(0);

        assert_eq!(load(&cache, "a", 1, &calls).await, 1);
        assert_eq!(load(&cache, "a", 2, &calls).await, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loader_failure_is_not_cached() {
        let cache = cache(60, 10, false);
        let calls = AtomicUsize::new(0);

        load(&cache, "a", 1, &calls).await;
        tokio::time::advance(Duration::from_secs(61)).await;

        let result = cache
            .get("a".to_string(), || async {
                Err::<u32, _>("boom".to_string())
            })
            .await;
        assert_eq!(result, Err("boom".to_string()));
        assert!(!cache.contains_key(&"a".to_string()).await);

        assert_eq!(load(&cache, "a", 5, &calls).await, 5);
    }

    #[tokio::test]
    async fn test_clear_forces_reload() {
        let cache = cache(600, 10, false);
        let calls = AtomicUsize::new(0);

        load(&cache, "a", 1, &calls).await;
        cache.clear().await;
        assert_eq!(load(&cache, "a", 2, &calls).await, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_load_once() {
        let cache = Arc::new(cache(600, 10, false));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get("shared".to_string(), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, String>(7)
                    })
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(7));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
