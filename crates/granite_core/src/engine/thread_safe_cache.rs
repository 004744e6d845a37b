//! Cross-thread cache
//!
//! Lets recording threads share derived objects (generated pipeline
//! descriptions) without going through the device thread. Values are computed
//! outside the lock; when two threads race on a key the first insert wins and
//! both get the same `Arc`.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

use super::device::GraphicsPipelineDesc;
use super::resource::PipelineKey;

/// Thread-safe map from key to shared value
pub struct ThreadSafeCache<K, V> {
    /// Cache storage: key -> value
    entries: RwLock<HashMap<K, Arc<V>>>,
    /// Soft entry limit
    capacity: usize,
}

/// The cache a shared context carries: generated code per pipeline key
pub type PipelineDescCache = ThreadSafeCache<PipelineKey, GraphicsPipelineDesc>;

impl<K: Eq + Hash + Clone, V> ThreadSafeCache<K, V> {
    /// Create an empty cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Look up a value
    pub fn find(&self, key: &K) -> Option<Arc<V>> {
        self.entries.read().get(key).cloned()
    }

    /// Look up a value, computing and inserting it when absent
    ///
    /// `make` runs without the lock held. When the cache is full the fresh
    /// value is returned without being retained.
    pub fn find_or_insert_with<E>(&self, key: &K, make: impl FnOnce() -> Result<V, E>) -> Result<Arc<V>, E> {
        if let Some(value) = self.find(key) {
            return Ok(value);
        }

        let value = Arc::new(make()?);

        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(key) {
            // Lost the race; keep the winner's value
            return Ok(Arc::clone(existing));
        }
        if entries.len() >= self.capacity {
            log::debug!("[THREAD_SAFE_CACHE] Full at {} entries, not retaining new value", self.capacity);
            return Ok(value);
        }
        entries.insert(key.clone(), Arc::clone(&value));
        Ok(value)
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Soft entry limit
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl<K, V> std::fmt::Debug for ThreadSafeCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadSafeCache")
            .field("len", &self.entries.read().len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    #[test]
    fn test_find_or_insert_caches() {
        let cache: ThreadSafeCache<u32, String> = ThreadSafeCache::new(8);
        let a = cache.find_or_insert_with(&1, || Ok::<_, ()>("one".to_string())).unwrap();
        let b = cache.find_or_insert_with(&1, || Ok::<_, ()>("uno".to_string())).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*b, "one");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_make_leaves_no_entry() {
        let cache: ThreadSafeCache<u32, String> = ThreadSafeCache::new(8);
        let result = cache.find_or_insert_with(&7, || Err("boom"));
        assert_eq!(result.unwrap_err(), "boom");
        assert!(cache.find(&7).is_none());
    }

    #[test]
    fn test_capacity_is_respected() {
        let cache: ThreadSafeCache<u32, u32> = ThreadSafeCache::new(2);
        for key in 0..4 {
            let value = cache.find_or_insert_with(&key, || Ok::<_, ()>(key * 10)).unwrap();
            assert_eq!(*value, key * 10);
        }
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_concurrent_inserts_agree() {
        let cache: ThreadSafeCache<u32, u32> = ThreadSafeCache::new(8);
        let barrier = Barrier::new(4);
        let made = AtomicUsize::new(0);

        let results: Vec<Arc<u32>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let (cache, barrier, made) = (&cache, &barrier, &made);
                    s.spawn(move || {
                        barrier.wait();
                        cache
                            .find_or_insert_with(&42, || {
                                made.fetch_add(1, Ordering::SeqCst);
                                Ok::<_, ()>(i)
                            })
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(made.load(Ordering::SeqCst) >= 1);
        let winner = cache.find(&42).unwrap();
        for result in &results {
            assert!(Arc::ptr_eq(result, &winner));
        }
    }
}
