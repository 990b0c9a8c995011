//! TTL caches used throughout the provider: open-interest (60s), BTC
//! reference candles (30s), and the generic indicator cache (300s TTL,
//! size-bounded eviction).

use indexmap::IndexMap;
use parking_lot::Mutex;
use std::hash::Hash;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// A mutex-guarded TTL cache with an optional max size. When full, the
/// oldest-inserted entry is evicted to make room (approximates LRU without
/// tracking access order).
pub struct TtlCache<K, V> {
    entries: Mutex<IndexMap<K, Entry<V>>>,
    ttl: Duration,
    max_size: Option<usize>,
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl", &self.ttl)
            .field("max_size", &self.max_size)
            .finish()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_max_size(ttl, None)
    }

    pub fn with_max_size(ttl: Duration, max_size: Option<usize>) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            ttl,
            max_size,
        }
    }

    /// Returns the cached value if present and not expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.lock();
        entries.get(key).and_then(|entry| {
            (entry.inserted_at.elapsed() < self.ttl).then(|| entry.value.clone())
        })
    }

    pub fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock();
        if let Some(max_size) = self.max_size {
            while entries.len() >= max_size && !entries.contains_key(&key) {
                entries.shift_remove_index(0);
            }
        }
        entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Evict every expired entry. Callers may run this periodically; `get`
    /// already ignores expired entries so this is purely for bounding
    /// memory growth.
    pub fn evict_expired(&self) {
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_after_ttl() {
        let cache: TtlCache<&str, i32> = TtlCache::new(Duration::from_millis(10));
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn evicts_oldest_when_over_capacity() {
        let cache: TtlCache<i32, i32> = TtlCache::with_max_size(Duration::from_secs(60), Some(2));
        cache.insert(1, 1);
        cache.insert(2, 2);
        cache.insert(3, 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&3), Some(3));
    }
}
