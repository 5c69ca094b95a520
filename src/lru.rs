use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

/// A predicate identifying keys immune to idle-time expiry.
pub type ExemptionPredicate<K> = Box<dyn Fn(&K) -> bool + Send + Sync>;

struct Entry<V> {
    value: V,
    touched_at: Instant,
}

/// Generic size- and item-count-limited associative cache.
///
/// Access (`get` or `set`) moves an entry to the most-recently-used
/// position; eviction is strict LRU by last access. Oversized values (by
/// the configured `max_item_bytes`, when a sizing function is supplied) are
/// rejected silently: they pass through without being cached. An optional
/// time-to-idle evicts entries that have not been touched within the
/// window, unless the entry's key is exempted.
///
/// All operations are serialized by the cache's own mutex; callbacks
/// (`size_of`, the exemption predicate) must not re-enter the same cache.
pub struct BoundedLru<K, V> {
    inner: Mutex<LruCache<K, Entry<V>>>,
    max_item_bytes: Option<usize>,
    size_of: Option<Box<dyn Fn(&V) -> usize + Send + Sync>>,
    time_to_idle: Option<Duration>,
    exempt: Option<ExemptionPredicate<K>>,
}

impl<K, V> BoundedLru<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(max_entries: usize) -> Self {
        let cap = NonZeroUsize::new(max_entries.max(1)).expect("max_entries must be > 0");
        BoundedLru {
            inner: Mutex::new(LruCache::new(cap)),
            max_item_bytes: None,
            size_of: None,
            time_to_idle: None,
            exempt: None,
        }
    }

    /// Reject entries whose size (per `size_of`) exceeds `max_item_bytes`.
    pub fn with_max_item_bytes(mut self, max_item_bytes: usize, size_of: impl Fn(&V) -> usize + Send + Sync + 'static) -> Self {
        self.max_item_bytes = Some(max_item_bytes);
        self.size_of = Some(Box::new(size_of));
        self
    }

    pub fn with_time_to_idle(mut self, ttl: Duration) -> Self {
        self.time_to_idle = Some(ttl);
        self
    }

    pub fn with_exemption(mut self, exempt: ExemptionPredicate<K>) -> Self {
        self.exempt = Some(exempt);
        self
    }

    fn is_oversize(&self, value: &V) -> bool {
        match (self.max_item_bytes, &self.size_of) {
            (Some(max), Some(size_of)) => size_of(value) > max,
            _ => false,
        }
    }

    fn is_expired(&self, key: &K, entry: &Entry<V>) -> bool {
        let Some(ttl) = self.time_to_idle else {
            return false;
        };
        if let Some(exempt) = &self.exempt {
            if exempt(key) {
                return false;
            }
        }
        entry.touched_at.elapsed() > ttl
    }

    /// Retrieves a value, moving it to the most-recently-used position.
    /// Returns `None` if the entry is absent or has idle-expired (the
    /// expired entry is removed as a side effect).
    pub fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.inner.lock().unwrap();
        let expired = match guard.peek(key) {
            Some(entry) => self.is_expired(key, entry),
            None => return None,
        };
        if expired {
            guard.pop(key);
            return None;
        }
        let entry = guard.get_mut(key)?;
        entry.touched_at = Instant::now();
        Some(entry.value.clone())
    }

    /// Inserts or replaces a value, moving it to the most-recently-used
    /// position. Oversized values are silently dropped (not cached) but the
    /// call otherwise succeeds from the caller's perspective.
    pub fn set(&self, key: K, value: V) {
        if self.is_oversize(&value) {
            return;
        }
        let mut guard = self.inner.lock().unwrap();
        guard.put(
            key,
            Entry {
                value,
                touched_at: Instant::now(),
            },
        );
    }

    pub fn remove(&self, key: &K) {
        self.inner.lock().unwrap().pop(key);
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f` against a mutably-borrowed value in place, without
    /// disturbing recency ordering beyond a normal access. Returns `None`
    /// if the key is absent. `f` must not call back into this cache.
    pub fn with_mut<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let mut guard = self.inner.lock().unwrap();
        let entry = guard.get_mut(key)?;
        entry.touched_at = Instant::now();
        Some(f(&mut entry.value))
    }

    /// Inserts a value computed by `default` only if the key is absent,
    /// then runs `f` against it. Used by callers that need get-or-insert
    /// semantics without two lock acquisitions.
    pub fn get_or_insert_with<R>(
        &self,
        key: K,
        default: impl FnOnce() -> V,
        f: impl FnOnce(&mut V) -> R,
    ) -> R {
        let mut guard = self.inner.lock().unwrap();
        if guard.peek(&key).is_none() {
            guard.put(
                key.clone(),
                Entry {
                    value: default(),
                    touched_at: Instant::now(),
                },
            );
        }
        let entry = guard.get_mut(&key).expect("just inserted or present");
        entry.touched_at = Instant::now();
        f(&mut entry.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respects_entry_cap() {
        let cache: BoundedLru<u32, u32> = BoundedLru::new(2);
        cache.set(1, 1);
        cache.set(2, 2);
        cache.set(3, 3);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&1).is_none());
        assert_eq!(cache.get(&3), Some(3));
    }

    #[test]
    fn access_moves_to_mru() {
        let cache: BoundedLru<u32, u32> = BoundedLru::new(2);
        cache.set(1, 1);
        cache.set(2, 2);
        // touch 1, making 2 the least-recently-used
        assert_eq!(cache.get(&1), Some(1));
        cache.set(3, 3);
        assert!(cache.get(&2).is_none());
        assert_eq!(cache.get(&1), Some(1));
        assert_eq!(cache.get(&3), Some(3));
    }

    #[test]
    fn oversize_values_bypass_cache() {
        let cache: BoundedLru<u32, Vec<u8>> =
            BoundedLru::new(10).with_max_item_bytes(4, |v: &Vec<u8>| v.len());
        cache.set(1, vec![0; 10]);
        assert!(cache.get(&1).is_none());
        cache.set(2, vec![0; 2]);
        assert!(cache.get(&2).is_some());
    }

    #[test]
    fn exempt_keys_survive_idle_expiry() {
        let cache: BoundedLru<String, u32> = BoundedLru::new(10)
            .with_time_to_idle(Duration::from_millis(10))
            .with_exemption(Box::new(|k: &String| k.ends_with("ping.db")));
        cache.set("a/ping.db".to_string(), 1);
        cache.set("a/other.db".to_string(), 2);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get(&"a/ping.db".to_string()), Some(1));
        assert!(cache.get(&"a/other.db".to_string()).is_none());
    }
}
