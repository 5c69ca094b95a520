use std::time::Duration;

use crate::lru::{BoundedLru, ExemptionPredicate};
use crate::path::Path;

/// LRU of Path -> serialized payload bytes. Oversized payloads are not
/// cached, protecting the cache from a single huge entry monopolizing it.
pub struct DataCache {
    inner: BoundedLru<Path, bytes::Bytes>,
}

impl DataCache {
    pub fn new(max_entries: usize, max_item_bytes: usize) -> Self {
        DataCache {
            inner: BoundedLru::new(max_entries)
                .with_max_item_bytes(max_item_bytes, |v: &bytes::Bytes| v.len()),
        }
    }

    /// As [`Self::new`], additionally installing a time-to-idle and an
    /// exemption predicate (used by the write-behind layer to pin
    /// heartbeat-sentinel keys past the expiry window).
    pub fn with_expiry(
        max_entries: usize,
        max_item_bytes: usize,
        time_to_idle: Duration,
        exempt: impl Fn(&Path) -> bool + Send + Sync + 'static,
    ) -> Self {
        let exempt: ExemptionPredicate<Path> = Box::new(exempt);
        DataCache {
            inner: BoundedLru::new(max_entries)
                .with_max_item_bytes(max_item_bytes, |v: &bytes::Bytes| v.len())
                .with_time_to_idle(time_to_idle)
                .with_exemption(exempt),
        }
    }

    pub fn get(&self, path: &Path) -> Option<bytes::Bytes> {
        self.inner.get(path)
    }

    pub fn set(&self, path: Path, bytes: bytes::Bytes) {
        self.inner.set(path, bytes);
    }

    pub fn remove(&self, path: &Path) {
        self.inner.remove(path);
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Encoding;

    #[test]
    fn oversize_payload_not_cached() {
        let cache = DataCache::new(10, 4);
        let p = Path::new(["a", "b"], Encoding::Json);
        cache.set(p.clone(), bytes::Bytes::from(vec![0u8; 10]));
        assert!(cache.get(&p).is_none());
    }

    #[test]
    fn normal_payload_cached() {
        let cache = DataCache::new(10, 64);
        let p = Path::new(["a", "b"], Encoding::Json);
        cache.set(p.clone(), bytes::Bytes::from_static(b"hi"));
        assert_eq!(cache.get(&p), Some(bytes::Bytes::from_static(b"hi")));
    }

    #[test]
    fn exempt_sentinel_survives_idle_expiry() {
        let cache = DataCache::with_expiry(10, 64, Duration::from_millis(10), |p: &Path| {
            p.ends_with_sentinel("ping.db")
        });
        let heartbeat = Path::new(["host", "ping.db"], Encoding::Binary);
        let other = Path::new(["host", "other.db"], Encoding::Binary);
        cache.set(heartbeat.clone(), bytes::Bytes::from_static(b"1"));
        cache.set(other.clone(), bytes::Bytes::from_static(b"2"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.get(&heartbeat).is_some());
        assert!(cache.get(&other).is_none());
    }
}
