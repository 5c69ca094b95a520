use std::collections::BTreeMap;

use crate::lru::BoundedLru;
use crate::path::Path;

/// The cached child set for a directory Path, with a `full` flag.
///
/// `full = true` means the set equals the filesystem's current children as
/// of the last authoritative refresh; `full = false` means membership is a
/// lower bound only. Children are keyed by their last path component so
/// add/remove are well-defined regardless of insertion order; iteration is
/// always in lexicographic order.
#[derive(Debug, Clone, Default)]
pub struct DirectoryMetadata {
    children: BTreeMap<String, Path>,
    full: bool,
}

impl DirectoryMetadata {
    pub fn empty(full: bool) -> Self {
        DirectoryMetadata {
            children: BTreeMap::new(),
            full,
        }
    }

    pub fn from_children(children: impl IntoIterator<Item = Path>, full: bool) -> Self {
        let mut map = BTreeMap::new();
        for child in children {
            if let Some(name) = child.name() {
                map.insert(name.to_string(), child);
            }
        }
        DirectoryMetadata { children: map, full }
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Children in deterministic (lexicographic by component name) order.
    pub fn children(&self) -> Vec<Path> {
        self.children.values().cloned().collect()
    }

    pub fn add_child(&mut self, child: Path) {
        if let Some(name) = child.name() {
            self.children.insert(name.to_string(), child);
        }
    }

    pub fn remove_child(&mut self, name: &str) {
        self.children.remove(name);
    }
}

/// LRU of directory key -> DirectoryMetadata. "No metadata" (cache miss) is
/// distinct from "metadata present but not full" (cache hit, lower-bound
/// only) — callers must use [`DirectoryCache::get`] and inspect
/// `DirectoryMetadata::is_full` rather than treating absence and
/// non-fullness as the same condition.
pub struct DirectoryCache {
    inner: BoundedLru<String, DirectoryMetadata>,
}

impl DirectoryCache {
    pub fn new(max_entries: usize) -> Self {
        DirectoryCache {
            inner: BoundedLru::new(max_entries),
        }
    }

    pub fn get(&self, dir: &Path) -> Option<DirectoryMetadata> {
        self.inner.get(&dir.directory_key())
    }

    pub fn set_full_listing(&self, dir: &Path, children: impl IntoIterator<Item = Path>) {
        self.inner.set(
            dir.directory_key(),
            DirectoryMetadata::from_children(children, true),
        );
    }

    pub fn remove(&self, dir: &Path) {
        self.inner.remove(&dir.directory_key());
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Adds `child` to `dir`'s cached metadata if present, preserving its
    /// `full` flag. No-op if `dir` has no cached metadata at all (the core
    /// does not synthesize metadata from nothing on a plain add).
    pub fn add_child_if_present(&self, dir: &Path, child: Path) {
        self.inner
            .with_mut(&dir.directory_key(), |meta| meta.add_child(child));
    }

    /// Removes `name` from `dir`'s cached metadata if present.
    pub fn remove_child_if_present(&self, dir: &Path, name: &str) {
        self.inner
            .with_mut(&dir.directory_key(), |meta| meta.remove_child(name));
    }

    #[cfg(test)]
    pub fn set_non_full_for_test(&self, dir: &Path) {
        self.inner
            .set(dir.directory_key(), DirectoryMetadata::empty(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Encoding;

    #[test]
    fn absence_and_non_full_are_distinct() {
        let cache = DirectoryCache::new(10);
        let dir = Path::new(["a"], Encoding::Json);
        assert!(cache.get(&dir).is_none());

        cache.inner.set(dir.directory_key(), DirectoryMetadata::empty(false));
        let meta = cache.get(&dir).unwrap();
        assert!(!meta.is_full());
        assert!(meta.children().is_empty());
    }

    #[test]
    fn full_listing_is_deterministic_order() {
        let cache = DirectoryCache::new(10);
        let dir = Path::new(["a"], Encoding::Json);
        let b = Path::new(["a", "b"], Encoding::Json);
        let z = Path::new(["a", "z"], Encoding::Json);
        let a = Path::new(["a", "a"], Encoding::Json);
        cache.set_full_listing(&dir, vec![z.clone(), a.clone(), b.clone()]);

        let meta = cache.get(&dir).unwrap();
        assert!(meta.is_full());
        let names: Vec<_> = meta.children().iter().map(|p| p.name().unwrap().to_string()).collect();
        assert_eq!(names, vec!["a".to_string(), "b".to_string(), "z".to_string()]);
    }

    #[test]
    fn add_child_if_present_is_noop_when_absent() {
        let cache = DirectoryCache::new(10);
        let dir = Path::new(["a"], Encoding::Json);
        let child = Path::new(["a", "b"], Encoding::Json);
        cache.add_child_if_present(&dir, child);
        assert!(cache.get(&dir).is_none());
    }
}
