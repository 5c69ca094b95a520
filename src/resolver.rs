use crate::cache::DirectoryCache;
use crate::path::Path;

/// Synthesizes or maintains a parent directory's cached metadata on a
/// write, without the memcache core needing to know how.
///
/// Called synchronously from [`crate::memcache::MemcacheCore::set_subject`]
/// before the child is added to the parent's metadata. Implementations may
/// use `cache` to evict or adjust ancestor entries as a side effect; the
/// return value tells the core whether the parent directory currently has
/// an entry that should receive the new child. `DirectoryCache`'s own
/// `add_child_if_present`/`remove_child_if_present` are no-ops when the
/// entry is absent, so a resolver that always returns `true` without ever
/// creating an entry is merely wasteful, not incorrect — but returning an
/// accurate answer lets the core skip the lookup on the common path.
pub trait DirectoryMetadataResolver: Send + Sync {
    fn prepare(&self, cache: &DirectoryCache, target: &Path) -> bool;
}

/// The production resolver for the file-backed store.
///
/// Walks ancestors of the target Path. Any ancestor holding a non-full
/// (lower-bound) metadata entry is dropped outright: such entries are
/// worthless after a concrete mutation and cheaper to drop than to repair.
/// Only a *full* entry on the immediate parent is worth maintaining
/// incrementally, so this is the only case in which the resolver reports
/// "the parent has an entry" back to the core.
#[derive(Debug, Default)]
pub struct FileBackedResolver;

impl DirectoryMetadataResolver for FileBackedResolver {
    fn prepare(&self, cache: &DirectoryCache, target: &Path) -> bool {
        for ancestor in target.ancestors() {
            if let Some(meta) = cache.get(&ancestor) {
                if !meta.is_full() {
                    cache.remove(&ancestor);
                }
            }
        }
        cache.get(&target.parent()).is_some()
    }
}

/// A pure in-memory resolver for testing or an all-in-memory store: rather
/// than treating an absent parent entry as "nothing to maintain", it
/// synthesizes an empty, full listing so the in-memory store never needs a
/// filesystem fallback to discover children it already knows about.
#[derive(Debug, Default)]
pub struct InMemoryResolver;

impl DirectoryMetadataResolver for InMemoryResolver {
    fn prepare(&self, cache: &DirectoryCache, target: &Path) -> bool {
        let parent = target.parent();
        if cache.get(&parent).is_none() {
            cache.set_full_listing(&parent, std::iter::empty());
        }
        true
    }
}
