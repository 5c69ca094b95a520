use serde::{de::DeserializeOwned, Serialize};

use crate::cache::{DataCache, DirectoryCache};
use crate::error::{Result, StoreError};
use crate::path::Path;
use crate::payload;
use crate::resolver::DirectoryMetadataResolver;

/// Wires the data cache, the directory cache, and an injected
/// directory-metadata resolver into the public read/write/list/delete API.
/// Holds no knowledge of the filesystem backend: a miss is reported
/// as [`StoreError::NotFound`] and it is the write-behind layer's job to
/// fall back.
pub struct MemcacheCore {
    data: DataCache,
    directories: DirectoryCache,
    resolver: Box<dyn DirectoryMetadataResolver>,
}

impl MemcacheCore {
    pub fn new(
        data: DataCache,
        directories: DirectoryCache,
        resolver: Box<dyn DirectoryMetadataResolver>,
    ) -> Self {
        MemcacheCore {
            data,
            directories,
            resolver,
        }
    }

    pub fn data_cache(&self) -> &DataCache {
        &self.data
    }

    pub fn directory_cache(&self) -> &DirectoryCache {
        &self.directories
    }

    /// Decode the cached payload into `T`. Fails with `NotFound` if `path`
    /// is absent from the data cache; the write-behind layer is responsible
    /// for filesystem fallback.
    pub fn get_subject<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let bytes = self.data.get(path).ok_or(StoreError::NotFound)?;
        payload::decode(path.encoding(), &bytes)
    }

    /// Raw bytes form of [`Self::get_subject`], used by callers that want
    /// to forward payload bytes without decoding (e.g. the write-behind
    /// layer's `get_buffer`).
    pub fn get_buffer(&self, path: &Path) -> Result<bytes::Bytes> {
        self.data.get(path).ok_or(StoreError::NotFound)
    }

    /// Encode `msg` per `path`'s tag, store it, and maintain the parent
    /// directory's metadata via the injected resolver.
    pub fn set_subject<T: Serialize>(&self, path: &Path, msg: &T) -> Result<()> {
        let bytes = payload::encode(path.encoding(), msg)?;
        self.set_data(path, bytes::Bytes::from(bytes));
        Ok(())
    }

    /// As [`Self::set_subject`] but with a pre-encoded payload; used by the
    /// fallback path to hydrate the cache from the filesystem without
    /// re-encoding.
    pub fn set_data(&self, path: &Path, bytes: bytes::Bytes) {
        self.data.set(path.clone(), bytes);
        self.maintain_parent_on_write(path);
    }

    /// Remove from the data cache and remove the child from the parent
    /// directory's metadata if that metadata is present.
    pub fn delete_subject(&self, path: &Path) {
        self.data.remove(path);
        if let Some(name) = path.name() {
            self.directories.remove_child_if_present(&path.parent(), name);
        }
    }

    /// If cached `DirectoryMetadata` is present and `full`, returns its
    /// children in deterministic order. Otherwise returns `None`, leaving
    /// the write-behind layer to consult the filesystem.
    pub fn list_children(&self, path: &Path) -> Option<Vec<Path>> {
        let meta = self.directories.get(path)?;
        if meta.is_full() {
            Some(meta.children())
        } else {
            None
        }
    }

    /// Replace the metadata for `path` with the given set, marked `full`.
    pub fn set_children(&self, path: &Path, children: impl IntoIterator<Item = Path>) {
        self.directories.set_full_listing(path, children);
    }

    /// Parent-metadata maintenance on write (synchronous, in core).
    /// Consults the resolver for whether the parent currently has an entry
    /// worth updating in place, then adds the child if so.
    fn maintain_parent_on_write(&self, path: &Path) {
        let parent = path.parent();
        let has_parent_entry = self.resolver.prepare(&self.directories, path);
        if has_parent_entry {
            self.directories.add_child_if_present(&parent, path.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Encoding;
    use crate::resolver::{FileBackedResolver, InMemoryResolver};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Subject {
        x: u32,
    }

    fn core_with(resolver: impl DirectoryMetadataResolver + 'static) -> MemcacheCore {
        MemcacheCore::new(DataCache::new(10, 4096), DirectoryCache::new(10), Box::new(resolver))
    }

    #[test]
    fn get_missing_is_not_found() {
        let core = core_with(InMemoryResolver);
        let p = Path::new(["a", "b.json.db"], Encoding::Json);
        let err = core.get_subject::<Subject>(&p).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn set_then_get_round_trips() {
        let core = core_with(InMemoryResolver);
        let p = Path::new(["a", "b.json.db"], Encoding::Json);
        core.set_subject(&p, &Subject { x: 1 }).unwrap();
        assert_eq!(core.get_subject::<Subject>(&p).unwrap(), Subject { x: 1 });
    }

    #[test]
    fn delete_removes_subject_and_parent_membership() {
        let core = core_with(InMemoryResolver);
        let p = Path::new(["a", "b.json.db"], Encoding::Json);
        core.set_subject(&p, &Subject { x: 1 }).unwrap();
        assert!(core.list_children(&Path::new(["a"], Encoding::Json)).is_some());

        core.delete_subject(&p);
        assert!(core.get_subject::<Subject>(&p).unwrap_err().is_not_found());
        let children = core.list_children(&Path::new(["a"], Encoding::Json)).unwrap();
        assert!(children.is_empty());
    }

    #[test]
    fn set_with_file_backed_resolver_skips_update_when_parent_absent() {
        let core = core_with(FileBackedResolver);
        let p = Path::new(["a", "b.json.db"], Encoding::Json);
        core.set_subject(&p, &Subject { x: 1 }).unwrap();
        // no prior full listing on "a" -> nothing to maintain
        assert!(core.list_children(&Path::new(["a"], Encoding::Json)).is_none());
    }

    #[test]
    fn set_with_file_backed_resolver_updates_existing_full_parent() {
        let core = core_with(FileBackedResolver);
        let dir = Path::new(["a"], Encoding::Json);
        core.set_children(&dir, std::iter::empty());

        let p = Path::new(["a", "b.json.db"], Encoding::Json);
        core.set_subject(&p, &Subject { x: 1 }).unwrap();

        let children = core.list_children(&dir).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name(), Some("b.json.db"));
    }
}
