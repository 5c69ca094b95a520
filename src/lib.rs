//! Write-behind, memory-cached hierarchical key/value datastore.
//!
//! Two cooperating bounded LRU caches ([`cache::DataCache`],
//! [`cache::DirectoryCache`]) sit in front of a filesystem backend
//! ([`backend::FilesystemBackend`]); an asynchronous writer pool
//! ([`writeback::WriteBehindStore`]) persists mutations while preserving
//! read-after-write visibility in the caches.

pub mod backend;
pub mod cache;
pub mod error;
pub mod lru;
pub mod memcache;
pub mod metrics;
pub mod mutation;
pub mod path;
pub mod payload;
pub mod resolver;
pub mod writeback;

pub use backend::{FilesystemBackend, LocalFilesystemBackend};
pub use error::{Result, StoreError};
pub use path::{Encoding, Path};
pub use writeback::{StoreConfig, WriteBehindStore};
