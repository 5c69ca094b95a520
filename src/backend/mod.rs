use async_trait::async_trait;

use crate::error::Result;
use crate::path::Path;

pub mod local;

pub use local::LocalFilesystemBackend;

/// Ground-truth store over local files. The store consumes this
/// contract but does not implement here which backend provides it; the
/// local-disk implementation in [`local`] is the concrete backend this
/// crate ships so the store is runnable end to end.
///
/// Errors distinguish "not found" (surfaced as [`crate::error::StoreError::NotFound`])
/// from other I/O failures ([`crate::error::StoreError::Io`]).
#[async_trait]
pub trait FilesystemBackend: Send + Sync {
    /// Create or replace the content at `path`.
    async fn write_content(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    /// Read the content at `path`. `NotFound` if it does not exist.
    async fn read_content(&self, path: &Path) -> Result<bytes::Bytes>;

    /// Idempotent: deleting an absent Path is not an error.
    async fn delete_subject(&self, path: &Path) -> Result<()>;

    /// Direct children of `path` in a stable order. A missing directory is
    /// treated as empty, not an error.
    async fn list_children(&self, path: &Path) -> Result<Vec<Path>>;
}
