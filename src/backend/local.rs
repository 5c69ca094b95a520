use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::path::{Encoding, Path};

use super::FilesystemBackend;

/// Sidecar carrying the encoding tag, so a reader that only has a directory
/// listing (not the original Path construction) can still decode correctly.
/// Mirrors the cache+metadata-sidecar split this codebase's HTTP disk cache
/// already uses (one `.cache` file plus one `.metadata` file per entry).
#[derive(Debug, Serialize, Deserialize)]
struct MetaSidecar {
    encoding: Encoding,
}

/// Local-disk implementation of [`FilesystemBackend`]: one data file plus
/// one `.meta` sidecar per Path, nested under `root` following the Path's
/// components. Directory listing reads directory entries and filters
/// sidecar suffixes out of the child set.
pub struct LocalFilesystemBackend {
    root: PathBuf,
}

impl LocalFilesystemBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalFilesystemBackend { root: root.into() }
    }

    fn fs_path(&self, path: &Path) -> PathBuf {
        let mut p = self.root.clone();
        for component in path.components() {
            p.push(component);
        }
        p
    }

    fn meta_path(&self, path: &Path) -> PathBuf {
        let mut name = self.fs_path(path).into_os_string();
        name.push(".meta");
        PathBuf::from(name)
    }

    fn not_found_or_io(err: std::io::Error) -> StoreError {
        if err.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound
        } else {
            StoreError::Io(err)
        }
    }
}

#[async_trait]
impl FilesystemBackend for LocalFilesystemBackend {
    async fn write_content(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let fs_path = self.fs_path(path);
        if let Some(parent) = fs_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&fs_path, bytes).await?;

        let sidecar = MetaSidecar {
            encoding: path.encoding(),
        };
        let serialized = serde_json::to_vec(&sidecar)
            .map_err(|e| StoreError::Encode(e.to_string()))?;
        tokio::fs::write(self.meta_path(path), serialized).await?;

        tracing::debug!(path = %path, "wrote subject to filesystem backend");
        Ok(())
    }

    async fn read_content(&self, path: &Path) -> Result<bytes::Bytes> {
        let bytes = tokio::fs::read(self.fs_path(path))
            .await
            .map_err(Self::not_found_or_io)?;
        Ok(bytes::Bytes::from(bytes))
    }

    async fn delete_subject(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(self.fs_path(path)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::Io(e)),
        }
        match tokio::fs::remove_file(self.meta_path(path)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::Io(e)),
        }
        tracing::debug!(path = %path, "deleted subject from filesystem backend");
        Ok(())
    }

    async fn list_children(&self, path: &Path) -> Result<Vec<Path>> {
        let dir = self.fs_path(path);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if name.ends_with(".meta") {
                continue;
            }

            let mut child_components: Vec<String> =
                path.components().iter().cloned().collect();
            child_components.push(name.into_owned());
            let candidate = Path::new(child_components.clone(), path.encoding());

            let encoding = match tokio::fs::read(self.meta_path(&candidate)).await {
                Ok(bytes) => serde_json::from_slice::<MetaSidecar>(&bytes)
                    .map(|sidecar| sidecar.encoding)
                    .unwrap_or_else(|_| path.encoding()),
                Err(_) => path.encoding(),
            };

            children.push(Path::new(child_components, encoding));
        }

        children.sort_by(|a, b| a.components().cmp(b.components()));
        Ok(children)
    }
}
