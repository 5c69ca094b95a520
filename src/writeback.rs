use std::sync::Arc;
use std::time::Duration;

use prometheus::Registry;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex, OnceCell};
use tokio_util::sync::CancellationToken;

use crate::backend::FilesystemBackend;
use crate::cache::{DataCache, DirectoryCache};
use crate::error::{Result, StoreError};
use crate::memcache::MemcacheCore;
use crate::mutation::{Mutation, PostPersistCallback};
use crate::metrics::StoreMetrics;
use crate::path::Path;
use crate::payload;
use crate::resolver::FileBackedResolver;

/// Keys whose final component ends with this suffix are frequently-touched
/// heartbeat records that must stay hot: exempted from idle-time expiry.
pub const HEARTBEAT_SENTINEL: &str = "ping.db";

/// Sizes, timers, and paths the write-behind layer is constructed with.
/// `Deserialize` so a caller's `figment` profile can populate it
/// directly; the store itself never reaches into environment variables or
/// files.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Idle window after which a non-exempt data-cache entry expires.
    pub expiry_window_secs: u64,
    /// Mutation channel capacity. A negative value is the write-through
    /// sentinel: `set_subject`/`delete_subject` additionally wait for the
    /// mutation's completion before returning.
    pub mutation_buffer_size: i64,
    /// Size of the fixed writer-worker pool.
    pub writer_count: usize,
    pub data_cache_max_entries: usize,
    pub data_cache_max_item_bytes: usize,
    pub directory_cache_max_entries: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            expiry_window_secs: 600,
            mutation_buffer_size: 1000,
            writer_count: 100,
            data_cache_max_entries: 10_000,
            data_cache_max_item_bytes: 65_536,
            directory_cache_max_entries: 1_000,
        }
    }
}

impl StoreConfig {
    pub fn with_expiry_window_secs(mut self, v: u64) -> Self {
        self.expiry_window_secs = v;
        self
    }

    pub fn with_mutation_buffer_size(mut self, v: i64) -> Self {
        self.mutation_buffer_size = v;
        self
    }

    pub fn with_writer_count(mut self, v: usize) -> Self {
        self.writer_count = v;
        self
    }

    pub fn with_data_cache_max_entries(mut self, v: usize) -> Self {
        self.data_cache_max_entries = v;
        self
    }

    pub fn with_data_cache_max_item_bytes(mut self, v: usize) -> Self {
        self.data_cache_max_item_bytes = v;
        self
    }

    pub fn with_directory_cache_max_entries(mut self, v: usize) -> Self {
        self.directory_cache_max_entries = v;
        self
    }

    /// True when `mutation_buffer_size` is the write-through sentinel.
    pub fn write_through(&self) -> bool {
        self.mutation_buffer_size < 0
    }
}

struct Inner {
    core: MemcacheCore,
    backend: Arc<dyn FilesystemBackend>,
    metrics: Arc<StoreMetrics>,
    config: StoreConfig,
}

/// Wraps the memcache core, enqueues durable mutations on a bounded
/// channel, and dispatches them to a fixed pool of writer workers that
/// apply them to the filesystem backend. Construct with [`Self::new`]
/// (sizes + backend), then [`Self::start`] to spawn the worker pool bound
/// to an external [`CancellationToken`].
pub struct WriteBehindStore {
    inner: Arc<Inner>,
    sender: OnceCell<mpsc::Sender<Mutation>>,
    cancel: OnceCell<CancellationToken>,
}

impl WriteBehindStore {
    pub fn new(config: StoreConfig, backend: Arc<dyn FilesystemBackend>) -> Self {
        Self::with_registry(config, backend, &Registry::new())
    }

    /// As [`Self::new`], registering metrics against the caller-supplied
    /// registry instead of a fresh default one (so multiple stores in one
    /// process, e.g. in tests, do not collide on metric names).
    pub fn with_registry(
        config: StoreConfig,
        backend: Arc<dyn FilesystemBackend>,
        registry: &Registry,
    ) -> Self {
        let metrics = Arc::new(StoreMetrics::new(registry));
        let data = DataCache::with_expiry(
            config.data_cache_max_entries,
            config.data_cache_max_item_bytes,
            Duration::from_secs(config.expiry_window_secs),
            |p: &Path| p.ends_with_sentinel(HEARTBEAT_SENTINEL),
        );
        let directories = DirectoryCache::new(config.directory_cache_max_entries);
        let core = MemcacheCore::new(data, directories, Box::new(FileBackedResolver));

        WriteBehindStore {
            inner: Arc::new(Inner {
                core,
                backend,
                metrics,
                config,
            }),
            sender: OnceCell::new(),
            cancel: OnceCell::new(),
        }
    }

    pub fn metrics(&self) -> &Arc<StoreMetrics> {
        &self.inner.metrics
    }

    /// Spawns the writer-worker pool bound to `cancel`. Idempotent: a
    /// second call on an already-started store is a no-op.
    pub async fn start(&self, cancel: CancellationToken) {
        if self.sender.initialized() {
            return;
        }

        let capacity: usize = if self.inner.config.write_through() {
            1
        } else {
            usize::try_from(self.inner.config.mutation_buffer_size)
                .unwrap_or(1)
                .max(1)
        };
        let (tx, rx) = mpsc::channel(capacity);
        if self.sender.set(tx).is_err() {
            return;
        }
        let _ = self.cancel.set(cancel.clone());

        let rx = Arc::new(AsyncMutex::new(rx));
        let writer_count = self.inner.config.writer_count;
        for _ in 0..writer_count {
            let inner = self.inner.clone();
            let rx = rx.clone();
            let worker_cancel = cancel.clone();
            tokio::spawn(async move {
                Self::writer_loop(inner, rx, worker_cancel).await;
            });
        }
        tracing::info!(writer_count, "write-behind store started");
    }

    async fn writer_loop(
        inner: Arc<Inner>,
        rx: Arc<AsyncMutex<mpsc::Receiver<Mutation>>>,
        cancel: CancellationToken,
    ) {
        inner.metrics.idle_writers.inc();
        loop {
            let mutation = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                m = async { rx.lock().await.recv().await } => m,
            };
            let Some(mutation) = mutation else {
                break;
            };
            inner.metrics.idle_writers.dec();
            Self::apply_mutation(&inner, mutation).await;
            inner.metrics.idle_writers.inc();
        }
        inner.metrics.idle_writers.dec();
        tracing::debug!("writer worker exiting");
    }

    async fn apply_mutation(inner: &Inner, mutation: Mutation) {
        use crate::mutation::MutationKind;

        let Mutation {
            kind,
            path,
            completion,
            on_persisted,
        } = mutation;

        match kind {
            MutationKind::Set { bytes } => {
                if let Err(e) = inner.backend.write_content(&path, &bytes).await {
                    tracing::error!(
                        path = %path,
                        error = %e,
                        "writer failed to persist SET; in-memory cache stays authoritative, disk diverges"
                    );
                }
                if let Some(cb) = on_persisted {
                    cb();
                }
            }
            MutationKind::Delete => {
                if let Err(e) = inner.backend.delete_subject(&path).await {
                    tracing::error!(
                        path = %path,
                        error = %e,
                        "writer failed to persist DELETE; in-memory cache stays authoritative, disk diverges"
                    );
                }
            }
        }

        Self::invalidate_ancestors(inner, &path);
        let _ = completion.send(());
    }

    /// Bottom-up directory-cache invalidation: any ancestor holding
    /// only a lower-bound listing is dropped; full listings were already
    /// maintained in-memory at submission time and are left alone.
    fn invalidate_ancestors(inner: &Inner, path: &Path) {
        for ancestor in path.ancestors() {
            if let Some(meta) = inner.core.directory_cache().get(&ancestor) {
                if !meta.is_full() {
                    inner.core.directory_cache().remove(&ancestor);
                }
            }
        }
    }

    /// Decode the cached payload into `T`, falling back to the filesystem
    /// backend and repopulating the cache on a miss.
    pub async fn get_subject<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        match self.inner.core.get_subject::<T>(path) {
            Ok(value) => {
                self.inner.metrics.data_hit.inc();
                Ok(value)
            }
            Err(StoreError::NotFound) => {
                self.inner.metrics.data_miss.inc();
                let bytes = self.inner.backend.read_content(path).await?;
                self.inner.core.set_data(path, bytes.clone());
                payload::decode(path.encoding(), &bytes)
            }
            Err(e) => Err(e),
        }
    }

    /// As [`Self::get_subject`] but returns raw bytes without decoding.
    pub async fn get_buffer(&self, path: &Path) -> Result<bytes::Bytes> {
        match self.inner.core.get_buffer(path) {
            Ok(bytes) => {
                self.inner.metrics.data_hit.inc();
                Ok(bytes)
            }
            Err(StoreError::NotFound) => {
                self.inner.metrics.data_miss.inc();
                let bytes = self.inner.backend.read_content(path).await?;
                self.inner.core.set_data(path, bytes.clone());
                Ok(bytes)
            }
            Err(e) => Err(e),
        }
    }

    /// Encode and submit a Set mutation. Updates the memcache synchronously
    /// (read-after-write), then enqueues the persist.
    pub async fn set_subject<T: Serialize>(&self, path: &Path, msg: &T) -> Result<()> {
        self.set_subject_with_completion(path, msg, None).await
    }

    pub async fn set_subject_with_completion<T: Serialize>(
        &self,
        path: &Path,
        msg: &T,
        on_persisted: Option<PostPersistCallback>,
    ) -> Result<()> {
        let bytes = payload::encode(path.encoding(), msg)?;
        self.set_buffer_inner(path, bytes::Bytes::from(bytes), on_persisted)
            .await
    }

    /// As [`Self::set_subject`] but with pre-encoded bytes.
    pub async fn set_buffer(&self, path: &Path, bytes: bytes::Bytes) -> Result<()> {
        self.set_buffer_inner(path, bytes, None).await
    }

    async fn set_buffer_inner(
        &self,
        path: &Path,
        bytes: bytes::Bytes,
        on_persisted: Option<PostPersistCallback>,
    ) -> Result<()> {
        self.inner.core.set_data(path, bytes.clone());
        let (tx, rx) = oneshot::channel();
        let mutation = Mutation::set(path.clone(), bytes, tx, on_persisted);
        self.submit(mutation, rx).await
    }

    /// Remove from the memcache synchronously, then enqueue a Delete
    /// mutation honoring the same shutdown and write-through semantics as
    /// [`Self::set_subject`].
    pub async fn delete_subject(&self, path: &Path) -> Result<()> {
        self.inner.core.delete_subject(path);
        let (tx, rx) = oneshot::channel();
        let mutation = Mutation::delete(path.clone(), tx);
        self.submit(mutation, rx).await
    }

    /// Must not hold any coarse lock while touching the filesystem backend
    /// (deadlock risk with writer workers acquiring the caches' own locks).
    pub async fn list_children(&self, path: &Path) -> Result<Vec<Path>> {
        if let Some(children) = self.inner.core.list_children(path) {
            self.inner.metrics.dir_hit.inc();
            return Ok(children);
        }
        self.inner.metrics.dir_miss.inc();
        let children = self.inner.backend.list_children(path).await?;
        self.inner.core.set_children(path, children.clone());
        Ok(children)
    }

    async fn submit(&self, mutation: Mutation, completion: oneshot::Receiver<()>) -> Result<()> {
        let Some(sender) = self.sender.get() else {
            tracing::warn!("mutation submitted before store start(); dropping without persisting");
            return Ok(());
        };
        let cancel = self.cancel.get().cloned().unwrap_or_default();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(());
            }
            send_result = sender.send(mutation) => {
                if send_result.is_err() {
                    return Ok(());
                }
            }
        }

        if self.inner.config.write_through() {
            let _ = completion.await;
        }
        Ok(())
    }
}
