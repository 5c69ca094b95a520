use std::sync::Arc;

use dirkv_store::{Encoding, LocalFilesystemBackend, Path, StoreConfig, WriteBehindStore};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Serialize, Deserialize)]
struct Heartbeat {
    seen_at: u64,
}

/// Thin executable exercising the store end to end: set, get, list, delete
/// against a throwaway directory under the system temp dir. Mirrors this
/// codebase's own `main.rs` bootstrap sequence (init tracing, build the
/// long-lived object, run), sized to what this crate actually needs instead
/// of a full proxy server bring-up.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .init();

    let root = std::env::temp_dir().join("dirkv-store-demo");
    tokio::fs::create_dir_all(&root).await?;
    tracing::info!(root = %root.display(), "starting demo store");

    let backend = Arc::new(LocalFilesystemBackend::new(&root));
    let store = WriteBehindStore::new(StoreConfig::default(), backend);

    let cancel = CancellationToken::new();
    store.start(cancel.clone()).await;

    let subject = Path::new(["hosts", "demo-host", "heartbeat.json.db"], Encoding::Json);
    store
        .set_subject(&subject, &Heartbeat { seen_at: 1 })
        .await?;

    let got: Heartbeat = store.get_subject(&subject).await?;
    tracing::info!(seen_at = got.seen_at, "read back subject");

    let dir = Path::new(["hosts", "demo-host"], Encoding::Json);
    let children = store.list_children(&dir).await?;
    tracing::info!(count = children.len(), "listed directory children");

    store.delete_subject(&subject).await?;
    match store.get_subject::<Heartbeat>(&subject).await {
        Err(e) if e.is_not_found() => tracing::info!("delete visible: subject now not found"),
        other => tracing::warn!(?other, "expected NotFound after delete"),
    }

    cancel.cancel();
    Ok(())
}
