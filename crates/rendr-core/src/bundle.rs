//! Compiled bundle snapshots.
//!
//! A [`BundleSnapshot`] is immutable once built. [`BundleStore`] publishes new
//! snapshots wholesale; readers clone an `Arc` at the start of a request and
//! keep that view for the rest of it, so a recompile in the middle of a render
//! can never hand out a half-updated bundle.

use crate::assets::AssetCache;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::watch;

/// Server-side artifacts produced by the bundler.
#[derive(Debug, Clone)]
pub enum Artifacts {
    /// Server bundle descriptor plus client manifest (routed backend).
    /// Both are owned by the framework and treated as opaque JSON.
    Bundle {
        server_bundle: Value,
        client_manifest: Value,
    },
    /// Directory of compiled server-side component modules (component backend).
    Modules { server_root: PathBuf },
}

impl Artifacts {
    /// Short name for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Artifacts::Bundle { .. } => "server bundle",
            Artifacts::Modules { .. } => "component module",
        }
    }
}

/// One successful compile.
#[derive(Debug, Clone)]
pub struct BundleSnapshot {
    /// Monotonic publish counter, starting at 1
    pub generation: u64,
    /// Server-side artifacts
    pub artifacts: Artifacts,
    /// Client assets for in-memory serving
    pub assets: AssetCache,
    /// When the snapshot was published
    pub compiled_at: SystemTime,
}

/// Holder for the most recent successful snapshot.
#[derive(Debug)]
pub struct BundleStore {
    tx: watch::Sender<Option<Arc<BundleSnapshot>>>,
    generation: AtomicU64,
}

impl BundleStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx,
            generation: AtomicU64::new(0),
        }
    }

    /// Publish a new snapshot, replacing the previous one.
    pub fn publish(&self, artifacts: Artifacts, assets: AssetCache) -> Arc<BundleSnapshot> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(BundleSnapshot {
            generation,
            artifacts,
            assets,
            compiled_at: SystemTime::now(),
        });

        self.tx.send_replace(Some(Arc::clone(&snapshot)));
        tracing::debug!("Published bundle generation {}", generation);
        snapshot
    }

    /// Current snapshot, never blocks. `None` until the first publish.
    pub fn current(&self) -> Option<Arc<BundleSnapshot>> {
        self.tx.borrow().clone()
    }

    /// Wait until at least one snapshot has been published.
    pub async fn ready(&self) -> Option<Arc<BundleSnapshot>> {
        let mut rx = self.tx.subscribe();
        let snapshot = rx.wait_for(Option::is_some).await.ok()?.clone();
        snapshot
    }

    /// Generation of the current snapshot, 0 if none.
    pub fn generation(&self) -> u64 {
        self.current().map(|s| s.generation).unwrap_or(0)
    }
}

impl Default for BundleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn bundle(tag: &str) -> Artifacts {
        Artifacts::Bundle {
            server_bundle: json!({ "entry": tag }),
            client_manifest: json!({ "initial": [] }),
        }
    }

    #[test]
    fn test_publish_replaces_snapshot() {
        let store = BundleStore::new();
        assert!(store.current().is_none());
        assert_eq!(store.generation(), 0);

        let first = store.publish(bundle("a"), AssetCache::new());
        assert_eq!(first.generation, 1);

        let held = store.current().unwrap();
        let second = store.publish(bundle("b"), AssetCache::new());
        assert_eq!(second.generation, 2);
        assert_eq!(store.generation(), 2);

        // A reader that took the first snapshot keeps seeing it
        match &held.artifacts {
            Artifacts::Bundle { server_bundle, .. } => {
                assert_eq!(server_bundle["entry"], "a");
            }
            other => panic!("unexpected artifacts: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ready_waits_for_first_publish() {
        let store = Arc::new(BundleStore::new());

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.ready().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        store.publish(bundle("a"), AssetCache::new());
        let snapshot = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.generation, 1);
    }

    #[tokio::test]
    async fn test_ready_returns_immediately_when_published() {
        let store = BundleStore::new();
        store.publish(bundle("a"), AssetCache::new());
        assert_eq!(store.ready().await.unwrap().generation, 1);
    }
}
