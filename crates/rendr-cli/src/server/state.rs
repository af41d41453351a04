//! Shared state for the render server.
//!
//! The supervisor owns bundle state; this only adds the reload client
//! registry on top of it.

use parking_lot::RwLock;
use rendr_core::{Pipeline, Supervisor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Events pushed to connected reload clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DevEvent {
    /// A source change triggered a rebuild
    BuildStarted,

    /// A new snapshot was published; clients reload on this
    BuildCompleted { generation: u64, duration_ms: u64 },

    /// Client connected
    ClientConnected { id: usize },
}

/// Connected SSE clients.
#[derive(Debug, Default)]
pub struct ReloadHub {
    clients: RwLock<HashMap<usize, mpsc::Sender<String>>>,
    next_id: AtomicUsize,
}

impl ReloadHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new SSE client.
    ///
    /// Returns the client id and the receiver its events arrive on.
    pub fn register(&self) -> (usize, mpsc::Receiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(100);
        self.clients.write().insert(id, tx);
        (id, rx)
    }

    pub fn unregister(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    /// Send `event` to every client, dropping the ones that went away.
    pub async fn broadcast(&self, event: &DevEvent) {
        let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());

        // Never hold the lock across an await
        let clients: Vec<_> = self
            .clients
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut gone = Vec::new();
        for (id, tx) in clients {
            if tx.send(json.clone()).await.is_err() {
                gone.push(id);
            }
        }

        for id in gone {
            tracing::debug!("Reload client {} disconnected", id);
            self.unregister(id);
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }
}

/// Everything a request handler needs.
pub struct AppState {
    pub supervisor: Arc<Supervisor>,
    pub pipeline: Pipeline,
    pub reload: ReloadHub,
}

impl AppState {
    pub fn new(supervisor: Arc<Supervisor>, pipeline: Pipeline) -> Self {
        Self {
            supervisor,
            pipeline,
            reload: ReloadHub::new(),
        }
    }

    /// Whether this process serves client assets and reload events itself.
    pub fn is_dev(&self) -> bool {
        self.pipeline.assets().is_dev()
    }
}

/// Shared state handle for the router.
pub type SharedState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&DevEvent::BuildCompleted {
            generation: 2,
            duration_ms: 120,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"type":"BuildCompleted","generation":2,"duration_ms":120}"#
        );

        let json = serde_json::to_string(&DevEvent::BuildStarted).unwrap();
        assert_eq!(json, r#"{"type":"BuildStarted"}"#);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_clients() {
        let hub = ReloadHub::new();
        let (first, mut rx1) = hub.register();
        let (second, mut rx2) = hub.register();
        assert_ne!(first, second);
        assert_eq!(hub.client_count(), 2);

        hub.broadcast(&DevEvent::BuildStarted).await;

        assert_eq!(rx1.recv().await.unwrap(), r#"{"type":"BuildStarted"}"#);
        assert_eq!(rx2.recv().await.unwrap(), r#"{"type":"BuildStarted"}"#);
    }

    #[tokio::test]
    async fn test_broadcast_drops_closed_clients() {
        let hub = ReloadHub::new();
        let (_, rx) = hub.register();
        let (_, mut live) = hub.register();
        drop(rx);

        hub.broadcast(&DevEvent::ClientConnected { id: 7 }).await;

        assert_eq!(hub.client_count(), 1);
        assert!(live.recv().await.unwrap().contains("ClientConnected"));
    }
}
