//! In-process realtime store.
//!
//! Paths map store-generated keys to JSON values. Writers push single
//! records or remove a whole path; subscribers receive the full current
//! mapping of their path on subscribe and again after every change to it.
//!
//! ```text
//! push/remove ──► nodes[path] ──► tx.send(path)
//!                                    │
//!                  Subscription(path) ◄┘  re-reads nodes[path]
//! ```

use std::{collections::{BTreeMap, HashMap}, sync::Arc};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::AppResult;

/// Full value of one path, in key order.
pub type Snapshot = BTreeMap<String, Value>;

pub fn chat_path(group_id: i64) -> String {
    format!("chats/{group_id}")
}

pub fn whiteboard_path(group_id: i64) -> String {
    format!("whiteboards/{group_id}")
}

pub struct RealtimeStore {
    nodes: RwLock<HashMap<String, Snapshot>>,
    tx: broadcast::Sender<Arc<str>>,
}

impl RealtimeStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            tx: broadcast::channel(capacity.max(1)).0,
        }
    }

    /// Appends `value` under a fresh key and returns the key. Keys are
    /// unique and sort in creation order.
    pub async fn push(&self, path: &str, value: impl Serialize) -> AppResult<String> {
        let value = serde_json::to_value(value)?;

        let mut nodes = self.nodes.write().await;
        let entries = nodes.entry(path.to_owned()).or_default();
        let mut key = Uuid::now_v7().simple().to_string();
        while entries.last_key_value().is_some_and(|(last, _)| *last >= key) {
            key = Uuid::now_v7().simple().to_string();
        }
        entries.insert(key.clone(), value);
        drop(nodes);

        self.notify(path);
        Ok(key)
    }

    /// Deletes everything under `path`.
    pub async fn remove(&self, path: &str) {
        let removed = self.nodes.write().await.remove(path);
        if let Some(removed) = removed {
            tracing::debug!("removed {} entries from {path}", removed.len());
        }
        self.notify(path);
    }

    pub async fn snapshot(&self, path: &str) -> Snapshot {
        self.nodes.read().await.get(path).cloned().unwrap_or_default()
    }

    /// Listens to `path`. The listener is released when the subscription drops.
    pub fn subscribe(self: &Arc<Self>, path: impl Into<String>) -> Subscription {
        Subscription {
            store: Arc::clone(self),
            path: path.into(),
            rx: self.tx.subscribe(),
            primed: false,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn notify(&self, path: &str) {
        // no receivers is fine
        let _ = self.tx.send(Arc::from(path));
    }
}

pub struct Subscription {
    store: Arc<RealtimeStore>,
    path: String,
    rx: broadcast::Receiver<Arc<str>>,
    primed: bool,
}

impl Subscription {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The current snapshot on the first call; afterwards waits for the next
    /// change to this path and returns the whole path again. `None` if the
    /// notification channel closed.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if !self.primed {
            self.primed = true;
            return Some(self.store.snapshot(&self.path).await);
        }

        loop {
            match self.rx.recv().await {
                Ok(path) if *path == *self.path => break,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("{} lagged by {skipped} notifications, re-reading", self.path);
                    break;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }

        Some(self.store.snapshot(&self.path).await)
    }
}
