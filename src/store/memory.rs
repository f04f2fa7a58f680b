use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::Connect;
use super::KvStore;
use super::WatchEvent;
use crate::Result;
use crate::LiveConfigSettings;
use crate::StoreError;

const DEFAULT_WATCHER_BUFFER_SIZE: usize = 128;

/// Internal prefix watcher state
#[derive(Debug)]
struct PrefixWatcher {
    prefix: String,
    sender: mpsc::Sender<WatchEvent>,
}

/// In-memory key-value store with prefix watches.
///
/// Writes notify every watcher whose prefix matches the key. Notification is
/// non-blocking: when a watcher's channel is full the event is dropped for that
/// watcher, and watchers whose receiver is gone are pruned.
#[derive(Debug)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, Bytes>>,

    /// Watchers by id
    watchers: DashMap<u64, PrefixWatcher>,

    /// Next watcher ID (monotonically increasing)
    next_id: AtomicU64,

    watcher_buffer_size: usize,

    /// Reads fail with [`StoreError::Unavailable`] while false
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_WATCHER_BUFFER_SIZE)
    }
}

impl MemoryStore {
    pub fn new(watcher_buffer_size: usize) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            watchers: DashMap::new(),
            next_id: AtomicU64::new(1),
            watcher_buffer_size: watcher_buffer_size.max(1),
            available: AtomicBool::new(true),
        }
    }

    /// Stores a value and notifies matching watchers
    pub fn put(
        &self,
        key: impl Into<String>,
        value: impl Into<Bytes>,
    ) {
        let key = key.into();
        let value = value.into();
        self.data.write().insert(key.clone(), value.clone());
        self.dispatch(WatchEvent::put(key, value));
    }

    /// Removes a key and notifies matching watchers if it existed
    pub fn delete(
        &self,
        key: &str,
    ) -> bool {
        let removed = self.data.write().remove(key).is_some();
        if removed {
            self.dispatch(WatchEvent::delete(key.to_string()));
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Simulates an outage of the store
    pub fn set_available(
        &self,
        available: bool,
    ) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of live prefix watchers
    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store is offline".into()).into())
        }
    }

    fn dispatch(
        &self,
        event: WatchEvent,
    ) {
        let key = event.key_str().into_owned();
        let mut closed = Vec::new();

        for watcher in self.watchers.iter() {
            if !key.starts_with(&watcher.prefix) {
                continue;
            }
            match watcher.sender.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(watcher_id = *watcher.key(), key = %key, "Watcher buffer full, event dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(*watcher.key()),
            }
        }

        for id in closed {
            self.watchers.remove(&id);
            trace!(watcher_id = id, "Watcher unregistered");
        }

        trace!(key = %key, event_type = ?event.event_type, "Event dispatched");
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(
        &self,
        key: &str,
    ) -> Result<Option<Bytes>> {
        self.ensure_available()?;
        Ok(self.data.read().get(key).cloned())
    }

    async fn watch_prefix(
        &self,
        prefix: &str,
    ) -> Result<mpsc::Receiver<WatchEvent>> {
        self.ensure_available()?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.watcher_buffer_size);
        self.watchers.insert(
            id,
            PrefixWatcher {
                prefix: prefix.to_string(),
                sender,
            },
        );

        trace!(
            watcher_id = id,
            prefix = %prefix,
            buffer_size = self.watcher_buffer_size,
            "Watcher registered"
        );
        Ok(receiver)
    }
}

#[async_trait]
impl Connect for MemoryStore {
    async fn connect(settings: &LiveConfigSettings) -> Result<Self> {
        let config = &settings.store;
        if config.endpoints.is_empty() {
            return Err(StoreError::Connection("no store endpoints configured".into()).into());
        }
        if let Some(endpoint) = config.endpoints.iter().find(|e| e.trim().is_empty()) {
            return Err(StoreError::Connection(format!("invalid store endpoint {endpoint:?}")).into());
        }

        debug!(endpoints = ?config.endpoints, "Memory store connected");
        Ok(Self::new(settings.watch.watcher_buffer_size))
    }
}
