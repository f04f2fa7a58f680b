//! Remote key-value store collaborator.
//!
//! The sync engine only needs two things from a store: point reads and a
//! prefix-scoped change stream. Network clients (etcd or otherwise) implement
//! [`KvStore`], and [`Connect`] when they can be built from [`LiveConfigSettings`].
//! [`MemoryStore`] is an in-process implementation with the same semantics.

mod memory;


pub use memory::*;

use std::borrow::Cow;

use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;

use crate::Result;
use crate::LiveConfigSettings;

/// Event type for watch notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventType {
    /// Key was inserted or updated
    Put,
    /// Key was deleted
    Delete,
}

/// Watch event containing key change information
#[derive(Debug, Clone)]
pub struct WatchEvent {
    /// The key that changed
    pub key: Bytes,
    /// The new value (empty for DELETE events)
    pub value: Bytes,
    /// Type of change
    pub event_type: WatchEventType,
}

impl WatchEvent {
    pub fn put(
        key: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            event_type: WatchEventType::Put,
        }
    }

    pub fn delete(key: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: Bytes::new(),
            event_type: WatchEventType::Delete,
        }
    }

    /// Key as text, lossy for non UTF-8 keys
    pub fn key_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }
}

/// Point reads and prefix watches against a hierarchical key-value store
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Reads one key.
    ///
    /// # Returns
    /// - `Ok(Some(value))` if the key exists
    /// - `Ok(None)` if the key is absent
    /// - `Err` on store or network failures
    async fn get(
        &self,
        key: &str,
    ) -> Result<Option<Bytes>>;

    /// Subscribes to changes of every key starting with `prefix`.
    ///
    /// Events are delivered in store order. The stream ends when the store drops
    /// the subscription.
    async fn watch_prefix(
        &self,
        prefix: &str,
    ) -> Result<mpsc::Receiver<WatchEvent>>;
}

/// Store clients that can be built from engine settings
#[async_trait]
pub trait Connect: KvStore + Sized {
    /// Connects using `settings.store`. Callers bound the call with
    /// `settings.store.dial_timeout()`.
    ///
    /// # Errors
    /// [`crate::StoreError::Connection`] when the endpoints are unusable
    async fn connect(settings: &LiveConfigSettings) -> Result<Self>;
}
