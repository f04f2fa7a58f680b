//! Live configuration engine.
//!
//! Binds one record to a key prefix of a remote store:
//!
//! ```text
//!              load_snapshot()                     watch()
//!  store ──get(key)──┐                 store ──watch_prefix──┐
//!                    ▼                                       ▼
//!                coerce ─► stage ─► merge (write lock) ─► dispatch callbacks
//! ```
//!
//! The record is shared as [`SharedRecord`]. Readers take the read lock; every
//! merge holds the write lock only while it assigns the staged fields.

mod builder;
mod watcher;
pub use builder::*;


use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::timeout_at;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;

use crate::coerce;
use crate::CallbackRegistry;
use crate::KeyMap;
use crate::KvStore;
use crate::LiveConfigSettings;
use crate::LiveRecord;
use crate::Result;
use crate::StagedValues;
use crate::StoreError;
use crate::KEY_DELIMITER;
use watcher::Watcher;

/// The synchronized record, shared with the watch task
pub type SharedRecord<T> = Arc<RwLock<T>>;

/// Record types the engine can keep in sync
pub trait SyncRecord: LiveRecord + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> SyncRecord for T where T: LiveRecord + Serialize + DeserializeOwned + Send + Sync + 'static {}

pub struct LiveConfig<T, S: ?Sized> {
    key_map: Arc<KeyMap>,
    callbacks: Arc<CallbackRegistry>,
    record: SharedRecord<T>,
    store: Arc<S>,
    settings: LiveConfigSettings,
    cancellation_token: CancellationToken,
}

impl<T, S> std::fmt::Debug for LiveConfig<T, S>
where
    S: ?Sized,
{
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LiveConfig")
            .field("prefix", &self.key_map.prefix())
            .field("keys", &self.key_map.len())
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl<T, S> LiveConfig<T, S>
where
    T: SyncRecord,
    S: KvStore + ?Sized,
{
    /// Derives the key map of `record` under `prefix`.
    ///
    /// `settings` are expected to be validated.
    pub(crate) fn new(
        prefix: &str,
        record: T,
        store: Arc<S>,
        settings: LiveConfigSettings,
        cancellation_token: CancellationToken,
    ) -> Result<Self> {
        let tree = serde_json::to_value(&record).map_err(crate::Error::Merge)?;
        let key_map = KeyMap::build(prefix, &T::schema(), &tree, settings.key_map.max_depth)?;

        Ok(Self {
            key_map: Arc::new(key_map),
            callbacks: Arc::new(CallbackRegistry::new()),
            record: Arc::new(RwLock::new(record)),
            store,
            settings,
            cancellation_token,
        })
    }

    /// Reads every mapped key once and merges the present values into the record.
    ///
    /// All reads share one deadline of `store.request_timeout`. The first failure
    /// aborts the load and nothing is merged. After a successful load the callback
    /// of every mapped key is invoked, whether or not its value changed.
    ///
    /// # Errors
    /// - [`StoreError::Timeout`] when the deadline passes
    /// - store errors returned by [`KvStore::get`]
    /// - [`crate::CoerceError`] when a value does not fit its field
    /// - [`crate::Error::Merge`] when a value does not decode into its field
    pub async fn load_snapshot(&self) -> Result<()> {
        let request_timeout = self.settings.store.request_timeout();
        let deadline = Instant::now() + request_timeout;
        let mut staged = StagedValues::new(self.settings.key_map.max_depth);

        for (key, descriptor) in self.key_map.iter() {
            let raw = timeout_at(deadline, self.store.get(key))
                .await
                .map_err(|_| StoreError::Timeout(request_timeout))??;

            let Some(raw) = raw else {
                trace!(key = %key, "Key absent, keeping current value");
                continue;
            };

            if let Some(value) = coerce(descriptor, &raw)? {
                staged.stage(descriptor, value)?;
            }
        }

        staged.merge_into(&mut *self.record.write())?;
        debug!(
            prefix = %self.key_map.prefix(),
            loaded = staged.len(),
            "Snapshot loaded"
        );

        for key in self.key_map.keys() {
            self.callbacks.dispatch(key);
        }
        Ok(())
    }

    /// Subscribes to changes under the prefix, then spawns the change watcher.
    ///
    /// Every change published after this returns is applied. The task runs until
    /// the cancellation token fires or the store closes the stream. Failed events
    /// are logged and skipped.
    ///
    /// # Errors
    /// Store errors returned by [`KvStore::watch_prefix`]
    pub async fn watch(&self) -> Result<JoinHandle<()>> {
        // Trailing delimiter keeps `/app` from matching `/application/..`
        let prefix = format!("{}{}", self.key_map.prefix(), KEY_DELIMITER);
        let events = self.store.watch_prefix(&prefix).await?;
        debug!(prefix = %prefix, "Watch started");

        let watcher = Watcher {
            key_map: Arc::clone(&self.key_map),
            callbacks: Arc::clone(&self.callbacks),
            record: Arc::clone(&self.record),
            max_depth: self.settings.key_map.max_depth,
            cancellation_token: self.cancellation_token.clone(),
        };
        Ok(watcher.spawn(prefix, events))
    }

    /// Registers a reload callback for `key`, relative to the prefix
    /// (`log/level` for `<prefix>/log/level`).
    ///
    /// Returns false, without registering, when the key is not mapped to a field.
    /// Registering a key again replaces its callback.
    pub fn register_callback<F>(
        &self,
        key: &str,
        callback: F,
    ) -> bool
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let full_key = self.key_map.full_key(key);
        if !self.key_map.contains_key(&full_key) {
            debug!(key = %full_key, "Callback rejected: key is not mapped");
            return false;
        }
        self.callbacks.register(full_key, Arc::new(callback));
        true
    }
}

impl<T, S: ?Sized> LiveConfig<T, S> {
    pub fn record(&self) -> SharedRecord<T> {
        Arc::clone(&self.record)
    }

    /// Copy of the current record
    pub fn snapshot(&self) -> T
    where
        T: Clone,
    {
        self.record.read().clone()
    }

    pub fn key_map(&self) -> &KeyMap {
        &self.key_map
    }

    pub fn settings(&self) -> &LiveConfigSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Cancelling the token stops every watch task of this instance
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }
}
