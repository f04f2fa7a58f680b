//! Per-key reload callbacks.
//!
//! Callbacks are keyed by full store key. At most one callback is kept per key;
//! registering again replaces the previous one, and callbacks are never removed.
//! Dispatch clones the callback out of the map before invoking it, so a callback
//! may register other callbacks without deadlocking.

#[cfg(test)]
mod callback_test;

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

/// Invoked with the full store key after the key's value was reloaded
pub type ReloadCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
pub struct CallbackRegistry {
    callbacks: DashMap<String, ReloadCallback>,
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("keys", &self.callbacks.len())
            .finish()
    }
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `key`, returning the callback it replaced
    pub fn register(
        &self,
        key: impl Into<String>,
        callback: ReloadCallback,
    ) -> Option<ReloadCallback> {
        let key = key.into();
        trace!(key = %key, "Reload callback registered");
        self.callbacks.insert(key, callback)
    }

    /// Invokes the callback of `key` if any. Returns whether one was invoked.
    pub fn dispatch(
        &self,
        key: &str,
    ) -> bool {
        // Shard guard must be released before the call
        let callback = match self.callbacks.get(key) {
            Some(entry) => Arc::clone(entry.value()),
            None => return false,
        };

        trace!(key = %key, "Invoking reload callback");
        callback(key);
        true
    }

    pub fn contains(
        &self,
        key: &str,
    ) -> bool {
        self.callbacks.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}
