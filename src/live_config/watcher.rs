use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;
use tracing::warn;
use tracing::Instrument;

use super::SharedRecord;
use super::SyncRecord;
use crate::coerce;
use crate::CallbackRegistry;
use crate::FieldDescriptor;
use crate::KeyMap;
use crate::Result;
use crate::StagedValues;
use crate::WatchEvent;
use crate::WatchEventType;

/// Background consumer of the prefix change stream
pub(super) struct Watcher<T> {
    pub(super) key_map: Arc<KeyMap>,
    pub(super) callbacks: Arc<CallbackRegistry>,
    pub(super) record: SharedRecord<T>,
    pub(super) max_depth: usize,
    pub(super) cancellation_token: CancellationToken,
}

impl<T> Watcher<T>
where
    T: SyncRecord,
{
    /// Consumes an already subscribed stream on a new task
    pub(super) fn spawn(
        self,
        prefix: String,
        events: mpsc::Receiver<WatchEvent>,
    ) -> JoinHandle<()> {
        // Keep the caller's span so task logs stay attributable
        tokio::spawn(async move { self.run(&prefix, events).await }.in_current_span())
    }

    async fn run(
        &self,
        prefix: &str,
        mut events: mpsc::Receiver<WatchEvent>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    debug!(prefix = %prefix, "Watch cancelled");
                    return;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        debug!(prefix = %prefix, "Watch stream closed by store");
                        return;
                    }
                }
            }
        }
    }

    fn handle_event(
        &self,
        event: WatchEvent,
    ) {
        let key = event.key_str();
        if event.event_type == WatchEventType::Delete {
            trace!(key = %key, "Ignoring delete event");
            return;
        }

        if let Some(descriptor) = self.key_map.get(&key) {
            if let Err(e) = self.apply(descriptor, &event.value) {
                warn!(key = %key, error = %e, "Dropping watch event");
            }
        }

        self.callbacks.dispatch(&key);
    }

    fn apply(
        &self,
        descriptor: &FieldDescriptor,
        raw: &[u8],
    ) -> Result<()> {
        let Some(value) = coerce(descriptor, raw)? else {
            return Ok(());
        };

        let mut staged = StagedValues::new(self.max_depth);
        staged.stage(descriptor, value)?;
        staged.merge_into(&mut *self.record.write())?;

        trace!(path = %descriptor.path(), "Field updated from watch event");
        Ok(())
    }
}
