use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use super::TEST_PREFIX;
use crate::KvStore;
use crate::MemoryStore;
use crate::Result;
use crate::StoreError;
use crate::WatchEvent;

pub fn test_key(relative: &str) -> String {
    format!("{TEST_PREFIX}/{relative}")
}

/// Memory store pre-populated with a remote copy of [`super::GeneralConfig`]
pub fn populated_store() -> Arc<MemoryStore> {
    let store = MemoryStore::default();
    store.put(test_key("name"), "remote");
    store.put(test_key("log/level"), "debug");
    store.put(test_key("log/max_files"), 7u32.to_be_bytes().to_vec());
    store.put(test_key("log/log_rotation"), "true");
    store.put(test_key("log/sample_ratio"), "0.25");
    store.put(test_key("log/backlog"), "-12");
    store.put(test_key("log/outputs"), r#"["stdout","file"]"#);
    store.put(test_key("log/fields"), r#"{"region":"eu"}"#);
    store.put(test_key("server/port"), 9090u16.to_be_bytes().to_vec());
    store.put(test_key("server/workers"), "8");
    Arc::new(store)
}

/// Store whose reads take `delay`; it does not support watches
pub struct SlowStore {
    pub delay: Duration,
}

#[async_trait]
impl KvStore for SlowStore {
    async fn get(
        &self,
        _key: &str,
    ) -> Result<Option<Bytes>> {
        tokio::time::sleep(self.delay).await;
        Ok(None)
    }

    async fn watch_prefix(
        &self,
        _prefix: &str,
    ) -> Result<mpsc::Receiver<WatchEvent>> {
        Err(StoreError::Unavailable("slow store does not support watches".into()).into())
    }
}
