use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Change watcher parameters
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchConfig {
    /// Per-watcher event buffer of in-process stores
    /// Default: 128
    #[serde(default = "default_watcher_buffer_size")]
    pub watcher_buffer_size: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            watcher_buffer_size: default_watcher_buffer_size(),
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.watcher_buffer_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watch.watcher_buffer_size must be greater than 0".into(),
            )));
        }
        Ok(())
    }
}

fn default_watcher_buffer_size() -> usize {
    128
}
