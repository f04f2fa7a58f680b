use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;
use crate::MAX_KEY_DEPTH;

/// Key derivation parameters
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KeyMapConfig {
    /// Maximum number of path segments of a synchronized field
    /// Default: 5
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for KeyMapConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

impl KeyMapConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(Error::Config(ConfigError::Message(
                "key_map.max_depth must be greater than 0".into(),
            )));
        }
        Ok(())
    }
}

fn default_max_depth() -> usize {
    MAX_KEY_DEPTH
}
