//! Configuration management for the live config engine.
//!
//! Two kinds of configuration live here:
//! - [`LiveConfigSettings`]: settings of the engine itself (store connection, watch
//!   buffers, key depth), layered from defaults, a file and environment variables
//! - [`load_defaults`]: loading of the *user's* record defaults from local files,
//!   before remote values override them
mod defaults;
mod key_map;
mod store;
mod watch;
pub use defaults::*;
pub use key_map::*;
pub use store::*;
pub use watch::*;


use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Prefix of environment variables overriding [`LiveConfigSettings`]
pub const ENV_PREFIX: &str = "LIVECONF";

/// Main configuration container of the engine
///
/// Hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables, e.g. `LIVECONF__STORE__REQUEST_TIMEOUT_IN_MS` (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct LiveConfigSettings {
    /// Remote store connection parameters
    #[serde(default)]
    pub store: StoreConfig,
    /// Change watcher parameters
    #[serde(default)]
    pub watch: WatchConfig,
    /// Key derivation parameters
    #[serde(default)]
    pub key_map: KeyMapConfig,
}

impl LiveConfigSettings {
    /// Loads settings from hierarchical sources without validation.
    ///
    /// Callers MUST call `validate()` after all overrides are applied.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "config/liveconf.toml");
    /// std::env::set_var("LIVECONF__STORE__REQUEST_TIMEOUT_IN_MS", "500");
    /// let settings = LiveConfigSettings::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let settings: Self = builder.build()?.try_deserialize()?;
        Ok(settings) // No validation - deferred to validate()
    }

    /// Applies additional overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let settings: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(settings) // No validation - deferred to validate()
    }

    /// Validates every section and returns the validated instance
    pub fn validate(self) -> Result<Self> {
        self.store.validate()?;
        self.watch.validate()?;
        self.key_map.validate()?;
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
