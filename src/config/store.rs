use std::fmt::Debug;
use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Remote store connection parameters
#[derive(Serialize, Deserialize, Clone)]
pub struct StoreConfig {
    /// Store endpoints, e.g. `http://127.0.0.1:2379`
    /// Default: ["http://127.0.0.1:2379"]
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// Authentication user name
    /// Default: none
    #[serde(default)]
    pub username: Option<String>,

    /// Authentication password
    /// Default: none
    #[serde(default)]
    pub password: Option<String>,

    /// Maximum time to wait for establishing a connection
    /// Default: 5000ms
    #[serde(default = "default_dial_timeout_in_ms")]
    pub dial_timeout_in_ms: u64,

    /// Deadline of one snapshot load (all keys together)
    /// Default: 3000ms
    #[serde(default = "default_request_timeout_in_ms")]
    pub request_timeout_in_ms: u64,
}

impl Debug for StoreConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("endpoints", &self.endpoints)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("dial_timeout_in_ms", &self.dial_timeout_in_ms)
            .field("request_timeout_in_ms", &self.request_timeout_in_ms)
            .finish()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            username: None,
            password: None,
            dial_timeout_in_ms: default_dial_timeout_in_ms(),
            request_timeout_in_ms: default_request_timeout_in_ms(),
        }
    }
}

impl StoreConfig {
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_in_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_in_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "store.endpoints must contain at least one endpoint".into(),
            )));
        }

        if self.dial_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "store.dial_timeout_in_ms must be greater than 0".into(),
            )));
        }

        if self.request_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "store.request_timeout_in_ms must be greater than 0".into(),
            )));
        }

        if self.password.is_some() && self.username.is_none() {
            return Err(Error::Config(ConfigError::Message(
                "store.password requires store.username".into(),
            )));
        }

        Ok(())
    }
}

fn default_endpoints() -> Vec<String> {
    vec!["http://127.0.0.1:2379".into()]
}
fn default_dial_timeout_in_ms() -> u64 {
    5000
}
fn default_request_timeout_in_ms() -> u64 {
    3000
}
