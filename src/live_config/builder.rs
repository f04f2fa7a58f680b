use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::LiveConfig;
use super::SyncRecord;
use crate::Connect;
use crate::DefaultsFormat;
use crate::DefaultsSource;
use crate::KvStore;
use crate::LiveConfigSettings;
use crate::Result;
use crate::StoreError;

/// Builds a [`LiveConfig`] bound to a key prefix.
///
/// ```ignore
/// let live = LiveConfigBuilder::new("/svc/config")
///     .request_timeout(Duration::from_millis(500))
///     .build(AppConfig::default(), store)?;
/// live.load_snapshot().await?;
/// let handle = live.watch().await?;
/// ```
pub struct LiveConfigBuilder {
    prefix: String,
    settings: LiveConfigSettings,
    defaults: DefaultsSource,
    cancellation_token: Option<CancellationToken>,
}

impl LiveConfigBuilder {
    /// Create a new builder with default settings for `prefix`
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            settings: LiveConfigSettings::default(),
            defaults: DefaultsSource::default(),
            cancellation_token: None,
        }
    }

    /// Store endpoints (default: `http://127.0.0.1:2379`)
    pub fn endpoints(
        mut self,
        endpoints: Vec<String>,
    ) -> Self {
        self.settings.store.endpoints = endpoints;
        self
    }

    pub fn username(
        mut self,
        username: impl Into<String>,
    ) -> Self {
        self.settings.store.username = Some(username.into());
        self
    }

    pub fn password(
        mut self,
        password: impl Into<String>,
    ) -> Self {
        self.settings.store.password = Some(password.into());
        self
    }

    /// Set connection timeout (default: 5s)
    pub fn dial_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.settings.store.dial_timeout_in_ms = saturating_millis(timeout);
        self
    }

    /// Set the deadline of one snapshot load (default: 3s)
    pub fn request_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.settings.store.request_timeout_in_ms = saturating_millis(timeout);
        self
    }

    /// Maximum number of path segments of a synchronized field (default: 5)
    pub fn max_depth(
        mut self,
        max_depth: usize,
    ) -> Self {
        self.settings.key_map.max_depth = max_depth;
        self
    }

    pub fn watch_buffer_size(
        mut self,
        size: usize,
    ) -> Self {
        self.settings.watch.watcher_buffer_size = size;
        self
    }

    /// Local default files used by [`build_from_files`](LiveConfigBuilder::build_from_files),
    /// merged in order
    pub fn filepaths<I, P>(
        mut self,
        paths: I,
    ) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.defaults.filepaths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Format of the local default files (default: yaml)
    pub fn config_type(
        mut self,
        format: DefaultsFormat,
    ) -> Self {
        self.defaults.format = format;
        self
    }

    /// Environment prefix overriding local defaults (default: none)
    pub fn env_prefix(
        mut self,
        prefix: impl Into<String>,
    ) -> Self {
        self.defaults.env_prefix = Some(prefix.into());
        self
    }

    /// Token stopping the watch task. A fresh token is created when unset.
    pub fn cancellation_token(
        mut self,
        token: CancellationToken,
    ) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Completely replaces the default settings
    ///
    /// # Warning: Configuration Override
    /// This will discard all previous settings configured through individual
    /// methods like [`request_timeout`](LiveConfigBuilder::request_timeout) or
    /// [`max_depth`](LiveConfigBuilder::max_depth). Default file options are kept.
    ///
    /// # Example
    /// ```ignore
    /// let settings = LiveConfigSettings::new()?;
    /// let builder = LiveConfigBuilder::new("/svc/config").set_config(settings);
    /// ```
    pub fn set_config(
        mut self,
        settings: LiveConfigSettings,
    ) -> Self {
        self.settings = settings;
        self
    }

    /// Build with an already connected store
    ///
    /// # Errors
    /// - [`crate::Error::Config`] on invalid settings
    /// - [`crate::SchemaError`] when the record cannot be mapped to keys
    pub fn build<T, S>(
        self,
        record: T,
        store: Arc<S>,
    ) -> Result<LiveConfig<T, S>>
    where
        T: SyncRecord,
        S: KvStore + ?Sized,
    {
        let settings = self.settings.validate()?;
        let token = self.cancellation_token.unwrap_or_else(CancellationToken::new);
        let live = LiveConfig::new(&self.prefix, record, store, settings, token)?;

        debug!(?live, "Live config initialized");
        Ok(live)
    }

    /// Connect a store of type `S` within the dial timeout, then build
    pub async fn connect<T, S>(
        self,
        record: T,
    ) -> Result<LiveConfig<T, S>>
    where
        T: SyncRecord,
        S: Connect,
    {
        let settings = self.settings.clone().validate()?;
        let dial_timeout = settings.store.dial_timeout();
        let store = timeout(dial_timeout, S::connect(&settings))
            .await
            .map_err(|_| StoreError::Timeout(dial_timeout))??;

        self.build(record, Arc::new(store))
    }

    /// Load the record's defaults from the configured files, then build
    ///
    /// # Errors
    /// [`crate::Error::Config`] when no files are configured or they fail to load
    pub fn build_from_files<T, S>(
        self,
        store: Arc<S>,
    ) -> Result<LiveConfig<T, S>>
    where
        T: SyncRecord,
        S: KvStore + ?Sized,
    {
        let record: T = self.defaults.load()?;
        self.build(record, store)
    }
}

fn saturating_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
