use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use config::FileFormat;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::Error;
use crate::Result;

/// File format of local default files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultsFormat {
    #[default]
    Yaml,
    Toml,
    Json,
}

impl DefaultsFormat {
    fn file_format(self) -> FileFormat {
        match self {
            DefaultsFormat::Yaml => FileFormat::Yaml,
            DefaultsFormat::Toml => FileFormat::Toml,
            DefaultsFormat::Json => FileFormat::Json,
        }
    }
}

impl FromStr for DefaultsFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(DefaultsFormat::Yaml),
            "toml" => Ok(DefaultsFormat::Toml),
            "json" => Ok(DefaultsFormat::Json),
            other => Err(Error::Config(ConfigError::Message(format!(
                "unsupported config type: {other}"
            )))),
        }
    }
}

/// Where the record's local defaults come from
#[derive(Debug, Clone, Default)]
pub struct DefaultsSource {
    /// Files merged in order; later files override earlier ones
    pub filepaths: Vec<PathBuf>,
    pub format: DefaultsFormat,
    /// Environment variable prefix (`<PREFIX>__SECTION__FIELD`), none by default
    pub env_prefix: Option<String>,
}

impl DefaultsSource {
    pub fn load<T: DeserializeOwned>(&self) -> Result<T> {
        load_defaults(&self.filepaths, self.format, self.env_prefix.as_deref())
    }
}

/// Loads a record's default values from local files.
///
/// The first file is read, the remaining files are merged on top of it in order,
/// and environment variables with `env_prefix` override everything.
///
/// # Errors
/// - [`Error::Config`] if `filepaths` is empty, a file is missing or malformed, or the
///   merged values do not deserialize into `T`
pub fn load_defaults<T: DeserializeOwned>(
    filepaths: &[PathBuf],
    format: DefaultsFormat,
    env_prefix: Option<&str>,
) -> Result<T> {
    if filepaths.is_empty() {
        return Err(Error::Config(ConfigError::Message("empty config file list".into())));
    }

    let mut builder = Config::builder();
    for path in filepaths {
        builder = builder.add_source(file_source(path, format));
    }

    if let Some(prefix) = env_prefix {
        builder = builder.add_source(
            Environment::with_prefix(prefix)
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );
    }

    let record = builder.build()?.try_deserialize()?;
    debug!(files = filepaths.len(), format = ?format, "Record defaults loaded");
    Ok(record)
}

fn file_source(
    path: &Path,
    format: DefaultsFormat,
) -> File<config::FileSourceFile, FileFormat> {
    File::from(path).format(format.file_format()).required(true)
}
