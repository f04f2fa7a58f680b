//! Live Configuration Error Hierarchy
//!
//! Errors are grouped by the layer that raises them: record schema walking,
//! value coercion, and the remote store. Schema errors abort initialization,
//! coercion and store errors abort a snapshot load, and the watch loop only
//! logs them.

use std::time::Duration;

use config::ConfigError;

use crate::ValueKind;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Record shape cannot be mapped onto store keys
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Raw store bytes could not be turned into the declared field type
    #[error(transparent)]
    Coerce(#[from] CoerceError),

    /// Remote store access failures
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Settings or local default file loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Staged values could not be written back into the record
    #[error("Failed to merge staged values into record: {0}")]
    Merge(#[source] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The record does not serialize to a structured (object) value
    #[error("Config record should be a struct, found {found}")]
    InvalidInputKind { found: &'static str },

    /// Embedded/flattened record fields cannot be mapped to store keys
    #[error("Unsupported embedded field {field} in {record}")]
    UnsupportedField {
        record: &'static str,
        field: &'static str,
    },

    /// Nested path is deeper than the configured bound
    #[error("Too many levels: {path} exceeds {limit} segments")]
    RecursionLimitExceeded { path: String, limit: usize },

    /// Key segment is empty, non-ASCII or contains the path delimiter
    #[error("Invalid key segment {segment:?} for field {field}")]
    InvalidKeySegment {
        field: &'static str,
        segment: String,
    },

    /// Dotted path declared in the schema is missing from the record, or its
    /// accessor belongs to another record type
    #[error("Field {path} is not reachable in the record")]
    UnreachableField { path: String },

    /// Depth bound must be strictly positive
    #[error("Key depth limit must be greater than 0")]
    InvalidDepthLimit,
}

#[derive(Debug, thiserror::Error)]
pub enum CoerceError {
    /// Textual value does not parse as the declared scalar type
    #[error("Cannot parse {input:?} as {kind}: {reason}")]
    Parse {
        kind: ValueKind,
        input: String,
        reason: String,
    },

    /// Structured (JSON) value is malformed or has the wrong shape
    #[error("Cannot decode {kind} value: {source}")]
    Decode {
        kind: ValueKind,
        #[source]
        source: serde_json::Error,
    },

    /// Binary unsigned integer is shorter than its declared width
    #[error("Insufficient bytes: expected {expected}, received {actual}")]
    InsufficientBytes { expected: usize, actual: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store rejected or failed a request
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Request deadline elapsed
    #[error("Store request timeout after {0:?}")]
    Timeout(Duration),

    /// Client could not be constructed or connected
    #[error("Store connection failed: {0}")]
    Connection(String),
}

