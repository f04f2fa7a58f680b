//! Key mapping between record fields and store keys.
//!
//! Every synchronized leaf gets two addresses:
//!
//! ```text
//! LogConfig { level }   json "log" / "level"   etcd "log" / "log_level"
//!
//!   dotted path : log.level                 (address inside the record)
//!   store key   : /svc/config/log/log_level (prefix + slash-joined segments)
//! ```
//!
//! The map is built once at initialization and is read-only afterwards.


use std::collections::hash_map;
use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;
use tracing::trace;

use crate::resolve_tags;
use crate::Accessor;
use crate::FieldKind;
use crate::FieldWriter;
use crate::RecordSchema;
use crate::Reshape;
use crate::SchemaError;
use crate::ValueKind;

/// Default bound on the number of path segments of a synchronized field
pub const MAX_KEY_DEPTH: usize = 5;

/// Separator of store key segments
pub const KEY_DELIMITER: char = '/';

/// Separator of dotted record paths
pub const PATH_DELIMITER: char = '.';

/// Dotted path and declared type of one synchronized field
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    path: String,
    kind: ValueKind,
    reshape: Reshape,
    writer: Option<FieldWriter>,
}

impl FieldDescriptor {
    pub fn new(
        path: impl Into<String>,
        kind: ValueKind,
        reshape: Reshape,
    ) -> Self {
        Self {
            path: path.into(),
            kind,
            reshape,
            writer: None,
        }
    }

    pub(crate) fn with_writer(
        mut self,
        writer: FieldWriter,
    ) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Dotted path inside the record, e.g. `log.level`
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub(crate) fn reshape(&self) -> Reshape {
        self.reshape
    }

    /// `None` for opaque fields
    pub(crate) fn writer(&self) -> Option<&FieldWriter> {
        self.writer.as_ref()
    }
}

/// Full store key -> field descriptor.
///
/// Iteration order carries no meaning.
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    prefix: String,
    entries: HashMap<String, FieldDescriptor>,
}

impl KeyMap {
    /// Walks `schema` and derives the store key of every annotated leaf.
    ///
    /// `record` is the serialized form of the record the schema describes. It must be
    /// an object, and must contain every dotted path the schema declares.
    ///
    /// # Errors
    /// - [`SchemaError::InvalidInputKind`] if `record` is not an object
    /// - [`SchemaError::UnsupportedField`] on embedded fields
    /// - [`SchemaError::RecursionLimitExceeded`] past `max_depth` segments
    /// - [`SchemaError::UnreachableField`] if a declared path is missing in `record`
    pub fn build(
        prefix: &str,
        schema: &RecordSchema,
        record: &Value,
        max_depth: usize,
    ) -> Result<Self, SchemaError> {
        if max_depth == 0 {
            return Err(SchemaError::InvalidDepthLimit);
        }
        if !record.is_object() {
            return Err(SchemaError::InvalidInputKind {
                found: value_kind_name(record),
            });
        }

        let mut key_map = KeyMap {
            prefix: prefix.trim_end_matches(KEY_DELIMITER).to_string(),
            entries: HashMap::new(),
        };
        key_map.walk(schema, &[], "", "", 1, record, max_depth)?;

        debug!(prefix = %key_map.prefix, keys = key_map.len(), "Key map built");
        Ok(key_map)
    }

    #[allow(clippy::too_many_arguments)]
    fn walk(
        &mut self,
        schema: &RecordSchema,
        parent_access: &[Accessor],
        parent_path: &str,
        parent_key: &str,
        depth: usize,
        record: &Value,
        max_depth: usize,
    ) -> Result<(), SchemaError> {
        for field in &schema.fields {
            let Some(tags) = resolve_tags(schema.name, field)? else {
                trace!(record = schema.name, field = field.name, "Field not annotated, skipped");
                continue;
            };

            let path = join(parent_path, PATH_DELIMITER, tags.name);
            let key_path = join(parent_key, KEY_DELIMITER, tags.segment);

            if depth > max_depth {
                return Err(SchemaError::RecursionLimitExceeded { path, limit: max_depth });
            }

            let mut access = parent_access.to_vec();
            access.extend(field.access.clone());

            match field.kind {
                FieldKind::Record(nested) => {
                    self.walk(&nested(), &access, &path, &key_path, depth + 1, record, max_depth)?;
                }
                FieldKind::Value { kind, reshape, codec } => {
                    if lookup(record, &path).is_none() {
                        return Err(SchemaError::UnreachableField { path });
                    }

                    let key = format!("{}{}{}", self.prefix, KEY_DELIMITER, key_path);
                    trace!(key = %key, path = %path, kind = %kind, "Key mapped");
                    let mut descriptor = FieldDescriptor::new(path, kind, reshape);
                    if let Some(codec) = codec.filter(|_| kind != ValueKind::Opaque) {
                        descriptor = descriptor.with_writer(FieldWriter::new(access, codec));
                    }
                    self.entries.insert(key, descriptor);
                }
                FieldKind::Embedded(_) => {
                    return Err(SchemaError::UnsupportedField {
                        record: schema.name,
                        field: field.name,
                    });
                }
            }
        }
        Ok(())
    }

    /// Prefix without trailing delimiter
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Joins a key relative to the prefix into a full store key
    pub fn full_key(
        &self,
        relative: &str,
    ) -> String {
        format!(
            "{}{}{}",
            self.prefix,
            KEY_DELIMITER,
            relative.trim_start_matches(KEY_DELIMITER)
        )
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&FieldDescriptor> {
        self.entries.get(key)
    }

    pub fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, FieldDescriptor> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a KeyMap {
    type Item = (&'a String, &'a FieldDescriptor);
    type IntoIter = hash_map::Iter<'a, String, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn join(
    parent: &str,
    delimiter: char,
    segment: &str,
) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}{delimiter}{segment}")
    }
}

/// Finds the value at a dotted path in a serialized record
pub(crate) fn lookup<'a>(
    record: &'a Value,
    path: &str,
) -> Option<&'a Value> {
    path.split(PATH_DELIMITER)
        .try_fold(record, |node, segment| node.as_object()?.get(segment))
}

pub(crate) fn value_kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "struct",
    }
}
