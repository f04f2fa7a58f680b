//! Write-back of coerced values into the record.
//!
//! Values are staged with the descriptor of their field, then merged through the
//! field's [`FieldWriter`](crate::FieldWriter). Only staged leaves are written;
//! every other field keeps its value, including fields serde skips.
//! Collection leaves are replaced wholesale, not merged entry by entry.

#[cfg(test)]
mod merge_test;

use std::any::Any;

use serde_json::Map;
use serde_json::Value;
use tracing::trace;

use crate::Error;
use crate::FieldDescriptor;
use crate::FieldWriter;
use crate::Result;
use crate::SchemaError;
use crate::PATH_DELIMITER;

#[derive(Debug, Clone)]
struct Staged {
    path: String,
    value: Value,
    writer: Option<FieldWriter>,
}

/// Coerced values waiting to be merged into a record
#[derive(Debug, Clone)]
pub struct StagedValues {
    entries: Vec<Staged>,
    max_depth: usize,
}

impl StagedValues {
    pub fn new(max_depth: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_depth,
        }
    }

    /// Stages `value` for the field of `descriptor`.
    ///
    /// A later value for the same path wins.
    pub fn stage(
        &mut self,
        descriptor: &FieldDescriptor,
        value: Value,
    ) -> std::result::Result<(), SchemaError> {
        let path = descriptor.path();
        if path.split(PATH_DELIMITER).count() > self.max_depth {
            return Err(SchemaError::RecursionLimitExceeded {
                path: path.to_string(),
                limit: self.max_depth,
            });
        }

        self.entries.retain(|staged| staged.path != path);
        self.entries.push(Staged {
            path: path.to_string(),
            value,
            writer: descriptor.writer().cloned(),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Staged values as a nested mapping keyed by root field name
    pub fn to_tree(&self) -> Map<String, Value> {
        let mut tree = Value::Object(Map::new());
        self.apply(&mut tree);
        match tree {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn apply(
        &self,
        tree: &mut Value,
    ) {
        for staged in &self.entries {
            set_path(tree, &staged.path, staged.value.clone());
        }
    }

    /// Writes every staged value into its field of `record`.
    ///
    /// All values are decoded before the first write, so the record is left
    /// unchanged if any of them does not fit its field.
    ///
    /// # Errors
    /// - [`Error::Merge`] when a value does not decode into the field type
    /// - [`SchemaError::UnreachableField`] when a field is not part of `record`
    pub fn merge_into<T: Any>(
        &self,
        record: &mut T,
    ) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }

        let record: &mut dyn Any = record;
        let mut pending = Vec::with_capacity(self.entries.len());
        for staged in &self.entries {
            let Some(writer) = &staged.writer else {
                trace!(path = %staged.path, "Field is never written, skipped");
                continue;
            };
            if !writer.reaches(record) {
                return Err(unreachable_field(&staged.path));
            }
            let value = writer.decode(staged.value.clone()).map_err(Error::Merge)?;
            pending.push((staged, writer, value));
        }

        for (staged, writer, value) in pending {
            if !writer.write(record, value) {
                return Err(unreachable_field(&staged.path));
            }
        }

        trace!(merged = self.len(), "Staged values merged into record");
        Ok(())
    }
}

fn unreachable_field(path: &str) -> Error {
    SchemaError::UnreachableField {
        path: path.to_string(),
    }
    .into()
}

fn set_path(
    tree: &mut Value,
    path: &str,
    value: Value,
) {
    let segments: Vec<&str> = path.split(PATH_DELIMITER).collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut node = tree;
    for segment in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            return;
        };
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        map.insert(last.to_string(), value);
    }
}
