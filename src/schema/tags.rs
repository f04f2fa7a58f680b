use super::FieldKind;
use super::FieldSpec;
use crate::SchemaError;

/// Resolved annotations of a synchronized field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldTags {
    /// External name, used in dotted paths
    pub name: &'static str,
    /// Key segment, used in store keys
    pub segment: &'static str,
}

/// Reads the external name and key segment of one field.
///
/// Returns `Ok(None)` when either annotation is missing, which excludes the field
/// from synchronization. Embedded fields are an error.
pub fn resolve_tags(
    record: &'static str,
    field: &FieldSpec,
) -> Result<Option<FieldTags>, SchemaError> {
    if let FieldKind::Embedded(_) = field.kind {
        return Err(SchemaError::UnsupportedField {
            record,
            field: field.name,
        });
    }

    let mut name = field.json.unwrap_or_default();
    let mut segment = field.etcd.unwrap_or_default();

    // "name,segment" shorthand
    if let Some((json, etcd)) = name.split_once(',') {
        name = json;
        segment = etcd;
    }

    let name = name.trim();
    let segment = segment.trim();
    if name.is_empty() || segment.is_empty() {
        return Ok(None);
    }

    if !is_valid_segment(segment) {
        return Err(SchemaError::InvalidKeySegment {
            field: field.name,
            segment: segment.to_string(),
        });
    }

    Ok(Some(FieldTags { name, segment }))
}

fn is_valid_segment(segment: &str) -> bool {
    segment.bytes().all(|b| b.is_ascii_graphic() && b != b'/')
}
