//! Raw store bytes -> typed field values.
//!
//! All kinds are textual except unsigned integers:
//!
//! | kind              | store encoding                               |
//! |-------------------|----------------------------------------------|
//! | string            | UTF-8 text                                   |
//! | bool              | `1 t T TRUE true True 0 f F FALSE false False` |
//! | i8/i16/i32/i64    | decimal text                                 |
//! | f32/f64           | decimal or scientific text                   |
//! | **u16/u32/u64**   | **fixed-width big-endian binary**            |
//! | map / sequence    | JSON text                                    |
//!
//! The unsigned integer encoding is not decimal text. Writers that store `"1000"`
//! for a `u32` field will be read as `0x31303030`. Keep it this way: existing
//! stores hold binary-packed values for these widths.
//!
//! Coerced values are [`serde_json::Value`]s, ready to be staged and merged into
//! the record through its serde representation.


use serde_json::Number;
use serde_json::Value;

use crate::CoerceError;
use crate::FieldDescriptor;
use crate::IntWidth;
use crate::UintWidth;
use crate::ValueKind;

/// Converts a raw store value into the descriptor's declared type.
///
/// Returns `Ok(None)` for [`ValueKind::Opaque`] fields, which are never written.
pub fn coerce(
    descriptor: &FieldDescriptor,
    raw: &[u8],
) -> Result<Option<Value>, CoerceError> {
    let kind = descriptor.kind();
    let value = match kind {
        ValueKind::String => Value::String(text(kind, raw)?.to_string()),
        ValueKind::Bool => Value::Bool(parse_bool(text(kind, raw)?)?),
        ValueKind::Int(width) => Value::from(parse_int(width, text(kind, raw)?)?),
        ValueKind::Uint(width) => Value::from(read_uint(width, raw)?),
        ValueKind::Float32 => float_value(kind, text(kind, raw)?, |s| s.parse::<f32>().map(f64::from))?,
        ValueKind::Float64 => float_value(kind, text(kind, raw)?, |s| s.parse::<f64>())?,
        ValueKind::Map | ValueKind::Seq => decode(descriptor, raw)?,
        ValueKind::Opaque => return Ok(None),
    };
    Ok(Some(value))
}

fn text(
    kind: ValueKind,
    raw: &[u8],
) -> Result<&str, CoerceError> {
    std::str::from_utf8(raw).map_err(|e| CoerceError::Parse {
        kind,
        input: String::from_utf8_lossy(raw).into_owned(),
        reason: e.to_string(),
    })
}

fn parse_error(
    kind: ValueKind,
    input: &str,
    reason: impl ToString,
) -> CoerceError {
    CoerceError::Parse {
        kind,
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

pub(crate) fn parse_bool(input: &str) -> Result<bool, CoerceError> {
    match input {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(parse_error(ValueKind::Bool, input, "invalid boolean")),
    }
}

pub(crate) fn parse_int(
    width: IntWidth,
    input: &str,
) -> Result<i64, CoerceError> {
    let kind = ValueKind::Int(width);
    let value: i64 = input.parse().map_err(|e| parse_error(kind, input, e))?;

    let fits = match width {
        IntWidth::W8 => i8::try_from(value).is_ok(),
        IntWidth::W16 => i16::try_from(value).is_ok(),
        IntWidth::W32 => i32::try_from(value).is_ok(),
        IntWidth::W64 => true,
    };
    if !fits {
        return Err(parse_error(kind, input, "value out of range"));
    }
    Ok(value)
}

/// Reads the leading `width` bytes as a big-endian unsigned integer.
pub(crate) fn read_uint(
    width: UintWidth,
    raw: &[u8],
) -> Result<u64, CoerceError> {
    let expected = width.bytes();
    if raw.len() < expected {
        return Err(CoerceError::InsufficientBytes {
            expected,
            actual: raw.len(),
        });
    }

    let value = match width {
        UintWidth::W16 => u64::from(u16::from_be_bytes([raw[0], raw[1]])),
        UintWidth::W32 => u64::from(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]])),
        UintWidth::W64 => {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&raw[..8]);
            u64::from_be_bytes(bytes)
        }
    };
    Ok(value)
}

fn float_value<E: ToString>(
    kind: ValueKind,
    input: &str,
    parse: impl Fn(&str) -> Result<f64, E>,
) -> Result<Value, CoerceError> {
    let value = parse(input).map_err(|e| parse_error(kind, input, e))?;
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| parse_error(kind, input, "non-finite value"))
}

fn decode(
    descriptor: &FieldDescriptor,
    raw: &[u8],
) -> Result<Value, CoerceError> {
    let kind = descriptor.kind();
    let value: Value = serde_json::from_slice(raw).map_err(|source| CoerceError::Decode { kind, source })?;
    (descriptor.reshape())(value).map_err(|source| CoerceError::Decode { kind, source })
}
