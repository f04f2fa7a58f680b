//! Record schema registration.
//!
//! A config record describes its own shape through [`LiveRecord::schema`]. Each
//! [`FieldSpec`] carries the two annotations used for synchronization:
//!
//! - `json`: the external name, which must match the field's serde name. Dotted
//!   paths (`log.level`) are built from these.
//! - `etcd`: the key segment. Store keys (`/prefix/log/level`) are built from these.
//!
//! Fields missing either annotation are not synchronized.
//!
//! ```ignore
//! impl LiveRecord for LogConfig {
//!     fn schema() -> RecordSchema {
//!         RecordSchema::new("LogConfig")
//!             .field(FieldSpec::value("level", |c: &mut LogConfig| &mut c.level).tags("level", "level"))
//!             .field(FieldSpec::value("max_files", |c: &mut LogConfig| &mut c.max_files).tags("max_files", "max_files"))
//!     }
//! }
//! ```
//!
//! The value kind of a leaf is inferred from its Rust type through [`FieldType`].
//! The accessor closure is how merges reach the field, so fields the schema does
//! not write are never touched.

mod access;
mod tags;


pub use access::*;
pub use tags::*;

use std::any::Any;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::fmt;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Re-encodes a decoded JSON value through the declared collection type.
pub type Reshape = fn(Value) -> serde_json::Result<Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

/// Widths that are stored as fixed-width big-endian binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UintWidth {
    W16,
    W32,
    W64,
}

impl UintWidth {
    /// Number of bytes read from the raw store value
    pub const fn bytes(self) -> usize {
        match self {
            UintWidth::W16 => 2,
            UintWidth::W32 => 4,
            UintWidth::W64 => 8,
        }
    }
}

/// Declared type of a leaf field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Bool,
    Int(IntWidth),
    /// **Binary big-endian**, not decimal text. See [`crate::coerce`].
    Uint(UintWidth),
    Float32,
    Float64,
    Map,
    Seq,
    /// Pointer-like or custom types. Never coerced, never written.
    Opaque,
}

impl fmt::Display for ValueKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ValueKind::String => write!(f, "string"),
            ValueKind::Bool => write!(f, "bool"),
            ValueKind::Int(IntWidth::W8) => write!(f, "i8"),
            ValueKind::Int(IntWidth::W16) => write!(f, "i16"),
            ValueKind::Int(IntWidth::W32) => write!(f, "i32"),
            ValueKind::Int(IntWidth::W64) => write!(f, "i64"),
            ValueKind::Uint(UintWidth::W16) => write!(f, "u16"),
            ValueKind::Uint(UintWidth::W32) => write!(f, "u32"),
            ValueKind::Uint(UintWidth::W64) => write!(f, "u64"),
            ValueKind::Float32 => write!(f, "f32"),
            ValueKind::Float64 => write!(f, "f64"),
            ValueKind::Map => write!(f, "map"),
            ValueKind::Seq => write!(f, "sequence"),
            ValueKind::Opaque => write!(f, "opaque"),
        }
    }
}

/// Maps a Rust field type onto the [`ValueKind`] used for coercion.
pub trait FieldType {
    const KIND: ValueKind;

    fn reshape(value: Value) -> serde_json::Result<Value> {
        Ok(value)
    }
}

fn reshape_as<T>(value: Value) -> serde_json::Result<Value>
where
    T: Serialize + DeserializeOwned,
{
    let typed: T = serde_json::from_value(value)?;
    serde_json::to_value(typed)
}

macro_rules! field_type {
    ($kind:expr => $($ty:ty),+) => {
        $(
            impl FieldType for $ty {
                const KIND: ValueKind = $kind;
            }
        )+
    };
}

field_type!(ValueKind::String => String);
field_type!(ValueKind::Bool => bool);
field_type!(ValueKind::Int(IntWidth::W8) => i8);
field_type!(ValueKind::Int(IntWidth::W16) => i16);
field_type!(ValueKind::Int(IntWidth::W32) => i32);
field_type!(ValueKind::Int(IntWidth::W64) => i64, isize);
field_type!(ValueKind::Uint(UintWidth::W16) => u16);
field_type!(ValueKind::Uint(UintWidth::W32) => u32);
field_type!(ValueKind::Uint(UintWidth::W64) => u64);
field_type!(ValueKind::Float32 => f32);
field_type!(ValueKind::Float64 => f64);
// Unsupported scalar widths are left untouched
field_type!(ValueKind::Opaque => u8, usize, u128, i128, char);

impl<T> FieldType for Option<T> {
    const KIND: ValueKind = ValueKind::Opaque;
}

impl<T> FieldType for Box<T> {
    const KIND: ValueKind = ValueKind::Opaque;
}

impl<K, V> FieldType for HashMap<K, V>
where
    K: Serialize + DeserializeOwned + Eq + Hash,
    V: Serialize + DeserializeOwned,
{
    const KIND: ValueKind = ValueKind::Map;

    fn reshape(value: Value) -> serde_json::Result<Value> {
        reshape_as::<Self>(value)
    }
}

impl<K, V> FieldType for BTreeMap<K, V>
where
    K: Serialize + DeserializeOwned + Ord,
    V: Serialize + DeserializeOwned,
{
    const KIND: ValueKind = ValueKind::Map;

    fn reshape(value: Value) -> serde_json::Result<Value> {
        reshape_as::<Self>(value)
    }
}

impl<T> FieldType for Vec<T>
where
    T: Serialize + DeserializeOwned,
{
    const KIND: ValueKind = ValueKind::Seq;

    fn reshape(value: Value) -> serde_json::Result<Value> {
        reshape_as::<Self>(value)
    }
}

impl<T> FieldType for VecDeque<T>
where
    T: Serialize + DeserializeOwned,
{
    const KIND: ValueKind = ValueKind::Seq;

    fn reshape(value: Value) -> serde_json::Result<Value> {
        reshape_as::<Self>(value)
    }
}

impl<T> FieldType for HashSet<T>
where
    T: Serialize + DeserializeOwned + Eq + Hash,
{
    const KIND: ValueKind = ValueKind::Seq;

    fn reshape(value: Value) -> serde_json::Result<Value> {
        reshape_as::<Self>(value)
    }
}

impl<T> FieldType for BTreeSet<T>
where
    T: Serialize + DeserializeOwned + Ord,
{
    const KIND: ValueKind = ValueKind::Seq;

    fn reshape(value: Value) -> serde_json::Result<Value> {
        reshape_as::<Self>(value)
    }
}

/// A config record type that can be synchronized with the store.
///
/// Nested records implement it too and are referenced with [`FieldSpec::record`].
pub trait LiveRecord {
    fn schema() -> RecordSchema;
}

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Leaf value. `codec` is unset for fields that are never written.
    Value {
        kind: ValueKind,
        reshape: Reshape,
        codec: Option<LeafCodec>,
    },
    /// Nested record, walked recursively
    Record(fn() -> RecordSchema),
    /// Embedded (flattened) record. Rejected when building the key map.
    Embedded(fn() -> RecordSchema),
}

/// Structural metadata of one record field
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub(crate) name: &'static str,
    pub(crate) json: Option<&'static str>,
    pub(crate) etcd: Option<&'static str>,
    pub(crate) kind: FieldKind,
    pub(crate) access: Option<Accessor>,
}

impl FieldSpec {
    /// Leaf field reached through `access`. Its kind is inferred from `T`.
    pub fn value<R, T, F>(
        name: &'static str,
        access: F,
    ) -> Self
    where
        R: Any,
        T: FieldType + DeserializeOwned + Send + 'static,
        F: Fn(&mut R) -> &mut T + Send + Sync + 'static,
    {
        let kind = FieldKind::Value {
            kind: T::KIND,
            reshape: T::reshape,
            codec: Some(LeafCodec::of::<T>()),
        };
        Self::with_kind(name, kind, Some(Accessor::new(access)))
    }

    /// Leaf field of a custom type that must never be written
    pub fn opaque(name: &'static str) -> Self {
        let kind = FieldKind::Value {
            kind: ValueKind::Opaque,
            reshape: Ok,
            codec: None,
        };
        Self::with_kind(name, kind, None)
    }

    /// Nested record field reached through `access`
    pub fn record<R, N, F>(
        name: &'static str,
        access: F,
    ) -> Self
    where
        R: Any,
        N: LiveRecord + 'static,
        F: Fn(&mut R) -> &mut N + Send + Sync + 'static,
    {
        Self::with_kind(name, FieldKind::Record(N::schema), Some(Accessor::new(access)))
    }

    /// Embedded record field (`#[serde(flatten)]`)
    pub fn embedded<N: LiveRecord>(name: &'static str) -> Self {
        Self::with_kind(name, FieldKind::Embedded(N::schema), None)
    }

    fn with_kind(
        name: &'static str,
        kind: FieldKind,
        access: Option<Accessor>,
    ) -> Self {
        Self {
            name,
            json: None,
            etcd: None,
            kind,
            access,
        }
    }

    /// Sets the external name annotation.
    ///
    /// `"name,segment"` also sets the key segment, overriding [`FieldSpec::etcd`].
    pub fn json(
        mut self,
        tag: &'static str,
    ) -> Self {
        self.json = Some(tag);
        self
    }

    /// Sets the key segment annotation
    pub fn etcd(
        mut self,
        tag: &'static str,
    ) -> Self {
        self.etcd = Some(tag);
        self
    }

    /// Sets both annotations
    pub fn tags(
        self,
        json: &'static str,
        etcd: &'static str,
    ) -> Self {
        self.json(json).etcd(etcd)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }
}

/// Ordered field list of one record type
#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub(crate) name: &'static str,
    pub(crate) fields: Vec<FieldSpec>,
}

impl RecordSchema {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    pub fn field(
        mut self,
        field: FieldSpec,
    ) -> Self {
        self.fields.push(field);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }
}
