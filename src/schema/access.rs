//! Typed write access to record fields.
//!
//! A merge touches only the fields it was handed. Each [`FieldSpec`](crate::FieldSpec)
//! carries an [`Accessor`] from its parent record to the field, and the key map
//! chains them from the root record down to every synchronized leaf.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

type Projection = dyn for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync;

/// Projects a parent record onto one of its fields
#[derive(Clone)]
pub struct Accessor(Arc<Projection>);

impl Accessor {
    pub(crate) fn new<R, T, F>(access: F) -> Self
    where
        R: Any,
        T: Any,
        F: Fn(&mut R) -> &mut T + Send + Sync + 'static,
    {
        Self::erased(move |parent: &mut dyn Any| {
            parent
                .downcast_mut::<R>()
                .map(|record| access(record) as &mut dyn Any)
        })
    }

    fn erased<F>(projection: F) -> Self
    where
        F: for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync + 'static,
    {
        Self(Arc::new(projection))
    }

    /// `None` when `parent` is not the record type this accessor was declared on
    pub(crate) fn project<'a>(
        &self,
        parent: &'a mut dyn Any,
    ) -> Option<&'a mut dyn Any> {
        (self.0)(parent)
    }
}

impl fmt::Debug for Accessor {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str("Accessor")
    }
}

type Decoded = Box<dyn Any + Send>;

/// Decodes a coerced value into a leaf's Rust type and stores it
#[derive(Clone, Copy)]
pub struct LeafCodec {
    decode: fn(Value) -> serde_json::Result<Decoded>,
    assign: fn(&mut dyn Any, Decoded) -> bool,
}

impl LeafCodec {
    pub(crate) fn of<T>() -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        Self {
            decode: decode_as::<T>,
            assign: assign_as::<T>,
        }
    }
}

impl fmt::Debug for LeafCodec {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str("LeafCodec")
    }
}

fn decode_as<T>(value: Value) -> serde_json::Result<Decoded>
where
    T: DeserializeOwned + Send + 'static,
{
    let typed: T = serde_json::from_value(value)?;
    Ok(Box::new(typed))
}

fn assign_as<T: Any>(
    slot: &mut dyn Any,
    value: Decoded,
) -> bool {
    match (slot.downcast_mut::<T>(), value.downcast::<T>()) {
        (Some(slot), Ok(value)) => {
            *slot = *value;
            true
        }
        _ => false,
    }
}

/// Write path from the root record to one leaf
#[derive(Debug, Clone)]
pub struct FieldWriter {
    accessors: Vec<Accessor>,
    codec: LeafCodec,
}

impl FieldWriter {
    pub(crate) fn new(
        accessors: Vec<Accessor>,
        codec: LeafCodec,
    ) -> Self {
        Self { accessors, codec }
    }

    pub(crate) fn decode(
        &self,
        value: Value,
    ) -> serde_json::Result<Decoded> {
        (self.codec.decode)(value)
    }

    /// Whether the leaf can be reached from `record`
    pub(crate) fn reaches(
        &self,
        record: &mut dyn Any,
    ) -> bool {
        self.project(record).is_some()
    }

    /// Stores a value returned by [`FieldWriter::decode`]
    pub(crate) fn write(
        &self,
        record: &mut dyn Any,
        value: Decoded,
    ) -> bool {
        match self.project(record) {
            Some(slot) => (self.codec.assign)(slot, value),
            None => false,
        }
    }

    fn project<'a>(
        &self,
        record: &'a mut dyn Any,
    ) -> Option<&'a mut dyn Any> {
        self.accessors
            .iter()
            .try_fold(record, |node, accessor| accessor.project(node))
    }
}
