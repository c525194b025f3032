//! Schema-free decoding of a frame into a field-id → value map.
//!
//! The vendor format carries no schema, and some length-delimited fields
//! are plain strings while others are nested messages using the exact same
//! wire type. The decoder therefore attempts a recursive decode of every
//! length-delimited payload and falls back to UTF-8 text when that yields
//! nothing — the tie-break is a documented, tested contract, not
//! incidental behavior.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::wire::{WT_FIXED32, WT_FIXED64, WT_LEN, WT_VARINT, WireReader};
use crate::WireError;

/// The decoded representation of a message, keyed by numeric field id.
///
/// A `BTreeMap` keeps iteration order deterministic, which matters for the
/// legacy game-number flattening rule (see
/// [`fix_game_no`](crate::project::fix_game_no)).
pub type TagMap = BTreeMap<u32, Value>;

/// One decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Varint or fixed32, as a plain signed integer.
    Int(i64),
    /// Fixed64, which this protocol only uses for doubles.
    Float(f64),
    /// Length-delimited payload that did not decode as a nested message.
    Str(String),
    /// Length-delimited payload that decoded to at least one field.
    Nested(TagMap),
    /// A field id observed more than once; arrival order is preserved.
    Repeated(Vec<Value>),
}

impl Value {
    /// The value as an integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as a float, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// The value as a string slice, if it decoded as text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a nested message, if it decoded as one.
    pub fn as_nested(&self) -> Option<&TagMap> {
        match self {
            Value::Nested(m) => Some(m),
            _ => None,
        }
    }

    /// Iterates the value as a list: a `Repeated` yields its elements,
    /// anything else yields itself once.
    ///
    /// Fields that are repeated on the wire arrive as a scalar when only
    /// one element was sent, so consumers that expect lists go through
    /// this accessor.
    pub fn as_list(&self) -> ValueIter<'_> {
        match self {
            Value::Repeated(items) => ValueIter::Many(items.iter()),
            other => ValueIter::One(Some(other)),
        }
    }
}

/// Iterator returned by [`Value::as_list`].
pub enum ValueIter<'a> {
    /// A scalar treated as a one-element list.
    One(Option<&'a Value>),
    /// A repeated field.
    Many(std::slice::Iter<'a, Value>),
}

impl<'a> Iterator for ValueIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<&'a Value> {
        match self {
            ValueIter::One(v) => v.take(),
            ValueIter::Many(it) => it.next(),
        }
    }
}

/// Stores `value` under `field`, promoting to a sequence on collision.
///
/// First occurrence is stored as a scalar; the second converts the slot to
/// a `Repeated` holding both; later occurrences append.
fn store(map: &mut TagMap, field: u32, value: Value) {
    match map.entry(field) {
        Entry::Vacant(slot) => {
            slot.insert(value);
        }
        Entry::Occupied(mut slot) => {
            let current = slot.get_mut();
            if let Value::Repeated(items) = current {
                items.push(value);
            } else {
                let first = std::mem::replace(current, Value::Repeated(Vec::with_capacity(2)));
                if let Value::Repeated(items) = current {
                    items.push(first);
                    items.push(value);
                }
            }
        }
    }
}

fn decode_field(r: &mut WireReader<'_>, map: &mut TagMap) -> Result<(), WireError> {
    let tag = r.tag()?;
    if tag.field == 0 {
        // Malformed tag; skip the value and keep going.
        return r.skip(tag.wire_type);
    }
    let value = match tag.wire_type {
        WT_VARINT => Value::Int(r.int64()?),
        WT_FIXED64 => Value::Float(r.double()?),
        WT_FIXED32 => Value::Int(i64::from(r.fixed32()?)),
        WT_LEN => {
            let payload = r.bytes()?;
            // Try-nested-then-string: a payload that decodes cleanly to at
            // least one field is a sub-message, otherwise it is text. The
            // nested attempt is strict — a half-decodable payload is far
            // more likely to be a string that merely starts like a tag
            // stream than a corrupt sub-message.
            match decode_strict(payload) {
                Ok(inner) if !inner.is_empty() => Value::Nested(inner),
                _ => Value::Str(String::from_utf8_lossy(payload).into_owned()),
            }
        }
        other => return Err(WireError::UnknownWireType(other)),
    };
    store(map, tag.field, value);
    Ok(())
}

/// Strict variant used for nested payloads: any decode error rejects the
/// whole buffer, triggering the string fallback at the call site.
fn decode_strict(buf: &[u8]) -> Result<TagMap, WireError> {
    let mut r = WireReader::new(buf);
    let mut map = TagMap::new();
    while !r.is_empty() {
        decode_field(&mut r, &mut map)?;
    }
    Ok(map)
}

/// Decodes a frame into a generic [`TagMap`] without a schema.
///
/// Top-level decoding is best-effort, not all-or-nothing: once at least
/// one field has been stored, a malformed or truncated tail terminates the
/// loop and the partial map is returned. Only a frame that yields nothing
/// at all is rejected.
pub fn decode_message(buf: &[u8]) -> Result<TagMap, WireError> {
    let mut r = WireReader::new(buf);
    let mut map = TagMap::new();
    while !r.is_empty() {
        if let Err(err) = decode_field(&mut r, &mut map) {
            if map.is_empty() {
                return Err(err);
            }
            tracing::trace!(%err, offset = r.position(), "dropping undecodable frame tail");
            break;
        }
    }
    Ok(map)
}
