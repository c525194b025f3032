//! Cursor-based reader and writer for the vendor's tag/wire-type format.
//!
//! The format is the familiar varint-tagged binary layout: each field is a
//! varint tag (`field_id << 3 | wire_type`) followed by a value whose shape
//! depends on the wire type. The reader only ever advances a cursor over a
//! borrowed slice — the sole allocation on the decode path is the string
//! fallback in the tag-map layer.

use crate::WireError;

/// Wire type 0: variable-length integer.
pub const WT_VARINT: u32 = 0;
/// Wire type 1: 8 bytes, little-endian (doubles on this protocol).
pub const WT_FIXED64: u32 = 1;
/// Wire type 2: varint length followed by that many bytes.
pub const WT_LEN: u32 = 2;
/// Wire type 5: 4 bytes, little-endian.
pub const WT_FIXED32: u32 = 5;

/// A decoded field tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldTag {
    /// Field number (`tag >> 3`). Zero is malformed but tolerated.
    pub field: u32,
    /// Wire type (`tag & 7`).
    pub wire_type: u32,
}

// ---------------------------------------------------------------------------
// WireReader
// ---------------------------------------------------------------------------

/// A read cursor over an immutable byte slice.
///
/// Owned exclusively by the decode call that created it; all primitives
/// mutate only the cursor. Length-delimited reads return subslices that
/// borrow the original buffer.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Creates a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// `true` once the cursor has consumed the whole buffer.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Current cursor offset, for error reporting.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or(WireError::TruncatedInput(self.pos))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Reads one varint: 7-bit groups, continuation bit `0x80`, terminated
    /// by a byte below `0x80`. Fails with [`WireError::TruncatedInput`] if
    /// the buffer ends first.
    pub fn varint(&mut self) -> Result<u64, WireError> {
        let mut val: u64 = 0;
        let mut shift = 0u32;
        loop {
            let b = *self
                .buf
                .get(self.pos)
                .ok_or(WireError::TruncatedInput(self.pos))?;
            self.pos += 1;
            if shift < 64 {
                val |= u64::from(b & 0x7f) << shift;
            }
            if b < 0x80 {
                return Ok(val);
            }
            shift += 7;
        }
    }

    /// Varint reinterpreted as a signed 64-bit integer.
    ///
    /// The vendor protocol never zigzag-encodes; negative values arrive
    /// sign-extended to ten bytes, so a plain two's-complement cast is the
    /// correct decoding.
    pub fn int64(&mut self) -> Result<i64, WireError> {
        Ok(self.varint()? as i64)
    }

    /// Varint truncated to a signed 32-bit integer.
    pub fn int32(&mut self) -> Result<i32, WireError> {
        Ok(self.varint()? as i32)
    }

    /// Reads a little-endian `f64` (wire type 1).
    pub fn double(&mut self) -> Result<f64, WireError> {
        let raw = self.take(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(raw);
        Ok(f64::from_le_bytes(bytes))
    }

    /// Reads a little-endian `i32` (wire type 5).
    pub fn fixed32(&mut self) -> Result<i32, WireError> {
        let raw = self.take(4)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(raw);
        Ok(i32::from_le_bytes(bytes))
    }

    /// Reads one field tag.
    pub fn tag(&mut self) -> Result<FieldTag, WireError> {
        let raw = self.varint()? as u32;
        Ok(FieldTag {
            field: raw >> 3,
            wire_type: raw & 7,
        })
    }

    /// Reads a length-delimited payload: varint length, then that many
    /// bytes borrowed from the underlying buffer.
    pub fn bytes(&mut self) -> Result<&'a [u8], WireError> {
        let len = self.varint()? as usize;
        self.take(len)
    }

    /// Consumes and discards one value of the given wire type without
    /// allocating. Unknown fields never abort decoding; they are skipped
    /// through here.
    pub fn skip(&mut self, wire_type: u32) -> Result<(), WireError> {
        match wire_type {
            WT_VARINT => {
                self.varint()?;
            }
            WT_FIXED64 => {
                self.take(8)?;
            }
            WT_LEN => {
                let len = self.varint()? as usize;
                self.take(len)?;
            }
            WT_FIXED32 => {
                self.take(4)?;
            }
            other => return Err(WireError::UnknownWireType(other)),
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WireWriter
// ---------------------------------------------------------------------------

/// Encoder for outbound frames.
///
/// Only the send side uses a compiled field set (see
/// [`Envelope`](crate::Envelope)), so the writer exposes typed per-field
/// emitters rather than a generic value model.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    fn raw_varint(&mut self, mut v: u64) {
        while v >= 0x80 {
            self.buf.push((v as u8 & 0x7f) | 0x80);
            v >>= 7;
        }
        self.buf.push(v as u8);
    }

    fn tag(&mut self, field: u32, wire_type: u32) {
        self.raw_varint(u64::from(field) << 3 | u64::from(wire_type));
    }

    /// Emits an `int32` field. Negative values are sign-extended to ten
    /// bytes, matching the remote decoder's expectations.
    pub fn int32(&mut self, field: u32, v: i32) {
        self.int64(field, i64::from(v));
    }

    /// Emits an `int64` field.
    pub fn int64(&mut self, field: u32, v: i64) {
        self.tag(field, WT_VARINT);
        self.raw_varint(v as u64);
    }

    /// Emits a `double` field.
    pub fn double(&mut self, field: u32, v: f64) {
        self.tag(field, WT_FIXED64);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Emits a length-delimited UTF-8 string field.
    pub fn string(&mut self, field: u32, s: &str) {
        self.bytes(field, s.as_bytes());
    }

    /// Emits a length-delimited raw payload field, used for nested
    /// messages.
    pub fn bytes(&mut self, field: u32, payload: &[u8]) {
        self.tag(field, WT_LEN);
        self.raw_varint(payload.len() as u64);
        self.buf.extend_from_slice(payload);
    }

    /// Finishes encoding and returns the frame bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
