//! The outbound command envelope.
//!
//! Receiving is schema-free (see [`decode_message`](crate::decode_message)),
//! but the send side only ever emits a known, stable set of fields, so it
//! uses a compiled layout. Field numbers below are the vendor's public-bean
//! schema and are part of the wire contract.

use crate::tagmap::{TagMap, Value};
use crate::wire::WireWriter;
use crate::WireError;

/// One outbound command frame.
///
/// Zero and empty fields are omitted from the encoding (the remote decoder
/// treats absence as the zero value); `cmd` is always written so a frame is
/// never empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    /// Field 1 — the numeric command code. Required.
    pub cmd: i32,
    /// Field 2 — the sealed auth token (see `feltwire-signing`).
    pub token: String,
    /// Field 3.
    pub code_id: i32,
    /// Field 4.
    pub lobby_id: i32,
    /// Field 5 — round/game identifier.
    pub game_no: String,
    /// Field 6.
    pub table_id: i32,
    /// Field 7 — seat number; `-1` means "no seat" on enter-room.
    pub seat: i32,
    /// Field 8 — member id.
    pub mid: i64,
    /// Field 9, repeated.
    pub d_list: Vec<f64>,
    /// Field 10 — vendor-specific discriminator, named `type` upstream.
    pub kind: i32,
    /// Field 11.
    pub user_name: String,
    /// Field 12, repeated — also carries the signed bet triple on cmd 6.
    pub list: Vec<String>,
    /// Field 13, repeated.
    pub mids: Vec<i64>,
    /// Field 14 — opaque string payload; `"PC"` marks the client kind on
    /// the hall-login command.
    pub object: String,
}

impl Envelope {
    /// Creates an envelope carrying only a command code.
    pub fn command(cmd: i32) -> Self {
        Self {
            cmd,
            ..Self::default()
        }
    }

    /// Serializes the envelope with the compiled field layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = WireWriter::new();
        w.int32(1, self.cmd);
        if !self.token.is_empty() {
            w.string(2, &self.token);
        }
        if self.code_id != 0 {
            w.int32(3, self.code_id);
        }
        if self.lobby_id != 0 {
            w.int32(4, self.lobby_id);
        }
        if !self.game_no.is_empty() {
            w.string(5, &self.game_no);
        }
        if self.table_id != 0 {
            w.int32(6, self.table_id);
        }
        if self.seat != 0 {
            w.int32(7, self.seat);
        }
        if self.mid != 0 {
            w.int64(8, self.mid);
        }
        for &d in &self.d_list {
            w.double(9, d);
        }
        if self.kind != 0 {
            w.int32(10, self.kind);
        }
        if !self.user_name.is_empty() {
            w.string(11, &self.user_name);
        }
        for s in &self.list {
            w.string(12, s);
        }
        for &m in &self.mids {
            w.int64(13, m);
        }
        if !self.object.is_empty() {
            w.string(14, &self.object);
        }
        w.into_bytes()
    }
}

/// Extracts the required command code (field 1) from a decoded frame.
///
/// Fails with [`WireError::MissingCommand`] when the field is absent or is
/// not an integer — such a frame cannot be dispatched and is rejected
/// whole.
pub fn command_of(map: &TagMap) -> Result<i32, WireError> {
    match map.get(&1) {
        Some(Value::Int(cmd)) => Ok(*cmd as i32),
        _ => Err(WireError::MissingCommand),
    }
}
