//! Wire protocol for the feltwire table feed.
//!
//! This crate defines the vendor's binary "language" and nothing above it:
//!
//! - **Wire** ([`WireReader`], [`WireWriter`]) — the varint-tagged
//!   primitive layer.
//! - **Tag maps** ([`decode_message`], [`TagMap`], [`Value`]) — schema-free
//!   decoding of inbound frames into field-id → value maps.
//! - **Envelope** ([`Envelope`], [`command_of`]) — the compiled layout used
//!   for outbound command frames.
//! - **Projection** ([`project_public`], [`PublicRecord`]) — pure mapping
//!   from tag maps into named, typed records.
//! - **Errors** ([`WireError`]) — what can go wrong on the wire.
//!
//! # Architecture
//!
//! The protocol layer sits below the session: it never touches sockets,
//! timers, or state. Frames in, records out.
//!
//! ```text
//! Transport (bytes) → Protocol (TagMap / PublicRecord) → Session (dispatch)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod envelope;
mod error;
pub mod project;
mod tagmap;
mod wire;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use envelope::{Envelope, command_of};
pub use error::WireError;
pub use project::{
    DealerInfo, LobbyDelta, PublicRecord, SeatedPlayer, TableSummary, fix_game_no,
    project_public,
};
pub use tagmap::{TagMap, Value, ValueIter, decode_message};
pub use wire::{FieldTag, WireReader, WireWriter};
