//! Vendor session lifecycle for Feltwire.
//!
//! This crate turns a raw byte link into a live, self-healing table feed:
//!
//! 1. **Link machine** ([`LinkState`]) — the pure connection lifecycle,
//!    tested without sockets.
//! 2. **Channel actor** ([`channel`]) — dial, ack grace, frame pump, and
//!    a single-timer reconnect, generic over any
//!    [`Connector`](feltwire_transport::Connector).
//! 3. **Session manager** ([`SessionManager`]) — command dispatch and the
//!    state later requests depend on (account name, bet key, per-table
//!    rounds).
//! 4. **Session actor** ([`spawn`], [`SessionHandle`]) — heartbeat, init
//!    sequence, table re-entry, and the outbound [`FeedItem`] stream.
//!
//! # How it fits in the stack
//!
//! ```text
//! State layer (above)   ← aggregates FeedItems into table snapshots
//!     ↕
//! Session layer (this crate)  ← lifecycle, dispatch, signing state
//!     ↕
//! Transport + Protocol (below)  ← bytes and frames
//! ```

pub mod channel;
mod error;
mod link;
mod manager;
mod profile;
mod session;

pub use channel::{ChannelEvent, ChannelHandle};
pub use error::SessionError;
pub use link::{LinkEvent, LinkState};
pub use manager::{FeedItem, SessionManager, TableRuntime};
pub use profile::{VendorProfile, cmd};
pub use session::{SessionCommand, SessionHandle, spawn};
