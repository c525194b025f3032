//! Feltwire — a live casino-table feed client.
//!
//! Feltwire speaks a vendor's schema-light binary protocol over
//! WebSocket, keeps the session alive (handshake, heartbeat, reconnect),
//! aggregates per-table state, and pushes debounced JSON snapshots to a
//! downstream sink.
//!
//! # Layers
//!
//! - [`protocol`] — wire decoding and typed record projection
//! - [`signing`] — token sealing and bet signing
//! - [`transport`] — the connection seam (WebSocket in production)
//! - [`session`] — the vendor session actor
//! - [`state`] — table book, snapshots, aggregation, sink relay
//!
//! # Quick start
//!
//! ```no_run
//! use feltwire::prelude::*;
//!
//! # async fn demo() -> Result<(), feltwire::session::SessionError> {
//! let profile = VendorProfile {
//!     endpoint: "wss://gateway.example.com/ws".to_owned(),
//!     token: "login-token".to_owned(),
//!     session_key: "vendor-key".to_owned(),
//!     table_id: 30001,
//!     ..VendorProfile::default()
//! };
//! let client = TableFeedClient::connect(FeedConfig::new(profile, "ws://sink:9000"))?;
//! client.enter_table(30001, "").await?;
//! # Ok(())
//! # }
//! ```

pub use feltwire_protocol as protocol;
pub use feltwire_session as session;
pub use feltwire_signing as signing;
pub use feltwire_state as state;
pub use feltwire_transport as transport;

mod client;

pub use client::{FeedConfig, TableFeedClient};

/// The types most integrations need.
pub mod prelude {
    pub use crate::client::{FeedConfig, TableFeedClient};
    pub use feltwire_session::{FeedItem, SessionError, VendorProfile, cmd};
    pub use feltwire_signing::SingleBet;
    pub use feltwire_state::{AggregatorConfig, SinkConfig, TableSnapshot};
    #[cfg(feature = "websocket")]
    pub use feltwire_transport::WebSocketConnector;
}
