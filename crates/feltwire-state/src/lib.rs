//! Table state aggregation for Feltwire.
//!
//! Consumes the session's [`FeedItem`](feltwire_session::FeedItem) stream
//! and turns it into pushable table snapshots:
//!
//! 1. **Table book** ([`TableBook`]) — everything the feed has said about
//!    each table, folded message by message.
//! 2. **Snapshots** ([`TableSnapshot`], [`build_snapshot`]) — the fixed
//!    JSON shape consumers receive.
//! 3. **Aggregator actor** ([`aggregator`]) — debounced, coalesced pushes.
//! 4. **Sink relay** ([`relay`]) — delivery with a bounded drop-oldest
//!    queue and single-timer reconnect.

pub mod aggregator;
pub mod relay;
mod snapshot;
mod table;

pub use aggregator::{AggregatorConfig, AggregatorHandle};
pub use relay::SinkConfig;
pub use snapshot::{
    BetInfo, DealerEvent, PushEnvelope, RoadInfo, TableInfo, TableSnapshot, build_snapshot,
};
pub use table::{Countdown, TableBook, TableEntry};
