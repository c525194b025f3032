//! The assembled client: session, aggregator, and sink relay wired
//! together behind one handle.

use feltwire_session::{SessionError, SessionHandle, VendorProfile};
use feltwire_signing::SingleBet;
use feltwire_state::{AggregatorConfig, AggregatorHandle, SinkConfig, TableSnapshot, aggregator, relay};
use feltwire_transport::Connector;
#[cfg(feature = "websocket")]
use feltwire_transport::WebSocketConnector;
use tokio::sync::mpsc;

/// Buffer between the session and the aggregator.
const FEED_BUFFER: usize = 256;
/// Buffer between the aggregator and the sink relay.
const PUSH_BUFFER: usize = 64;

/// Everything a table feed needs to run.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// The vendor gateway: endpoint, credentials, timings.
    pub profile: VendorProfile,
    /// Debounce and envelope settings for the push stream.
    pub aggregator: AggregatorConfig,
    /// The downstream sink receiving the pushes.
    pub sink: SinkConfig,
}

impl FeedConfig {
    /// A config with default aggregation and sink knobs.
    pub fn new(profile: VendorProfile, sink_endpoint: impl Into<String>) -> Self {
        Self {
            profile,
            aggregator: AggregatorConfig::default(),
            sink: SinkConfig::new(sink_endpoint),
        }
    }
}

/// Handle to a running table feed.
///
/// Cloning is cheap; all clones drive the same actors. Dropping every
/// clone does not stop the feed — call [`shutdown`](Self::shutdown).
#[derive(Clone)]
pub struct TableFeedClient {
    session: SessionHandle,
    aggregator: AggregatorHandle,
}

impl TableFeedClient {
    /// Starts a feed over WebSocket for both the gateway and the sink.
    #[cfg(feature = "websocket")]
    pub fn connect(config: FeedConfig) -> Result<Self, SessionError> {
        Self::connect_with(WebSocketConnector, WebSocketConnector, config)
    }

    /// Starts a feed with explicit connectors.
    ///
    /// This is the seam tests use to run the whole pipeline in memory.
    pub fn connect_with<G, S>(
        gateway: G,
        sink: S,
        config: FeedConfig,
    ) -> Result<Self, SessionError>
    where
        G: Connector,
        S: Connector,
    {
        let (feed_tx, feed_rx) = mpsc::channel(FEED_BUFFER);
        let session = feltwire_session::spawn(gateway, config.profile, feed_tx)?;
        let (push_tx, push_rx) = mpsc::channel(PUSH_BUFFER);
        let aggregator = aggregator::spawn(config.aggregator, feed_rx, push_tx);
        relay::spawn(sink, config.sink, push_rx);
        Ok(Self {
            session,
            aggregator,
        })
    }

    /// Subscribes to one table's feed.
    pub async fn enter_table(&self, table_id: i64, game_no: &str) -> Result<(), SessionError> {
        self.session.enter_table(table_id, game_no).await
    }

    /// Signs and sends one bet on a table.
    ///
    /// When `game_no` is `None` the round last announced by the gateway
    /// for that table is used.
    pub async fn place_bet(
        &self,
        table_id: i64,
        bet: SingleBet,
        game_no: Option<String>,
    ) -> Result<(), SessionError> {
        self.session.place_bet(table_id, bet, game_no).await
    }

    /// Current snapshots of every known table, without waiting for the
    /// next debounced push.
    pub async fn snapshot(&self) -> Vec<TableSnapshot> {
        self.aggregator.snapshot().await
    }

    /// Stops the feed: closes the gateway link, lets the aggregator
    /// flush, and winds down the sink relay.
    pub async fn shutdown(&self) {
        self.session.shutdown().await;
    }
}
