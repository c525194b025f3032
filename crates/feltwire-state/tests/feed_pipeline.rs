//! End-to-end: feed items in, one debounced envelope at the sink.

use std::collections::VecDeque;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicU64, Ordering};

use feltwire_protocol::{PublicRecord, TableSummary, WireWriter, command_of, decode_message, project_public};
use feltwire_session::{FeedItem, cmd};
use feltwire_state::{AggregatorConfig, SinkConfig, TableBook, aggregator, relay};
use feltwire_transport::{Connection, ConnectionId, Connector, TransportError};
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

struct MockConnection {
    id: ConnectionId,
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    sent: mpsc::UnboundedSender<Vec<u8>>,
}

impl Connection for MockConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        self.sent
            .send(data.to_vec())
            .map_err(|_| TransportError::ConnectionClosed("sink gone".into()))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.inbound.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

struct Script {
    _inbound: mpsc::UnboundedSender<Vec<u8>>,
    sent: mpsc::UnboundedReceiver<Vec<u8>>,
}

fn scripted_connection() -> (MockConnection, Script) {
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    let conn = MockConnection {
        id: ConnectionId::new(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
        inbound: Mutex::new(in_rx),
        sent: sent_tx,
    };
    (
        conn,
        Script {
            _inbound: in_tx,
            sent: sent_rx,
        },
    )
}

struct MockConnector {
    dials: StdMutex<VecDeque<Result<MockConnection, TransportError>>>,
}

impl Connector for MockConnector {
    type Connection = MockConnection;
    type Error = TransportError;

    async fn connect(&self, _url: &str) -> Result<Self::Connection, Self::Error> {
        match self.dials.lock() {
            Ok(mut dials) => dials.pop_front().unwrap_or_else(|| {
                Err(TransportError::ConnectionClosed("script exhausted".into()))
            }),
            Err(_) => Err(TransportError::ConnectionClosed("poisoned".into())),
        }
    }
}

fn item(command: i32, record: PublicRecord) -> FeedItem {
    FeedItem {
        cmd: command,
        record,
    }
}

#[tokio::test(start_paused = true)]
async fn test_feed_to_sink_round_trip() {
    let (conn, mut script) = scripted_connection();
    let connector = MockConnector {
        dials: StdMutex::new(VecDeque::from([Ok(conn)])),
    };

    let (feed_tx, feed_rx) = mpsc::channel(32);
    let (push_tx, push_rx) = mpsc::channel(32);
    let _agg = aggregator::spawn(AggregatorConfig::default(), feed_rx, push_tx);
    relay::spawn(connector, SinkConfig::new("ws://sink"), push_rx);

    // Lobby snapshot introduces the table, round state arms betting, a
    // lobby delta refreshes the crowd. One coalesced push must follow.
    feed_tx
        .send(item(
            cmd::LOBBY_SNAPSHOT,
            PublicRecord {
                cmd: cmd::LOBBY_SNAPSHOT,
                tables: vec![TableSummary {
                    table_id: 5,
                    table_name: "Baccarat 5".to_owned(),
                    online_count: 12,
                    total_amount: 800.0,
                    ..TableSummary::default()
                }],
                ..PublicRecord::default()
            },
        ))
        .await
        .unwrap();
    feed_tx
        .send(item(
            cmd::ROUND_STATE,
            PublicRecord {
                cmd: cmd::ROUND_STATE,
                tables: vec![TableSummary {
                    table_id: 5,
                    state: 1,
                    count_down: 25,
                    ..TableSummary::default()
                }],
                ..PublicRecord::default()
            },
        ))
        .await
        .unwrap();

    let raw = script.sent.recv().await.unwrap();
    let v: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(v["type"], "tableFeed");
    let data = v["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["tableInfo"]["tableID"], 5);
    assert_eq!(data[0]["tableInfo"]["tableName"], "Baccarat 5");
    assert_eq!(data[0]["dealerEvent"]["eventType"], "GP_BETTING");
    assert_eq!(data[0]["dealerEvent"]["countdownBase"], 25);
    assert_eq!(data[0]["betInfo"]["betCount"], 12);

    // The whole burst coalesced into exactly one envelope.
    assert!(script.sent.try_recv().is_err());
}

/// Decodes one raw gateway frame the way the session layer does before the
/// aggregator sees it.
fn frame_to_item(frame: &[u8]) -> FeedItem {
    let map = decode_message(frame).expect("decode");
    FeedItem {
        cmd: command_of(&map).expect("command"),
        record: project_public(&map),
    }
}

#[tokio::test(start_paused = true)]
async fn test_raw_lobby_frames_update_one_table_in_place() {
    // Lobby snapshot (cmd 43) carrying one table row at 100.0.
    let mut row = WireWriter::new();
    row.int64(1, 7);
    row.string(13, "Baccarat 7");
    row.double(15, 100.0);
    row.int64(16, 3);
    let mut snapshot = WireWriter::new();
    snapshot.int32(1, cmd::LOBBY_SNAPSHOT);
    snapshot.bytes(17, &row.into_bytes());

    // Lobby delta (cmd 207) revising the same table to 150.0.
    let mut delta_row = WireWriter::new();
    delta_row.int64(1, 7);
    delta_row.int64(2, 4);
    delta_row.double(3, 150.0);
    let mut delta = WireWriter::new();
    delta.int32(1, cmd::LOBBY_DELTA);
    delta.bytes(16, &delta_row.into_bytes());

    let mut book = TableBook::new();
    let now = Instant::now();

    assert!(book.apply(&frame_to_item(&snapshot.into_bytes()), now));
    assert_eq!(book.len(), 1);
    let s = &book.get(7).unwrap().summary;
    assert_eq!(s.total_amount, 100.0);
    assert_eq!(s.table_name, "Baccarat 7");

    assert!(book.apply(&frame_to_item(&delta.into_bytes()), now));
    assert_eq!(book.len(), 1, "delta must revise in place, not create");
    let s = &book.get(7).unwrap().summary;
    assert_eq!(s.total_amount, 150.0);
    assert_eq!(s.online_count, 4);
    assert_eq!(s.table_name, "Baccarat 7", "name survives the delta");
}
