//! The aggregator actor: folds the feed into the table book and pushes
//! debounced snapshots.
//!
//! Every feed item that changes the book arms a single debounce timer;
//! further changes inside the window coalesce into the timer already
//! running. When it fires, one envelope carrying every table's snapshot
//! goes out. The actor stops when the feed closes, flushing a pending
//! push first.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use feltwire_session::FeedItem;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::snapshot::{PushEnvelope, TableSnapshot, build_snapshot};
use crate::table::TableBook;

const MIN_DEBOUNCE: Duration = Duration::from_millis(50);
const MAX_DEBOUNCE: Duration = Duration::from_secs(5);

/// Configuration for the aggregator actor.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Quiet window after a change before the push fires.
    pub debounce: Duration,
    /// The `type` discriminator stamped on every push envelope.
    pub envelope_kind: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            envelope_kind: "tableFeed".to_owned(),
        }
    }
}

impl AggregatorConfig {
    /// Returns a copy with the debounce clamped to a sane range.
    pub fn validated(&self) -> Self {
        Self {
            debounce: self.debounce.clamp(MIN_DEBOUNCE, MAX_DEBOUNCE),
            envelope_kind: self.envelope_kind.clone(),
        }
    }
}

/// Mailbox messages for the aggregator actor.
#[derive(Debug)]
pub enum AggregatorCommand {
    /// Ask for the current snapshots without waiting for a push.
    Snapshot(oneshot::Sender<Vec<TableSnapshot>>),
}

/// Cloneable handle to a running aggregator actor.
#[derive(Clone)]
pub struct AggregatorHandle {
    tx: mpsc::Sender<AggregatorCommand>,
}

impl AggregatorHandle {
    /// Current snapshots of every known table, bypassing the debounce.
    ///
    /// Returns an empty list when the actor has stopped.
    pub async fn snapshot(&self) -> Vec<TableSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .tx
            .send(AggregatorCommand::Snapshot(reply_tx))
            .await
            .is_err()
        {
            return Vec::new();
        }
        reply_rx.await.unwrap_or_default()
    }
}

/// Spawns an aggregator consuming `feed` and emitting serialized push
/// envelopes on `out`.
pub fn spawn(
    config: AggregatorConfig,
    feed: mpsc::Receiver<FeedItem>,
    out: mpsc::Sender<String>,
) -> AggregatorHandle {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(run(config.validated(), feed, rx, out));
    AggregatorHandle { tx }
}

async fn run(
    config: AggregatorConfig,
    mut feed: mpsc::Receiver<FeedItem>,
    mut cmds: mpsc::Receiver<AggregatorCommand>,
    out: mpsc::Sender<String>,
) {
    let mut book = TableBook::new();
    let mut dirty = false;
    let debounce = tokio::time::sleep(config.debounce);
    tokio::pin!(debounce);

    loop {
        tokio::select! {
            item = feed.recv() => match item {
                Some(item) => {
                    if book.apply(&item, Instant::now()) && !dirty {
                        dirty = true;
                        debounce.as_mut().reset(Instant::now() + config.debounce);
                    }
                }
                None => break,
            },

            Some(cmd) = cmds.recv() => match cmd {
                AggregatorCommand::Snapshot(reply) => {
                    let _ = reply.send(collect(&book));
                }
            },

            _ = &mut debounce, if dirty => {
                dirty = false;
                if push(&config, &book, &out).await.is_err() {
                    tracing::info!("push receiver gone, aggregator stopping");
                    return;
                }
            }
        }
    }

    if dirty {
        let _ = push(&config, &book, &out).await;
    }
    tracing::info!("feed closed, aggregator stopped");
}

fn collect(book: &TableBook) -> Vec<TableSnapshot> {
    let now = Instant::now();
    let now_ms = wall_millis();
    book.tables()
        .map(|(id, entry)| build_snapshot(id, entry, now, now_ms))
        .collect()
}

async fn push(
    config: &AggregatorConfig,
    book: &TableBook,
    out: &mpsc::Sender<String>,
) -> Result<(), ()> {
    let envelope = PushEnvelope {
        kind: config.envelope_kind.clone(),
        data: collect(book),
    };
    match serde_json::to_string(&envelope) {
        Ok(json) => {
            tracing::debug!(tables = envelope.data.len(), "pushing snapshot envelope");
            out.send(json).await.map_err(|_| ())
        }
        Err(err) => {
            tracing::warn!(error = %err, "snapshot envelope failed to serialize");
            Ok(())
        }
    }
}

fn wall_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use feltwire_protocol::{PublicRecord, TableSummary};
    use feltwire_session::cmd;

    fn snapshot_item(ids: &[i64]) -> FeedItem {
        FeedItem {
            cmd: cmd::LOBBY_SNAPSHOT,
            record: PublicRecord {
                cmd: cmd::LOBBY_SNAPSHOT,
                tables: ids
                    .iter()
                    .map(|&id| TableSummary {
                        table_id: id,
                        table_name: format!("T{id}"),
                        ..TableSummary::default()
                    })
                    .collect(),
                ..PublicRecord::default()
            },
        }
    }

    fn round_item(table_id: i64, state: i64) -> FeedItem {
        FeedItem {
            cmd: cmd::ROUND_STATE,
            record: PublicRecord {
                cmd: cmd::ROUND_STATE,
                tables: vec![TableSummary {
                    table_id,
                    state,
                    count_down: 20,
                    ..TableSummary::default()
                }],
                ..PublicRecord::default()
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_changes_within_window_coalesce_into_one_push() {
        let (feed_tx, feed_rx) = mpsc::channel(16);
        let (out_tx, mut out_rx) = mpsc::channel(16);
        let _handle = spawn(AggregatorConfig::default(), feed_rx, out_tx);

        feed_tx.send(snapshot_item(&[1, 2])).await.unwrap();
        feed_tx.send(round_item(1, 1)).await.unwrap();
        feed_tx.send(round_item(2, 2)).await.unwrap();

        let json = out_rx.recv().await.unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["type"], "tableFeed");
        assert_eq!(v["data"].as_array().unwrap().len(), 2);
        assert_eq!(v["data"][0]["dealerEvent"]["eventType"], "GP_BETTING");
        assert_eq!(v["data"][1]["dealerEvent"]["eventType"], "GP_DEALING");

        // Nothing further changed: no second push.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(out_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_item_that_changes_nothing_does_not_push() {
        let (feed_tx, feed_rx) = mpsc::channel(16);
        let (out_tx, mut out_rx) = mpsc::channel(16);
        let _handle = spawn(AggregatorConfig::default(), feed_rx, out_tx);

        // Round state for a table no snapshot introduced.
        feed_tx.send(round_item(7, 1)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(out_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_change_opens_a_second_window() {
        let (feed_tx, feed_rx) = mpsc::channel(16);
        let (out_tx, mut out_rx) = mpsc::channel(16);
        let _handle = spawn(AggregatorConfig::default(), feed_rx, out_tx);

        feed_tx.send(snapshot_item(&[1])).await.unwrap();
        out_rx.recv().await.unwrap();

        feed_tx.send(round_item(1, 1)).await.unwrap();
        let json = out_rx.recv().await.unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["data"][0]["dealerEvent"]["eventType"], "GP_BETTING");
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_close_flushes_pending_push() {
        let (feed_tx, feed_rx) = mpsc::channel(16);
        let (out_tx, mut out_rx) = mpsc::channel(16);
        let _handle = spawn(AggregatorConfig::default(), feed_rx, out_tx);

        feed_tx.send(snapshot_item(&[1])).await.unwrap();
        drop(feed_tx);

        // The pending change goes out even though the window never elapsed.
        let json = out_rx.recv().await.unwrap();
        assert!(json.contains("\"tableID\":1"));
        assert_eq!(out_rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_query_bypasses_debounce() {
        let (feed_tx, feed_rx) = mpsc::channel(16);
        let (out_tx, _out_rx) = mpsc::channel(16);
        let handle = spawn(AggregatorConfig::default(), feed_rx, out_tx);

        feed_tx.send(snapshot_item(&[1, 2, 3])).await.unwrap();
        tokio::task::yield_now().await;

        let snaps = handle.snapshot().await;
        assert_eq!(snaps.len(), 3);
        assert_eq!(snaps[0].table_info.table_name, "T1");
    }

    #[test]
    fn test_validated_clamps_debounce() {
        let config = AggregatorConfig {
            debounce: Duration::from_millis(1),
            ..AggregatorConfig::default()
        };
        assert_eq!(config.validated().debounce, MIN_DEBOUNCE);

        let config = AggregatorConfig {
            debounce: Duration::from_secs(600),
            ..AggregatorConfig::default()
        };
        assert_eq!(config.validated().debounce, MAX_DEBOUNCE);
    }
}
