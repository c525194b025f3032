//! The sink relay actor: carries push envelopes to the downstream sink.
//!
//! The relay keeps exactly one outbound connection. While it is down,
//! envelopes queue up to a bounded depth, oldest dropped first, and a
//! single backoff timer paces the redials. On connect the queue flushes
//! in arrival order before live traffic resumes. The actor stops when
//! its input closes.

use std::collections::VecDeque;
use std::time::Duration;

use feltwire_transport::{Connection, Connector};
use tokio::sync::mpsc;
use tokio::time::Instant;

const MIN_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);
const MIN_QUEUE_DEPTH: usize = 1;

/// Configuration for the sink relay.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Where pushes go.
    pub endpoint: String,
    /// Delay before redialing a lost sink.
    pub reconnect_backoff: Duration,
    /// How many envelopes may wait while the sink is down.
    pub queue_depth: usize,
}

impl SinkConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reconnect_backoff: Duration::from_secs(5),
            queue_depth: 256,
        }
    }

    /// Returns a copy with the knobs clamped to sane ranges.
    pub fn validated(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            reconnect_backoff: self.reconnect_backoff.clamp(MIN_BACKOFF, MAX_BACKOFF),
            queue_depth: self.queue_depth.max(MIN_QUEUE_DEPTH),
        }
    }
}

/// Spawns a relay forwarding everything received on `input` to the sink.
pub fn spawn<C>(connector: C, config: SinkConfig, input: mpsc::Receiver<String>)
where
    C: Connector,
{
    tokio::spawn(run(connector, config.validated(), input));
}

async fn run<C>(connector: C, config: SinkConfig, mut input: mpsc::Receiver<String>)
where
    C: Connector,
{
    let mut queue: VecDeque<String> = VecDeque::new();

    loop {
        match connector.connect(&config.endpoint).await {
            Ok(conn) => {
                let id = conn.id();
                tracing::info!(%id, endpoint = %config.endpoint, "sink connected");
                if !flush(&conn, &mut queue).await {
                    tracing::warn!(%id, "sink lost while flushing the queue");
                } else if !pump(&conn, &mut input, &mut queue, config.queue_depth).await {
                    let _ = conn.close().await;
                    return;
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "sink dial failed");
            }
        }

        // One backoff timer; input keeps queueing while it runs.
        if !park(&mut input, &mut queue, config.reconnect_backoff, config.queue_depth).await {
            return;
        }
    }
}

/// Sends queued envelopes in order. `false` means the sink dropped; the
/// unsent remainder stays queued.
async fn flush<T>(conn: &T, queue: &mut VecDeque<String>) -> bool
where
    T: Connection,
{
    while let Some(envelope) = queue.front() {
        if let Err(err) = conn.send(envelope.as_bytes()).await {
            tracing::warn!(error = %err, "sink send failed");
            return false;
        }
        queue.pop_front();
    }
    true
}

/// Live traffic loop. Returns `false` when the input closed (stop for
/// good), `true` when the sink dropped (redial).
async fn pump<T>(
    conn: &T,
    input: &mut mpsc::Receiver<String>,
    queue: &mut VecDeque<String>,
    depth: usize,
) -> bool
where
    T: Connection,
{
    loop {
        tokio::select! {
            envelope = input.recv() => match envelope {
                Some(envelope) => {
                    if let Err(err) = conn.send(envelope.as_bytes()).await {
                        tracing::warn!(error = %err, "sink send failed");
                        enqueue(queue, envelope, depth);
                        return true;
                    }
                }
                None => {
                    tracing::info!("input closed, sink relay stopping");
                    return false;
                }
            },

            // The sink does not talk back; recv only tells us it is gone.
            inbound = conn.recv() => match inbound {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::info!("sink closed the connection");
                    return true;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "sink receive failed");
                    return true;
                }
            },
        }
    }
}

/// Waits out the backoff while still queueing input. `false` when the
/// input closed with nothing left to deliver.
async fn park(
    input: &mut mpsc::Receiver<String>,
    queue: &mut VecDeque<String>,
    backoff: Duration,
    depth: usize,
) -> bool {
    let deadline = Instant::now() + backoff;
    loop {
        tokio::select! {
            () = tokio::time::sleep_until(deadline) => return true,
            envelope = input.recv() => match envelope {
                Some(envelope) => enqueue(queue, envelope, depth),
                None => {
                    // Keep redialing only if something is still queued.
                    return !queue.is_empty();
                }
            },
        }
    }
}

fn enqueue(queue: &mut VecDeque<String>, envelope: String, depth: usize) {
    while queue.len() >= depth {
        queue.pop_front();
        tracing::debug!("sink queue full, dropping oldest envelope");
    }
    queue.push_back(envelope);
}
