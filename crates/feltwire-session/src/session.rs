//! The session actor: one vendor feed, end to end.
//!
//! Wires a [`channel`](crate::channel) actor to a [`SessionManager`]:
//! frames coming up from the channel are dispatched and forwarded as
//! [`FeedItem`]s, the heartbeat is paced while the link is up, and every
//! fresh socket gets the init sequence followed by re-entry of all
//! previously entered tables. Callers drive it through a [`SessionHandle`].

use feltwire_signing::{SingleBet, signed_url};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::channel::{self, ChannelEvent, ChannelHandle, ChannelTiming};
use crate::manager::{FeedItem, SessionManager};
use crate::profile::VendorProfile;
use crate::SessionError;
use feltwire_transport::Connector;

/// Mailbox messages for the session actor.
pub enum SessionCommand {
    /// Enter a table: send the subscription burst and remember the table.
    EnterTable { table_id: i64, game_no: String },
    /// Sign and send one bet.
    PlaceBet {
        table_id: i64,
        bet: SingleBet,
        game_no: Option<String>,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    /// Close the link and stop.
    Shutdown,
}

/// Cloneable handle to a running session actor.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Subscribes to one table's feed.
    pub async fn enter_table(&self, table_id: i64, game_no: &str) -> Result<(), SessionError> {
        self.tx
            .send(SessionCommand::EnterTable {
                table_id,
                game_no: game_no.to_owned(),
            })
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Signs and sends one bet, waiting for the send to be accepted.
    pub async fn place_bet(
        &self,
        table_id: i64,
        bet: SingleBet,
        game_no: Option<String>,
    ) -> Result<(), SessionError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(SessionCommand::PlaceBet {
                table_id,
                bet,
                game_no,
                reply,
            })
            .await
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)?
    }

    /// Requests shutdown. Idempotent.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(SessionCommand::Shutdown).await;
    }
}

/// Spawns a session for `profile`, dialing through `connector`.
///
/// Dispatched feed items flow out through `feed`; dropping the receiver
/// stops the actor.
pub fn spawn<C>(
    connector: C,
    profile: VendorProfile,
    feed: mpsc::Sender<FeedItem>,
) -> Result<SessionHandle, SessionError>
where
    C: Connector,
{
    let manager = SessionManager::new(profile);
    let url = signed_url(
        &manager.profile().endpoint,
        &manager.profile().token,
        &manager.profile().session_key,
    )?;
    let timing = ChannelTiming {
        ack_grace: manager.profile().ack_grace,
        reconnect_backoff: manager.profile().reconnect_backoff,
    };

    let (event_tx, event_rx) = mpsc::channel(256);
    let channel = channel::spawn(connector, url, timing, event_tx);

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(run(manager, channel, rx, event_rx, feed));
    Ok(SessionHandle { tx })
}

async fn run(
    mut manager: SessionManager,
    channel: ChannelHandle,
    mut cmds: mpsc::Receiver<SessionCommand>,
    mut events: mpsc::Receiver<ChannelEvent>,
    feed: mpsc::Sender<FeedItem>,
) {
    let mut heartbeat = tokio::time::interval(manager.profile().heartbeat_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut link_up = false;
    let mut init_task: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            cmd = cmds.recv() => match cmd {
                None | Some(SessionCommand::Shutdown) => {
                    abort_init(&mut init_task);
                    channel.shutdown().await;
                    return;
                }
                Some(SessionCommand::EnterTable { table_id, game_no }) => {
                    match manager.enter_room(table_id, &game_no) {
                        Ok(burst) => send_all(&channel, burst).await,
                        Err(err) => {
                            tracing::warn!(table_id, error = %err, "enter-room failed");
                        }
                    }
                }
                Some(SessionCommand::PlaceBet { table_id, bet, game_no, reply }) => {
                    let result = place_bet(
                        &manager, &channel, table_id, &bet, game_no.as_deref(),
                    )
                    .await;
                    let _ = reply.send(result);
                }
            },

            event = events.recv() => match event {
                None => return,
                Some(ChannelEvent::Up { connection }) => {
                    tracing::info!(%connection, "link up, scheduling init sequence");
                    link_up = true;
                    abort_init(&mut init_task);
                    init_task = schedule_init(&mut manager, &channel);
                }
                Some(ChannelEvent::Ready { connection }) => {
                    tracing::debug!(%connection, "gateway acknowledged");
                }
                Some(ChannelEvent::Frame { connection, payload }) => {
                    match manager.handle_frame(&payload) {
                        Ok(item) => {
                            if feed.send(item).await.is_err() {
                                abort_init(&mut init_task);
                                channel.shutdown().await;
                                return;
                            }
                        }
                        Err(err) => {
                            tracing::debug!(%connection, error = %err, "dropping frame");
                        }
                    }
                }
                Some(ChannelEvent::Down { reason }) => {
                    tracing::warn!(%reason, "link down");
                    link_up = false;
                    abort_init(&mut init_task);
                }
            },

            _ = heartbeat.tick(), if link_up => {
                match manager.heartbeat_frame() {
                    Ok(env) => {
                        if channel.send(env.encode()).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => tracing::warn!(error = %err, "heartbeat build failed"),
                }
            }
        }
    }
}

async fn place_bet(
    manager: &SessionManager,
    channel: &ChannelHandle,
    table_id: i64,
    bet: &SingleBet,
    game_no: Option<&str>,
) -> Result<(), SessionError> {
    let env = manager.place_bet(table_id, bet, game_no)?;
    channel.send(env.encode()).await
}

async fn send_all(channel: &ChannelHandle, frames: Vec<feltwire_protocol::Envelope>) {
    for frame in frames {
        if channel.send(frame.encode()).await.is_err() {
            return;
        }
    }
}

/// Builds the init sequence plus re-entry bursts for every table entered
/// so far, and spawns a task that sends them with the configured pacing.
///
/// The task is aborted when the link drops so a dead connection's schedule
/// never bleeds into the next one.
fn schedule_init(manager: &mut SessionManager, channel: &ChannelHandle) -> Option<JoinHandle<()>> {
    let mut frames = match manager.init_frames() {
        Ok(frames) => frames,
        Err(err) => {
            tracing::error!(error = %err, "init sequence build failed");
            return None;
        }
    };

    let entered: Vec<i64> = manager.entered_tables().collect();
    for table_id in entered {
        let game_no = manager
            .runtime(table_id)
            .map(|rt| rt.game_no.clone())
            .unwrap_or_default();
        match manager.enter_room(table_id, &game_no) {
            Ok(burst) => frames.extend(burst),
            Err(err) => {
                tracing::warn!(table_id, error = %err, "re-entry build failed");
            }
        }
    }

    let channel = channel.clone();
    let delay = manager.profile().init_delay;
    let spacing = manager.profile().init_spacing;
    Some(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        for frame in frames {
            if channel.send(frame.encode()).await.is_err() {
                return;
            }
            tokio::time::sleep(spacing).await;
        }
    }))
}

fn abort_init(task: &mut Option<JoinHandle<()>>) {
    if let Some(task) = task.take() {
        task.abort();
    }
}
