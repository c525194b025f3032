//! The channel actor: owns one gateway link end to end.
//!
//! The channel dials, pumps frames, watches the ack grace, and redials
//! after loss with a single armed backoff timer. It knows nothing about
//! commands or signing — bytes in, bytes out, lifecycle events up. The
//! actor owns its [`LinkState`] exclusively; everything else talks to it
//! through the mailbox.

use std::time::Duration;

use feltwire_transport::{Connection, ConnectionId, Connector};
use tokio::sync::mpsc;

use crate::link::{LinkEvent, LinkState};
use crate::SessionError;

/// Mailbox messages for the channel actor.
#[derive(Debug)]
pub enum ChannelCommand {
    /// Send one frame on the current connection.
    Send(Vec<u8>),
    /// Close the link and stop. No redial follows.
    Shutdown,
}

/// Lifecycle and traffic events emitted by the channel actor.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A socket is up. Traffic may be sent; the gateway has not spoken.
    Up { connection: ConnectionId },
    /// The gateway's first frame arrived on this connection.
    Ready { connection: ConnectionId },
    /// One inbound frame.
    Frame {
        connection: ConnectionId,
        payload: Vec<u8>,
    },
    /// The link dropped or a dial failed; a redial is armed.
    Down { reason: String },
}

/// Cloneable handle to a running channel actor.
#[derive(Clone)]
pub struct ChannelHandle {
    tx: mpsc::Sender<ChannelCommand>,
}

impl ChannelHandle {
    /// Queues one frame for sending.
    pub async fn send(&self, frame: Vec<u8>) -> Result<(), SessionError> {
        self.tx
            .send(ChannelCommand::Send(frame))
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Requests shutdown. Idempotent; a closed actor is a no-op.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(ChannelCommand::Shutdown).await;
    }
}

/// Timing knobs the channel needs, lifted out of the vendor profile.
#[derive(Debug, Clone)]
pub struct ChannelTiming {
    /// How long to wait for the gateway's first frame before proceeding
    /// as ready.
    pub ack_grace: Duration,
    /// Delay before the redial after loss.
    pub reconnect_backoff: Duration,
}

/// Spawns a channel actor dialing `url` through `connector`.
///
/// Events flow out through `events`; the actor stops when the handle is
/// dropped, on [`ChannelCommand::Shutdown`], or when the event receiver
/// goes away.
pub fn spawn<C>(
    connector: C,
    url: String,
    timing: ChannelTiming,
    events: mpsc::Sender<ChannelEvent>,
) -> ChannelHandle
where
    C: Connector,
{
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(run(connector, url, timing, rx, events));
    ChannelHandle { tx }
}

async fn run<C>(
    connector: C,
    url: String,
    timing: ChannelTiming,
    mut cmds: mpsc::Receiver<ChannelCommand>,
    events: mpsc::Sender<ChannelEvent>,
) where
    C: Connector,
{
    let mut state = LinkState::Disconnected;

    while !state.is_terminal() {
        // At this point the state is Disconnected or Reconnecting, both of
        // which accept a dial. The mailbox stays armed throughout: a
        // shutdown request must win over a dial in flight.
        state = advance(state, LinkEvent::DialStarted);

        tokio::select! {
            attempt = connector.connect(&url) => match attempt {
                Ok(conn) => {
                    state = advance(state, LinkEvent::SocketUp);
                    if events
                        .send(ChannelEvent::Up { connection: conn.id() })
                        .await
                        .is_err()
                    {
                        return;
                    }
                    state = pump(&conn, state, &timing, &mut cmds, &events).await;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "dial failed");
                    if events
                        .send(ChannelEvent::Down {
                            reason: err.to_string(),
                        })
                        .await
                        .is_err()
                    {
                        return;
                    }
                    state = advance(state, LinkEvent::LinkLost);
                }
            },
            () = shutdown_while_down(&mut cmds) => {
                tracing::info!("channel shut down, abandoning dial");
                state = advance(state, LinkEvent::CloseRequested);
            }
        }

        if state == LinkState::Reconnecting {
            // Exactly one backoff timer; a shutdown request releases it
            // instead of letting the redial happen.
            tokio::select! {
                () = tokio::time::sleep(timing.reconnect_backoff) => {}
                () = shutdown_while_down(&mut cmds) => {
                    tracing::info!("channel shut down, abandoning redial");
                    state = advance(state, LinkEvent::CloseRequested);
                }
            }
        }
    }
}

/// Resolves when shutdown is requested (or every handle is gone) while no
/// connection exists. Send commands cannot be carried without one and are
/// dropped, matching a failed send on a live link.
async fn shutdown_while_down(cmds: &mut mpsc::Receiver<ChannelCommand>) {
    loop {
        match cmds.recv().await {
            None | Some(ChannelCommand::Shutdown) => return,
            Some(ChannelCommand::Send(_)) => {
                tracing::debug!("link down, dropping outbound frame");
            }
        }
    }
}

/// Drives one live connection until it drops or shutdown is requested.
/// Returns the state the outer loop should continue from.
async fn pump<T>(
    conn: &T,
    mut state: LinkState,
    timing: &ChannelTiming,
    cmds: &mut mpsc::Receiver<ChannelCommand>,
    events: &mpsc::Sender<ChannelEvent>,
) -> LinkState
where
    T: Connection,
{
    let id = conn.id();
    let ack_deadline = tokio::time::sleep(timing.ack_grace);
    tokio::pin!(ack_deadline);

    loop {
        tokio::select! {
            cmd = cmds.recv() => match cmd {
                None | Some(ChannelCommand::Shutdown) => {
                    let _ = conn.close().await;
                    tracing::info!(%id, "channel shut down");
                    return advance(state, LinkEvent::CloseRequested);
                }
                Some(ChannelCommand::Send(frame)) => {
                    if let Err(err) = conn.send(&frame).await {
                        tracing::warn!(%id, error = %err, "send failed");
                        let _ = events.send(ChannelEvent::Down {
                            reason: err.to_string(),
                        }).await;
                        return advance(state, LinkEvent::LinkLost);
                    }
                }
            },

            inbound = conn.recv() => match inbound {
                Ok(Some(payload)) => {
                    if state == LinkState::AwaitingAck {
                        state = advance(state, LinkEvent::FirstFrame);
                        if events
                            .send(ChannelEvent::Ready { connection: id })
                            .await
                            .is_err()
                        {
                            return advance(state, LinkEvent::CloseRequested);
                        }
                    }
                    if events
                        .send(ChannelEvent::Frame { connection: id, payload })
                        .await
                        .is_err()
                    {
                        return advance(state, LinkEvent::CloseRequested);
                    }
                }
                Ok(None) => {
                    tracing::info!(%id, "gateway closed the connection");
                    let _ = events.send(ChannelEvent::Down {
                        reason: "closed by peer".to_owned(),
                    }).await;
                    return advance(state, LinkEvent::LinkLost);
                }
                Err(err) => {
                    tracing::warn!(%id, error = %err, "receive failed");
                    let _ = events.send(ChannelEvent::Down {
                        reason: err.to_string(),
                    }).await;
                    return advance(state, LinkEvent::LinkLost);
                }
            },

            // Some gateways never ack; after the grace the link counts as
            // ready and traffic proceeds.
            _ = &mut ack_deadline, if state == LinkState::AwaitingAck => {
                tracing::debug!(%id, "no ack within grace, proceeding as ready");
                state = advance(state, LinkEvent::FirstFrame);
                if events
                    .send(ChannelEvent::Ready { connection: id })
                    .await
                    .is_err()
                {
                    return advance(state, LinkEvent::CloseRequested);
                }
            }
        }
    }
}

/// Applies one event, keeping the state where the machine declines the
/// transition.
fn advance(state: LinkState, event: LinkEvent) -> LinkState {
    match state.transition(event) {
        Some(next) => next,
        None => {
            tracing::trace!(%state, ?event, "transition ignored");
            state
        }
    }
}
