//! The link lifecycle state machine.
//!
//! Kept pure so the transition rules can be tested exhaustively without a
//! socket. The channel actor owns one of these and never moves it except
//! through [`LinkState::transition`].

/// The lifecycle state of the gateway link.
///
/// ```text
/// Disconnected → Connecting → AwaitingAck → Ready
///                    │             │          │
///                    └──────► Reconnecting ◄──┘
///                                  │
///                                  └──► Connecting (after backoff)
/// ```
///
/// `Closing` is reachable from every state except itself and is terminal:
/// a closing link never redials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No socket, no pending dial. The initial state.
    Disconnected,
    /// A dial is in flight.
    Connecting,
    /// The socket is up but the gateway has not spoken yet.
    AwaitingAck,
    /// The gateway has answered; traffic flows.
    Ready,
    /// The link dropped; a single redial timer is pending.
    Reconnecting,
    /// Shutdown requested. Terminal.
    Closing,
}

/// Observable events that drive the link machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// A dial was started.
    DialStarted,
    /// The socket handshake completed.
    SocketUp,
    /// The first inbound frame arrived on the new socket, or the ack
    /// grace elapsed on a gateway that never acks.
    FirstFrame,
    /// The socket dropped or the dial failed.
    LinkLost,
    /// The owner asked for shutdown.
    CloseRequested,
}

impl LinkState {
    /// `true` when a dial should actually be issued.
    ///
    /// Dial requests are idempotent: asking to connect while a dial is in
    /// flight or the link is already up is a no-op.
    pub fn wants_dial(self) -> bool {
        matches!(self, Self::Disconnected | Self::Reconnecting)
    }

    /// `true` once the gateway has acknowledged the connection.
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    /// `true` when no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closing)
    }

    /// Applies one event. Returns `None` for transitions the machine does
    /// not define; callers treat those as no-ops and log at trace level.
    pub fn transition(self, event: LinkEvent) -> Option<Self> {
        use LinkEvent::*;
        match (self, event) {
            (Self::Closing, _) => None,
            (_, CloseRequested) => Some(Self::Closing),

            (Self::Disconnected | Self::Reconnecting, DialStarted) => Some(Self::Connecting),
            (Self::Connecting, SocketUp) => Some(Self::AwaitingAck),
            (Self::AwaitingAck, FirstFrame) => Some(Self::Ready),

            // Loss from any live state arms exactly one redial; the dial
            // after the backoff is just another DialStarted.
            (Self::Connecting | Self::AwaitingAck | Self::Ready, LinkLost) => {
                Some(Self::Reconnecting)
            }

            _ => None,
        }
    }
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::AwaitingAck => write!(f, "AwaitingAck"),
            Self::Ready => write!(f, "Ready"),
            Self::Reconnecting => write!(f, "Reconnecting"),
            Self::Closing => write!(f, "Closing"),
        }
    }
}
