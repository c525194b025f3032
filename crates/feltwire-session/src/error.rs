//! Error types for the session layer.

use feltwire_protocol::WireError;
use feltwire_signing::SigningError;

/// Errors that can occur while running a vendor session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A frame could not be decoded. The frame is dropped; the session
    /// keeps running.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Sealing a token or bet failed.
    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    /// A bet was requested for a table whose round is not known yet.
    #[error("no active round known for table {0}")]
    UnknownRound(i64),

    /// The session actor has shut down and its mailbox is gone.
    #[error("session closed")]
    Closed,
}
