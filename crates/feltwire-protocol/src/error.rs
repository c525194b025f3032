//! Error types for the protocol layer.

/// Errors produced while decoding or encoding wire messages.
///
/// Decode errors are contained per frame: the channel that produced the
/// frame keeps running, the frame is logged and dropped.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    /// The buffer ended before a complete value could be read.
    #[error("truncated input at offset {0}")]
    TruncatedInput(usize),

    /// A tag carried a wire type the format does not define.
    ///
    /// Wire types 3, 4, 6 and 7 have no length information, so the
    /// remainder of the buffer cannot be decoded past one of these.
    #[error("unknown wire type {0}")]
    UnknownWireType(u32),

    /// The frame decoded but carries no command field.
    ///
    /// Every inbound frame must have an integer command in field 1;
    /// a frame without one cannot be dispatched and is rejected whole.
    #[error("frame is missing the command field")]
    MissingCommand,
}
