//! Error types for the signing layer.

/// Errors produced while sealing requests.
///
/// The `Missing*` variants are preconditions: both values arrive on the
/// hall-login reply, so sealing a bet before that reply has been processed
/// is a caller error, not a crypto failure.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// The cipher rejected the derived key.
    ///
    /// Key derivation always yields a full-length key, so this is
    /// unreachable in practice but still propagated rather than asserted.
    #[error("triple-des key rejected: {0}")]
    Cipher(#[from] des::cipher::InvalidLength),

    /// No account name has been learned from the hall login yet.
    #[error("user name not yet received from hall login")]
    MissingUserName,

    /// No bet encryption key has been learned from the hall login yet.
    #[error("bet encrypt key not yet received from hall login")]
    MissingBetKey,

    /// The bet selection key was empty after trimming.
    #[error("bet selection key is empty")]
    EmptySelection,

    /// Stakes must be strictly positive.
    #[error("bet amount must be positive, got {0}")]
    InvalidAmount(f64),

    /// A payload could not be serialized to JSON.
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
