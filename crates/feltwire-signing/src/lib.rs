//! Request sealing for the feltwire table feed.
//!
//! Everything the gateway wants encrypted or digested lives here:
//!
//! - **Keys** ([`derive_key`], [`normalize_bet_key`]) — the vendor's
//!   24-byte key derivation and selection-key normalization rules.
//! - **Sealing** ([`encrypt`], [`seal_token`], [`signed_url`]) —
//!   3DES-ECB-PKCS7 + base64 for tokens, payloads, and the connect
//!   signature.
//! - **Bets** ([`SingleBet`], [`bet_digest`], [`seal_bet`]) — the signed
//!   three-element bet list.
//!
//! The crate is pure computation: no sockets, no clocks except the
//! convenience wrapper [`seal_token`], no session state. The session layer
//! owns *when* to sign; this crate owns *how*.

mod bet;
mod error;
mod key;
mod seal;

pub use bet::{SingleBet, bet_digest, seal_bet};
pub use error::SigningError;
pub use key::{KEY_LEN, derive_key, normalize_bet_key};
pub use seal::{encrypt, seal_token, seal_token_at, signed_url};
