//! 3DES-ECB sealing of tokens and payloads.
//!
//! The vendor gateway expects every sensitive string — the connect
//! signature, the per-request token envelope, the bet payload — encrypted
//! with 3DES in ECB mode, PKCS7-padded, then base64-encoded. ECB is a
//! vendor constraint; nothing here gets to choose a better mode.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use des::TdesEde3;
use des::cipher::block_padding::Pkcs7;
use des::cipher::{BlockEncryptMut, KeyInit};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::SigningError;
use crate::key::derive_key;

type TdesEcb = ecb::Encryptor<TdesEde3>;

/// Encrypts `plain` with the derived key and returns standard base64 with
/// padding, matching the reference clients' output byte for byte.
pub fn encrypt(plain: &str, key: &str) -> Result<String, SigningError> {
    let key = derive_key(key);
    let cipher = TdesEcb::new_from_slice(&key)?;
    let sealed = cipher.encrypt_padded_vec_mut::<Pkcs7>(plain.as_bytes());
    Ok(STANDARD.encode(sealed))
}

/// The per-request token envelope. Field order is part of the contract:
/// the gateway decrypts and compares against `{"cmd":…,"token":…,"time":…}`.
#[derive(Serialize)]
struct TokenEnvelope<'a> {
    cmd: i32,
    token: &'a str,
    time: u64,
}

/// Seals the token envelope for one outbound command at an explicit
/// timestamp (unix milliseconds). Deterministic, so tests use this
/// directly.
pub fn seal_token_at(
    cmd: i32,
    token: &str,
    time_ms: u64,
    key: &str,
) -> Result<String, SigningError> {
    let body = serde_json::to_string(&TokenEnvelope {
        cmd,
        token,
        time: time_ms,
    })?;
    encrypt(&body, key)
}

/// Seals the token envelope stamped with the current wall clock.
pub fn seal_token(cmd: i32, token: &str, key: &str) -> Result<String, SigningError> {
    let time_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    seal_token_at(cmd, token, time_ms, key)
}

/// Builds the signed connect URL: the raw session token, trimmed, sealed,
/// and appended as the `sign` query parameter.
pub fn signed_url(endpoint: &str, token: &str, key: &str) -> Result<String, SigningError> {
    let sign = encrypt(token.trim(), key)?;
    Ok(format!("{endpoint}?sign={sign}"))
}
