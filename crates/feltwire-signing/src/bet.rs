//! Bet payload construction and signing.
//!
//! A bet travels as a three-element string list on the bet command:
//! a literal `"1"`, an MD5 integrity digest, and the encrypted bet
//! payload. The digest input and the payload shape mirror the vendor's
//! reference clients exactly — the gateway recomputes the digest on its
//! side and rejects mismatches silently.

use md5::{Digest, Md5};
use serde::Serialize;
use std::fmt::Write as _;

use crate::SigningError;
use crate::key::normalize_bet_key;
use crate::seal::encrypt;

/// Digest inputs use at most this many key bytes.
const SUFFIX_END: usize = 16;
/// Offset where the digest suffix starts within the bet key.
const SUFFIX_START: usize = 8;

/// One single-area bet as the caller describes it.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleBet {
    /// Selection key as the table defines it, e.g. `"Banker"` or `"P"`.
    pub selection: String,
    /// Stake amount. Must be strictly positive.
    pub amount: f64,
    /// Table index carried inside the payload's `info` blob.
    pub table_index: String,
    /// Road type carried inside the payload's `info` blob.
    pub road_type: String,
}

#[derive(Serialize)]
struct BetInfo<'a> {
    table: &'a str,
    #[serde(rename = "roadType")]
    road_type: &'a str,
}

impl SingleBet {
    /// Serializes the bet to the gateway's payload shape: an object keyed
    /// by the normalized selection, plus an `info` member that is itself a
    /// JSON *string*, not a nested object.
    pub fn payload(&self) -> Result<String, SigningError> {
        let key = normalize_bet_key(self.selection.trim());
        if key.is_empty() {
            return Err(SigningError::EmptySelection);
        }
        if !(self.amount > 0.0) {
            return Err(SigningError::InvalidAmount(self.amount));
        }
        let info = serde_json::to_string(&BetInfo {
            table: &self.table_index,
            road_type: &self.road_type,
        })?;
        let mut obj = serde_json::Map::new();
        obj.insert(key, serde_json::json!(self.amount));
        obj.insert("info".to_owned(), serde_json::Value::String(info));
        Ok(serde_json::Value::Object(obj).to_string())
    }
}

fn md5_hex(input: &str) -> String {
    let digest = Md5::digest(input.as_bytes());
    let mut out = String::with_capacity(32);
    for b in digest {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Computes the bet integrity digest.
///
/// The digest input is `tableId + gameNo + userName + suffix`, where the
/// suffix is bytes 8..16 of the bet key when the key is longer than 8
/// bytes and the whole key otherwise.
pub fn bet_digest(table_id: i64, game_no: &str, user_name: &str, bet_key: &str) -> String {
    let suffix = if bet_key.len() > SUFFIX_START {
        bet_key
            .get(SUFFIX_START..bet_key.len().min(SUFFIX_END))
            .unwrap_or(bet_key)
    } else {
        bet_key
    };
    md5_hex(&format!("{table_id}{game_no}{user_name}{suffix}"))
}

/// Produces the three-element signed bet list for the bet command.
///
/// `user_name` and `bet_key` both arrive on the hall-login reply; calling
/// this before that reply has been seen is an error.
pub fn seal_bet(
    table_id: i64,
    game_no: &str,
    user_name: &str,
    bet_key: &str,
    bet: &SingleBet,
) -> Result<Vec<String>, SigningError> {
    if user_name.is_empty() {
        return Err(SigningError::MissingUserName);
    }
    if bet_key.is_empty() {
        return Err(SigningError::MissingBetKey);
    }
    let digest = bet_digest(table_id, game_no, user_name, bet_key);
    let sealed = encrypt(&bet.payload()?, bet_key)?;
    Ok(vec!["1".to_owned(), digest, sealed])
}
