//! The session manager: command dispatch and per-table runtime state.
//!
//! This is the pure half of the session layer. It owns everything learned
//! from the feed that later requests depend on — the account name and bet
//! key from the hall login, the latest round number and seat per table —
//! and it builds every outbound frame. It never touches a socket or a
//! timer; the session actor behind [`SessionHandle`](crate::SessionHandle)
//! drives it.

use std::collections::{BTreeSet, HashMap};

use feltwire_protocol::{Envelope, PublicRecord, command_of, decode_message, project_public};
use feltwire_signing::{SingleBet, seal_bet, seal_token};

use crate::profile::{VendorProfile, cmd};
use crate::SessionError;

/// Live round context for one table, learned from the feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRuntime {
    /// Latest round identifier seen for this table.
    pub game_no: String,
    /// Seat assigned by the gateway, or 0.
    pub seat: i64,
}

/// One dispatched inbound message: the command code plus its projection.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub cmd: i32,
    pub record: PublicRecord,
}

/// Tracks session-scoped state and builds outbound frames.
pub struct SessionManager {
    profile: VendorProfile,
    user_name: String,
    bet_encrypt_key: String,
    runtime: HashMap<i64, TableRuntime>,
    entered: BTreeSet<i64>,
}

impl SessionManager {
    /// Creates a manager for one vendor profile. The profile is validated
    /// here so every consumer sees clamped values.
    pub fn new(profile: VendorProfile) -> Self {
        Self {
            profile: profile.validated(),
            user_name: String::new(),
            bet_encrypt_key: String::new(),
            runtime: HashMap::new(),
            entered: BTreeSet::new(),
        }
    }

    /// The profile this session runs under, post-validation.
    pub fn profile(&self) -> &VendorProfile {
        &self.profile
    }

    /// Account name learned from the hall login, empty until then.
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Bet encryption key learned from the hall login, empty until then.
    pub fn bet_encrypt_key(&self) -> &str {
        &self.bet_encrypt_key
    }

    /// Runtime context for a table, if any feed message mentioned it.
    pub fn runtime(&self, table_id: i64) -> Option<&TableRuntime> {
        self.runtime.get(&table_id)
    }

    /// Tables the session has entered; re-entered after every reconnect.
    pub fn entered_tables(&self) -> impl Iterator<Item = i64> + '_ {
        self.entered.iter().copied()
    }

    // -----------------------------------------------------------------------
    // Outbound frames
    // -----------------------------------------------------------------------

    /// Builds a bare command frame carrying a freshly sealed token.
    pub fn build_packet(&self, command: i32) -> Result<Envelope, SessionError> {
        let token = seal_token(
            command,
            self.profile.token.trim(),
            &self.profile.session_key,
        )?;
        Ok(Envelope {
            cmd: command,
            token,
            ..Envelope::default()
        })
    }

    /// The init sequence for one fresh connection, in send order. Each
    /// command carries its fixed extras; the hall login announces the
    /// client kind.
    pub fn init_frames(&self) -> Result<Vec<Envelope>, SessionError> {
        let table_id = self.profile.table_id as i32;
        self.profile
            .init_sequence()
            .into_iter()
            .map(|command| {
                let mut env = self.build_packet(command)?;
                match command {
                    cmd::HALL_LOGIN => {
                        env.table_id = table_id;
                        env.object = "PC".to_owned();
                    }
                    cmd::LOBBY_SNAPSHOT => {
                        env.table_id = table_id;
                    }
                    cmd::INIT_AUX_A | cmd::INIT_AUX_B => {
                        env.kind = 1;
                    }
                    cmd::RICH_LIST => {
                        env.kind = 2;
                    }
                    _ => {}
                }
                Ok(env)
            })
            .collect()
    }

    /// The heartbeat frame.
    pub fn heartbeat_frame(&self) -> Result<Envelope, SessionError> {
        self.build_packet(self.profile.heartbeat_cmd)
    }

    /// The enter-room burst for one table, in the order the gateway
    /// expects: presence, rounds, roster, subscribe, seat claim with seat
    /// -1. The table is remembered and re-entered after reconnects.
    pub fn enter_room(
        &mut self,
        table_id: i64,
        game_no: &str,
    ) -> Result<Vec<Envelope>, SessionError> {
        self.entered.insert(table_id);
        let tid = table_id as i32;
        let mut burst = Vec::with_capacity(5);

        let mut presence = self.build_packet(cmd::PRESENCE)?;
        presence.table_id = tid;
        presence.kind = 1;
        burst.push(presence);

        let mut rounds = self.build_packet(cmd::ROUNDS)?;
        rounds.table_id = tid;
        rounds.game_no = game_no.to_owned();
        burst.push(rounds);

        let mut roster = self.build_packet(cmd::ROSTER)?;
        roster.table_id = tid;
        burst.push(roster);

        let mut subscribe = self.build_packet(cmd::SUBSCRIBE)?;
        subscribe.table_id = tid;
        subscribe.kind = 1;
        burst.push(subscribe);

        let mut seat = self.build_packet(cmd::SEAT)?;
        seat.table_id = tid;
        seat.kind = 1;
        seat.seat = -1;
        burst.push(seat);

        Ok(burst)
    }

    /// Builds the signed bet frame for one table.
    ///
    /// The round is taken from `game_no` when given, otherwise from the
    /// runtime context fed by the round-state and game-event messages.
    pub fn place_bet(
        &self,
        table_id: i64,
        bet: &SingleBet,
        game_no: Option<&str>,
    ) -> Result<Envelope, SessionError> {
        let game_no = match game_no {
            Some(g) if !g.is_empty() => g.to_owned(),
            _ => self
                .runtime
                .get(&table_id)
                .filter(|rt| !rt.game_no.is_empty())
                .map(|rt| rt.game_no.clone())
                .ok_or(SessionError::UnknownRound(table_id))?,
        };

        let list = seal_bet(
            table_id,
            &game_no,
            &self.user_name,
            &self.bet_encrypt_key,
            bet,
        )?;

        let mut env = self.build_packet(cmd::BET)?;
        env.table_id = table_id as i32;
        env.game_no = game_no;
        env.kind = 1;
        env.list = list;
        Ok(env)
    }

    // -----------------------------------------------------------------------
    // Inbound dispatch
    // -----------------------------------------------------------------------

    /// Decodes one inbound frame, folds what the session itself needs into
    /// its state, and hands the projection back for aggregation.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Result<FeedItem, SessionError> {
        let map = decode_message(frame)?;
        let command = command_of(&map)?;
        let record = project_public(&map);
        self.absorb(command, &record);
        Ok(FeedItem {
            cmd: command,
            record,
        })
    }

    /// State updates the session extracts from the feed.
    fn absorb(&mut self, command: i32, record: &PublicRecord) {
        match command {
            cmd::HALL_LOGIN => {
                if let Some(name) = extract_user_name(record) {
                    self.user_name = name;
                }
                let mut entries = record.list.iter().filter(|s| !s.is_empty());
                let first = entries.next();
                // The second non-empty entry is the bet key; a lone entry
                // doubles as one.
                match (entries.next(), first) {
                    (Some(second), _) => self.bet_encrypt_key = second.clone(),
                    (None, Some(only)) => self.bet_encrypt_key = only.clone(),
                    _ => {}
                }
                tracing::info!(
                    user = %self.user_name,
                    has_bet_key = !self.bet_encrypt_key.is_empty(),
                    "hall login processed"
                );
            }
            cmd::ROUND_STATE => {
                for table in &record.tables {
                    if table.table_id == 0 || table.game_no.is_empty() {
                        continue;
                    }
                    let rt = self.runtime.entry(table.table_id).or_default();
                    rt.game_no = table.game_no.clone();
                }
            }
            cmd::GAME_EVENT | cmd::RUNTIME_EVENT => {
                if record.table_id != 0 {
                    let rt = self.runtime.entry(record.table_id).or_default();
                    rt.seat = record.seat;
                    if !record.game_no.is_empty() {
                        rt.game_no = record.game_no.clone();
                    }
                }
            }
            _ => {}
        }
    }
}

/// Digs the account name out of a hall-login record: the direct field
/// first, then the `object` blob, which some gateways fill with JSON
/// carrying `username` at the top level or under `member`.
fn extract_user_name(record: &PublicRecord) -> Option<String> {
    if !record.user_name.is_empty() {
        return Some(record.user_name.clone());
    }
    let obj: serde_json::Value = serde_json::from_str(&record.object).ok()?;
    for key in ["username", "userName"] {
        if let Some(name) = obj.get(key).and_then(|v| v.as_str()) {
            if !name.is_empty() {
                return Some(name.to_owned());
            }
        }
    }
    let member = obj.get("member")?;
    for key in ["username", "userName", "nickname"] {
        if let Some(name) = member.get(key).and_then(|v| v.as_str()) {
            if !name.is_empty() {
                return Some(name.to_owned());
            }
        }
    }
    None
}
