//! Per-vendor connection profile.
//!
//! One profile describes everything a session needs to speak to one vendor
//! gateway: where to dial, how to pace the heartbeat, how long to wait for
//! the gateway's first word, and which command sequence brings a fresh
//! connection up to a usable feed.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Command codes the client sends or dispatches on. Numeric values are the
/// vendor's wire contract.
pub mod cmd {
    /// Bet placement; the reply carries the bet result.
    pub const BET: i32 = 6;
    /// Per-table recent rounds, part of the enter-room burst.
    pub const ROUNDS: i32 = 9;
    /// Table subscription, part of the enter-room burst.
    pub const SUBSCRIBE: i32 = 19;
    /// Rich list.
    pub const RICH_LIST: i32 = 24;
    /// Room presence, first packet of the enter-room burst.
    pub const PRESENCE: i32 = 29;
    /// Lobby snapshot: the full table list.
    pub const LOBBY_SNAPSHOT: i32 = 43;
    /// Player roster, part of the enter-room burst.
    pub const ROSTER: i32 = 44;
    /// Seat claim, last packet of the enter-room burst (seat -1).
    pub const SEAT: i32 = 4;
    /// Init auxiliary data.
    pub const INIT_AUX_A: i32 = 45;
    /// Init auxiliary data.
    pub const INIT_AUX_B: i32 = 87;
    /// Init auxiliary data.
    pub const INIT_AUX_C: i32 = 5011;
    /// Table chat.
    pub const CHAT: i32 = 85;
    /// Heartbeat.
    pub const HEARTBEAT: i32 = 99;
    /// Seated players for a table.
    pub const PLAYERS: i32 = 201;
    /// Lobby occupancy/turnover delta.
    pub const LOBBY_DELTA: i32 = 207;
    /// Bet-area totals for a table.
    pub const BET_TOTALS: i32 = 208;
    /// Round state, including the betting countdown.
    pub const ROUND_STATE: i32 = 1002;
    /// Open-card reveal for a round.
    pub const OPEN_CARD: i32 = 1003;
    /// Road maps for a table.
    pub const ROADS: i32 = 1004;
    /// Runtime event carrying seat and game number.
    pub const RUNTIME_EVENT: i32 = 1015;
    /// Per-table statistics.
    pub const STATS: i32 = 5014;
    /// Game event carrying seat and game number.
    pub const GAME_EVENT: i32 = 5015;
    /// Hall login; the reply carries the account name and bet key.
    pub const HALL_LOGIN: i32 = 10086;
}

/// Configuration for one vendor session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorProfile {
    /// Gateway WebSocket endpoint, without the `sign` query parameter.
    pub endpoint: String,

    /// The raw session token issued by the platform.
    pub token: String,

    /// The vendor key used to seal tokens and the connect signature.
    pub session_key: String,

    /// Default table the init sequence targets (0 for none).
    pub table_id: i64,

    /// Heartbeat command code.
    pub heartbeat_cmd: i32,

    /// Heartbeat pacing.
    pub heartbeat_interval: Duration,

    /// How long to wait for the gateway's first frame before the link
    /// counts as acknowledged anyway.
    pub ack_grace: Duration,

    /// Delay between link loss and the single redial.
    pub reconnect_backoff: Duration,

    /// Pause between socket-up and the first init command.
    pub init_delay: Duration,

    /// Pause between consecutive init commands.
    pub init_spacing: Duration,
}

impl Default for VendorProfile {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            token: String::new(),
            session_key: String::new(),
            table_id: 0,
            heartbeat_cmd: cmd::HEARTBEAT,
            heartbeat_interval: Duration::from_secs(2),
            ack_grace: Duration::from_secs(10),
            reconnect_backoff: Duration::from_secs(5),
            init_delay: Duration::from_secs(1),
            init_spacing: Duration::from_millis(300),
        }
    }
}

impl VendorProfile {
    /// Slowest heartbeat the gateway tolerates before it drops the client.
    pub const MAX_HEARTBEAT: Duration = Duration::from_secs(15);
    /// Fastest heartbeat worth sending.
    pub const MIN_HEARTBEAT: Duration = Duration::from_secs(1);
    /// Redial backoff bounds.
    pub const MIN_BACKOFF: Duration = Duration::from_secs(1);
    pub const MAX_BACKOFF: Duration = Duration::from_secs(60);
    /// Init spacing bounds.
    pub const MIN_INIT_SPACING: Duration = Duration::from_millis(50);
    pub const MAX_INIT_SPACING: Duration = Duration::from_secs(2);

    /// Clamp out-of-range values so the profile is safe to run.
    ///
    /// Called automatically when a session is started. Rules:
    /// - heartbeat clamped to `MIN_HEARTBEAT..=MAX_HEARTBEAT`,
    /// - backoff clamped to `MIN_BACKOFF..=MAX_BACKOFF`,
    /// - init spacing clamped to `MIN_INIT_SPACING..=MAX_INIT_SPACING`,
    /// - ack grace forced to at least one heartbeat interval.
    pub fn validated(mut self) -> Self {
        if self.heartbeat_interval > Self::MAX_HEARTBEAT {
            warn!(
                interval = ?self.heartbeat_interval,
                max = ?Self::MAX_HEARTBEAT,
                "heartbeat interval exceeds maximum — clamping"
            );
            self.heartbeat_interval = Self::MAX_HEARTBEAT;
        }
        self.heartbeat_interval = self
            .heartbeat_interval
            .clamp(Self::MIN_HEARTBEAT, Self::MAX_HEARTBEAT);
        self.reconnect_backoff = self
            .reconnect_backoff
            .clamp(Self::MIN_BACKOFF, Self::MAX_BACKOFF);
        self.init_spacing = self
            .init_spacing
            .clamp(Self::MIN_INIT_SPACING, Self::MAX_INIT_SPACING);
        if self.ack_grace < self.heartbeat_interval {
            self.ack_grace = self.heartbeat_interval;
        }
        self
    }

    /// The init command sequence sent after every successful connect, in
    /// order: hall login first (it unlocks signing state), then the lobby
    /// snapshot and auxiliary data.
    pub fn init_sequence(&self) -> Vec<i32> {
        vec![
            cmd::HALL_LOGIN,
            cmd::INIT_AUX_A,
            cmd::LOBBY_SNAPSHOT,
            cmd::INIT_AUX_C,
            cmd::INIT_AUX_B,
            cmd::RICH_LIST,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_is_already_valid() {
        let p = VendorProfile::default();
        let v = p.clone().validated();
        assert_eq!(v.heartbeat_interval, p.heartbeat_interval);
        assert_eq!(v.reconnect_backoff, p.reconnect_backoff);
        assert_eq!(v.init_spacing, p.init_spacing);
    }

    #[test]
    fn test_validated_clamps_heartbeat() {
        let p = VendorProfile {
            heartbeat_interval: Duration::from_secs(120),
            ..VendorProfile::default()
        }
        .validated();
        assert_eq!(p.heartbeat_interval, VendorProfile::MAX_HEARTBEAT);

        let p = VendorProfile {
            heartbeat_interval: Duration::from_millis(10),
            ..VendorProfile::default()
        }
        .validated();
        assert_eq!(p.heartbeat_interval, VendorProfile::MIN_HEARTBEAT);
    }

    #[test]
    fn test_validated_keeps_ack_grace_above_heartbeat() {
        let p = VendorProfile {
            heartbeat_interval: Duration::from_secs(4),
            ack_grace: Duration::from_secs(1),
            ..VendorProfile::default()
        }
        .validated();
        assert_eq!(p.ack_grace, Duration::from_secs(4));
    }

    #[test]
    fn test_init_sequence_starts_with_hall_login() {
        let seq = VendorProfile::default().init_sequence();
        assert_eq!(seq.first(), Some(&cmd::HALL_LOGIN));
        assert_eq!(
            seq,
            vec![10086, 45, 43, 5011, 87, 24],
            "init order is part of the vendor contract"
        );
    }
}
