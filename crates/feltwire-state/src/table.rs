//! The table book: everything the feed has said about each table.
//!
//! Tables are born from the lobby snapshot and never die — a table that
//! leaves the lobby just stops updating. Per-table messages for tables the
//! snapshot has not introduced are dropped; the vendor occasionally pushes
//! state for tables outside the subscribed lobby and those rows would
//! otherwise accumulate as husks with no name or dealer.

use std::collections::BTreeMap;

use feltwire_protocol::{PublicRecord, SeatedPlayer, TableSummary};
use feltwire_session::{FeedItem, cmd};
use tokio::time::Instant;

/// Countdown context for one table's betting phase.
///
/// Only the base seconds and the arming instant are stored; the remaining
/// time is computed at snapshot time so coalesced pushes stay accurate.
#[derive(Debug, Clone, Default)]
pub struct Countdown {
    /// Total betting seconds announced by the round state.
    pub base: i64,
    /// When the countdown was (re)armed. `None` once disarmed.
    pub armed_at: Option<Instant>,
}

impl Countdown {
    fn arm(&mut self, base: i64, now: Instant) {
        self.base = base;
        self.armed_at = Some(now);
    }

    fn disarm(&mut self) {
        self.base = 0;
        self.armed_at = None;
    }

    /// Seconds left, clamped at zero. Zero when disarmed.
    pub fn remaining(&self, now: Instant) -> i64 {
        match self.armed_at {
            Some(armed) => {
                let elapsed = now.saturating_duration_since(armed).as_secs() as i64;
                (self.base - elapsed).max(0)
            }
            None => 0,
        }
    }

    /// `true` while a betting countdown is running.
    pub fn is_active(&self) -> bool {
        self.armed_at.is_some()
    }
}

/// Everything known about one table.
#[derive(Debug, Clone, Default)]
pub struct TableEntry {
    /// The lobby snapshot row; refreshed on every snapshot.
    pub summary: TableSummary,
    /// Latest round-state row, if any.
    pub round: Option<TableSummary>,
    /// Road strings from the dedicated roads push.
    pub roads: Vec<String>,
    /// Seated players.
    pub players: Vec<SeatedPlayer>,
    /// Latest bet-area totals row.
    pub bet_totals: Option<TableSummary>,
    /// Latest statistics row.
    pub stats: Option<TableSummary>,
    /// Betting countdown.
    pub countdown: Countdown,
    /// Open-card reveals keyed by round identifier.
    pub open_cards: BTreeMap<String, PublicRecord>,
    /// Most recent chat message.
    pub last_chat: Option<PublicRecord>,
    /// Most recent game event.
    pub last_event: Option<PublicRecord>,
    /// Most recent bet result.
    pub last_bet_result: Option<PublicRecord>,
}

/// All tables, keyed by table id, plus lobby-wide extras.
#[derive(Debug, Default)]
pub struct TableBook {
    tables: BTreeMap<i64, TableEntry>,
    rich_list: Vec<String>,
}

impl TableBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Known tables in id order.
    pub fn tables(&self) -> impl Iterator<Item = (i64, &TableEntry)> {
        self.tables.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn get(&self, table_id: i64) -> Option<&TableEntry> {
        self.tables.get(&table_id)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// The lobby-wide rich list.
    pub fn rich_list(&self) -> &[String] {
        &self.rich_list
    }

    /// Folds one dispatched message into the book.
    ///
    /// Returns `true` when the change should be pushed downstream. Unknown
    /// tables are dropped silently except for the lobby snapshot, which is
    /// the only message allowed to create entries.
    pub fn apply(&mut self, item: &FeedItem, now: Instant) -> bool {
        match item.cmd {
            cmd::LOBBY_SNAPSHOT => self.apply_snapshot(&item.record),
            cmd::ROUND_STATE => self.apply_round_state(&item.record, now),
            cmd::ROADS => self.apply_roads(&item.record),
            cmd::LOBBY_DELTA => self.apply_lobby_delta(&item.record),
            cmd::PLAYERS => self.for_known(&item.record, |entry, record| {
                entry.players = record.players.clone();
            }),
            cmd::BET_TOTALS => self.apply_table_rows(&item.record, |entry, row| {
                entry.bet_totals = Some(row);
            }),
            cmd::STATS => self.apply_table_rows(&item.record, |entry, row| {
                entry.stats = Some(row);
            }),
            cmd::CHAT => self.for_known(&item.record, |entry, record| {
                entry.last_chat = Some(record.clone());
            }),
            cmd::GAME_EVENT => self.for_known(&item.record, |entry, record| {
                entry.last_event = Some(record.clone());
            }),
            cmd::BET => self.for_known(&item.record, |entry, record| {
                entry.last_bet_result = Some(record.clone());
            }),
            cmd::OPEN_CARD => self.apply_open_card(&item.record),
            cmd::RICH_LIST => {
                self.rich_list = item.record.list.clone();
                true
            }
            // Hall login refreshes lobby-wide context downstream even
            // though the book itself keeps nothing from it.
            cmd::HALL_LOGIN => true,
            _ => false,
        }
    }

    fn apply_snapshot(&mut self, record: &PublicRecord) -> bool {
        let mut changed = false;
        for table in &record.tables {
            if table.table_id == 0 {
                continue;
            }
            let entry = self.tables.entry(table.table_id).or_default();
            entry.summary = table.clone();
            changed = true;
        }
        changed
    }

    fn apply_round_state(&mut self, record: &PublicRecord, now: Instant) -> bool {
        let mut changed = false;
        for table in &record.tables {
            let Some(entry) = self.tables.get_mut(&table.table_id) else {
                continue;
            };
            // State 1 is the betting phase; its count-down is re-armed on
            // every round-state row, any other phase disarms it.
            if table.state == 1 {
                entry.countdown.arm(table.count_down, now);
            } else {
                entry.countdown.disarm();
            }
            entry.round = Some(table.clone());
            changed = true;
        }
        changed
    }

    fn apply_roads(&mut self, record: &PublicRecord) -> bool {
        let Some(entry) = self.tables.get_mut(&record.table_id) else {
            return false;
        };
        entry.roads = record.list.clone();
        entry.summary.roads = record.list.clone();
        true
    }

    fn apply_lobby_delta(&mut self, record: &PublicRecord) -> bool {
        let mut changed = false;
        for delta in &record.lobby {
            let Some(entry) = self.tables.get_mut(&delta.table_id) else {
                continue;
            };
            entry.summary.online_count = delta.online_count;
            entry.summary.total_amount = delta.total_amount;
            entry.summary.vip_name = delta.vip_name.clone();
            changed = true;
        }
        changed
    }

    fn apply_open_card(&mut self, record: &PublicRecord) -> bool {
        if record.game_no.is_empty() {
            return false;
        }
        let Some(entry) = self.tables.get_mut(&record.table_id) else {
            return false;
        };
        entry
            .open_cards
            .insert(record.game_no.clone(), record.clone());
        true
    }

    /// Applies `f` to the entry named by the record's table id, if known.
    fn for_known(
        &mut self,
        record: &PublicRecord,
        f: impl FnOnce(&mut TableEntry, &PublicRecord),
    ) -> bool {
        match self.tables.get_mut(&record.table_id) {
            Some(entry) => {
                f(entry, record);
                true
            }
            None => false,
        }
    }

    /// Applies `f` per known table row carried in the record's table list.
    fn apply_table_rows(
        &mut self,
        record: &PublicRecord,
        mut f: impl FnMut(&mut TableEntry, TableSummary),
    ) -> bool {
        let mut changed = false;
        for table in &record.tables {
            let Some(entry) = self.tables.get_mut(&table.table_id) else {
                continue;
            };
            f(entry, table.clone());
            changed = true;
        }
        changed
    }
}
