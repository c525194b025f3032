//! Snapshot shapes pushed to the sink.
//!
//! Field names and the envelope layout are a wire contract with the
//! consumer on the other side of the sink; the serde renames below are
//! deliberate and must not be "cleaned up" (`tableID` really is cased that
//! way).

use serde::Serialize;
use tokio::time::Instant;

use crate::table::TableEntry;

/// Phase labels derived from the round state.
const PHASE_BETTING: &str = "GP_BETTING";
const PHASE_DEALING: &str = "GP_DEALING";
const PHASE_SETTLEMENT: &str = "GP_SETTLEMENT";
const PHASE_NEW_GAME: &str = "GP_NEW_GAME_START";

/// Static table facts plus the latest roads.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableInfo {
    #[serde(rename = "stampTime")]
    pub stamp_time: u64,
    #[serde(rename = "dealerDomain")]
    pub dealer_domain: i64,
    #[serde(rename = "gameHall")]
    pub game_hall: i64,
    #[serde(rename = "gameCode")]
    pub game_code: i64,
    #[serde(rename = "tableID")]
    pub table_id: i64,
    #[serde(rename = "tableName")]
    pub table_name: String,
    #[serde(rename = "gameNo")]
    pub game_no: String,
    #[serde(rename = "gameShoe")]
    pub game_shoe: i64,
    #[serde(rename = "gameRound")]
    pub game_round: i64,
    pub shuffle: i64,
    pub maintenance: i64,
    #[serde(rename = "dealerID")]
    pub dealer_id: String,
    #[serde(rename = "dealerImage")]
    pub dealer_image: String,
    #[serde(rename = "supportWeb")]
    pub support_web: i64,
    #[serde(rename = "newGame")]
    pub new_game: i64,
    pub roads: Vec<String>,
}

/// The phase event, including raw countdown parameters so the consumer can
/// rebase the timer on its own clock.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DealerEvent {
    #[serde(rename = "dealerId")]
    pub dealer_id: String,
    #[serde(rename = "deliverTime")]
    pub deliver_time: u64,
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(rename = "tableID")]
    pub table_id: i64,
    #[serde(rename = "gameRound")]
    pub game_round: i64,
    #[serde(rename = "gameShoe")]
    pub game_shoe: i64,
    #[serde(rename = "iTime")]
    pub i_time: i64,
    #[serde(rename = "roundStartTime")]
    pub round_start_time: u64,
    pub shuffle: i64,
    pub timestamp: u64,
    #[serde(rename = "countdownBase")]
    pub countdown_base: i64,
    #[serde(rename = "countdownLastUpdate")]
    pub countdown_last_update: u64,
}

/// Road context. The structured members are carried for shape
/// compatibility; this feed only delivers road strings.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RoadInfo {
    #[serde(rename = "repaintTime")]
    pub repaint_time: u64,
    #[serde(rename = "tableID")]
    pub table_id: i64,
    #[serde(rename = "gameShoe")]
    pub game_shoe: i64,
    #[serde(rename = "gameRound")]
    pub game_round: i64,
    #[serde(rename = "winCounts")]
    pub win_counts: [i64; 3],
    #[serde(rename = "goodRoadType")]
    pub good_road_type: i64,
    #[serde(rename = "goodRoadCount")]
    pub good_road_count: i64,
    #[serde(rename = "prevGoodRoadJson")]
    pub prev_good_road_json: Vec<serde_json::Value>,
    #[serde(rename = "currGoodRoadJson")]
    pub curr_good_road_json: Vec<serde_json::Value>,
    #[serde(rename = "bigRoads")]
    pub big_roads: Vec<serde_json::Value>,
}

/// Live betting totals.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BetInfo {
    #[serde(rename = "betCount")]
    pub bet_count: i64,
    #[serde(rename = "currentBet")]
    pub current_bet: f64,
}

/// One table's complete pushed snapshot.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableSnapshot {
    #[serde(rename = "tableInfo")]
    pub table_info: TableInfo,
    #[serde(rename = "dealerEvent")]
    pub dealer_event: DealerEvent,
    #[serde(rename = "roadInfo")]
    pub road_info: RoadInfo,
    #[serde(rename = "betInfo")]
    pub bet_info: BetInfo,
}

/// The push envelope: a kind discriminator plus all current snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct PushEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Vec<TableSnapshot>,
}

fn parse_num(s: &str) -> i64 {
    s.trim().parse().unwrap_or(0)
}

/// Builds one table's snapshot from its book entry.
///
/// `now` drives the countdown math, `now_ms` stamps the wall-clock fields.
pub fn build_snapshot(
    table_id: i64,
    entry: &TableEntry,
    now: Instant,
    now_ms: u64,
) -> TableSnapshot {
    let summary = &entry.summary;
    let round = entry.round.as_ref();

    let game_shoe = round
        .map(|r| parse_num(&r.shoe_id))
        .filter(|&v| v != 0)
        .unwrap_or_else(|| parse_num(&summary.shoe_id));
    let game_round = round
        .map(|r| parse_num(&r.play_id))
        .filter(|&v| v != 0)
        .unwrap_or_else(|| parse_num(&summary.play_id));

    let remaining = entry.countdown.remaining(now);
    let armed_wall_ms = if entry.countdown.is_active() {
        let elapsed_ms = entry
            .countdown
            .armed_at
            .map(|armed| now.saturating_duration_since(armed).as_millis() as u64)
            .unwrap_or(0);
        now_ms.saturating_sub(elapsed_ms)
    } else {
        0
    };

    let event_type = match round.map(|r| r.state) {
        Some(1) => PHASE_BETTING,
        Some(2) => PHASE_DEALING,
        Some(5) => PHASE_SETTLEMENT,
        _ => PHASE_NEW_GAME,
    };

    let dealer_id = summary
        .dealer
        .as_ref()
        .map(|d| format!("{}/-/{}", d.name, d.id))
        .unwrap_or_default();
    let dealer_image = summary
        .dealer
        .as_ref()
        .map(|d| d.photo.clone())
        .unwrap_or_default();

    let roads = if entry.roads.is_empty() {
        summary.roads.clone()
    } else {
        entry.roads.clone()
    };

    let current_bet = entry
        .bet_totals
        .as_ref()
        .map(|b| b.total_amount)
        .filter(|&v| v != 0.0)
        .unwrap_or(summary.total_amount);

    TableSnapshot {
        table_info: TableInfo {
            stamp_time: now_ms,
            dealer_domain: 1,
            game_hall: 0,
            game_code: summary.game_id,
            table_id,
            table_name: summary.table_name.clone(),
            game_no: summary.game_no.clone(),
            game_shoe,
            game_round,
            shuffle: 0,
            maintenance: 0,
            dealer_id: dealer_id.clone(),
            dealer_image,
            support_web: 1,
            new_game: 0,
            roads,
        },
        dealer_event: DealerEvent {
            dealer_id,
            deliver_time: if armed_wall_ms != 0 { armed_wall_ms } else { now_ms },
            event_type: event_type.to_owned(),
            table_id,
            game_round,
            game_shoe,
            i_time: remaining,
            round_start_time: if armed_wall_ms != 0 { armed_wall_ms } else { now_ms },
            shuffle: 0,
            timestamp: now_ms,
            countdown_base: entry.countdown.base,
            countdown_last_update: armed_wall_ms,
        },
        road_info: RoadInfo {
            repaint_time: now_ms,
            table_id,
            game_shoe,
            game_round,
            win_counts: [0, 0, 0],
            good_road_type: 0,
            good_road_count: 0,
            prev_good_road_json: Vec::new(),
            curr_good_road_json: Vec::new(),
            big_roads: Vec::new(),
        },
        bet_info: BetInfo {
            bet_count: summary.online_count,
            current_bet,
        },
    }
}
