//! Pure projections from generic tag maps into named, typed records.
//!
//! Projection never fails: absent fields default to their documented zero
//! value (0, empty string, empty list, `None`) and numeric-as-string
//! artifacts of the schema-free decode are normalized through
//! [`canonical_string`]. Field numbers follow the vendor's public-bean
//! layout.

use serde::{Deserialize, Serialize};

use crate::tagmap::{TagMap, Value};

// ---------------------------------------------------------------------------
// Canonicalization helpers
// ---------------------------------------------------------------------------

/// Stringifies a scalar value; nested and repeated values become the empty
/// string.
///
/// Identifier fields may arrive as integers, floats, strings, or — when
/// the nested-vs-string heuristic misfires — as sub-messages. Projection
/// funnels them all through this one routine so the result is
/// deterministic.
pub fn canonical_string(v: &Value) -> String {
    match v {
        Value::Str(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Nested(_) | Value::Repeated(_) => String::new(),
    }
}

fn text(map: &TagMap, field: u32) -> String {
    map.get(&field).map(canonical_string).unwrap_or_default()
}

fn int(map: &TagMap, field: u32) -> i64 {
    map.get(&field).and_then(Value::as_int).unwrap_or(0)
}

/// Numeric coercion that also parses digit strings, mirroring the loose
/// typing of the upstream feed.
fn num(map: &TagMap, field: u32) -> f64 {
    match map.get(&field) {
        Some(Value::Int(i)) => *i as f64,
        Some(Value::Float(f)) => *f,
        Some(Value::Str(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn flag(map: &TagMap, field: u32) -> bool {
    int(map, field) != 0
}

/// Projects a repeated string field. A slot holding a single scalar is
/// treated as empty, not as a one-element list — counterpart systems rely
/// on this distinction to tell "no data yet" from real lists.
fn string_seq(map: &TagMap, field: u32) -> Vec<String> {
    match map.get(&field) {
        Some(Value::Repeated(items)) => items.iter().map(canonical_string).collect(),
        _ => Vec::new(),
    }
}

fn int_seq(map: &TagMap, field: u32) -> Vec<i64> {
    match map.get(&field) {
        Some(Value::Repeated(items)) => items.iter().filter_map(Value::as_int).collect(),
        _ => Vec::new(),
    }
}

fn float_seq(map: &TagMap, field: u32) -> Vec<f64> {
    match map.get(&field) {
        Some(Value::Repeated(items)) => items.iter().filter_map(Value::as_float).collect(),
        _ => Vec::new(),
    }
}

/// Canonical length of a complete round identifier.
const GAME_NO_FULL_LEN: usize = 13;
/// Version marker prefixed to short round identifiers.
const GAME_NO_PREFIX: &str = "25";

/// Normalizes a round/game identifier.
///
/// A value shorter than 13 characters gets the fixed two-character version
/// marker; 13 characters or more passes through unchanged. Sub-message
/// artifacts are flattened by concatenating their field values in field-id
/// order before the rule applies. This is a deliberate legacy
/// compatibility rule and must be reproduced exactly — the counterpart
/// systems that read these identifiers do the same.
pub fn fix_game_no(v: Option<&Value>) -> String {
    let s = match v {
        Some(Value::Nested(m)) => m.values().map(canonical_string).collect::<String>(),
        Some(Value::Repeated(items)) => items.iter().map(canonical_string).collect(),
        Some(other) => canonical_string(other),
        None => String::new(),
    };
    if !s.is_empty() && s.chars().count() < GAME_NO_FULL_LEN {
        format!("{GAME_NO_PREFIX}{s}")
    } else {
        s
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Dealer identity attached to a table summary (nested field 17).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DealerInfo {
    pub id: i64,
    pub name: String,
    pub no: String,
    pub photo: String,
    pub gender: i64,
    pub online: bool,
    pub kind: i64,
}

/// One table's summary row from the lobby snapshot (field 17 entries).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    pub table_id: i64,
    pub shoe_id: String,
    pub play_id: String,
    pub state: i64,
    pub count_down: i64,
    pub result: String,
    pub poker: String,
    pub tel: Vec<String>,
    pub ext: Vec<String>,
    pub roads: Vec<String>,
    pub game_no: String,
    pub fms: String,
    pub table_name: String,
    pub vip_name: String,
    pub total_amount: f64,
    pub online_count: i64,
    pub dealer: Option<DealerInfo>,
    pub game_id: i64,
}

/// A seated player row (field 15 entries).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeatedPlayer {
    pub seat_id: i64,
    pub user_name: String,
    pub currency: String,
    pub bet_info: String,
    pub balance: f64,
    pub kind: i64,
    pub mid: String,
    pub streak: i64,
    pub bet_num: i64,
    pub win_num: i64,
    pub head: String,
    pub device_type: i64,
    pub list: Vec<String>,
}

/// A lobby occupancy/turnover delta (field 16 entries).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LobbyDelta {
    pub table_id: i64,
    pub online_count: i64,
    pub total_amount: f64,
    pub vip_name: String,
    pub seat_full: bool,
}

/// The fully projected inbound record, shared by every message kind.
///
/// Which fields carry meaning depends on the command: the lobby snapshot
/// fills `tables`, the rich list fills `list`, chat uses `object`, and so
/// on. Handlers pick the fields their command defines and ignore the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicRecord {
    pub cmd: i32,
    pub token: String,
    pub code_id: i64,
    pub lobby_id: i64,
    pub game_no: String,
    pub table_id: i64,
    pub seat: i64,
    pub mid: String,
    pub d_list: Vec<f64>,
    pub kind: i64,
    pub user_name: String,
    pub list: Vec<String>,
    pub mids: Vec<i64>,
    pub object: String,
    pub players: Vec<SeatedPlayer>,
    pub lobby: Vec<LobbyDelta>,
    pub tables: Vec<TableSummary>,
}

// ---------------------------------------------------------------------------
// Projectors
// ---------------------------------------------------------------------------

/// Entries of a repeated sub-message field: a single nested value counts
/// as a one-element list; anything else projects from an empty map so the
/// caller sees a row of zero-values rather than an error.
fn nested_entries(map: &TagMap, field: u32) -> Vec<TagMap> {
    let Some(value) = map.get(&field) else {
        return Vec::new();
    };
    value
        .as_list()
        .map(|v| v.as_nested().cloned().unwrap_or_default())
        .collect()
}

fn project_dealer(v: Option<&Value>) -> Option<DealerInfo> {
    let m = v?.as_nested().cloned().unwrap_or_default();
    Some(DealerInfo {
        id: int(&m, 1),
        name: text(&m, 2),
        no: text(&m, 3),
        photo: text(&m, 4),
        gender: int(&m, 5),
        online: flag(&m, 6),
        kind: int(&m, 9),
    })
}

fn project_table(m: &TagMap) -> TableSummary {
    TableSummary {
        table_id: int(m, 1),
        shoe_id: text(m, 2),
        play_id: text(m, 3),
        state: int(m, 4),
        count_down: int(m, 5),
        result: text(m, 6),
        poker: text(m, 7),
        tel: string_seq(m, 8),
        ext: string_seq(m, 9),
        roads: string_seq(m, 10),
        game_no: fix_game_no(m.get(&11)),
        fms: text(m, 12),
        table_name: text(m, 13),
        vip_name: text(m, 14),
        total_amount: num(m, 15),
        online_count: int(m, 16),
        dealer: project_dealer(m.get(&17)),
        game_id: int(m, 18),
    }
}

fn project_player(m: &TagMap) -> SeatedPlayer {
    SeatedPlayer {
        seat_id: int(m, 1),
        user_name: text(m, 2),
        currency: text(m, 3),
        bet_info: text(m, 4),
        balance: num(m, 5),
        kind: int(m, 6),
        mid: text(m, 7),
        streak: int(m, 8),
        bet_num: int(m, 9),
        win_num: int(m, 10),
        head: text(m, 11),
        device_type: int(m, 12),
        list: string_seq(m, 13),
    }
}

fn project_lobby_delta(m: &TagMap) -> LobbyDelta {
    LobbyDelta {
        table_id: int(m, 1),
        online_count: num(m, 2) as i64,
        total_amount: num(m, 3),
        vip_name: text(m, 4),
        seat_full: flag(m, 5),
    }
}

/// Projects a decoded frame into the shared [`PublicRecord`] shape.
pub fn project_public(map: &TagMap) -> PublicRecord {
    PublicRecord {
        cmd: int(map, 1) as i32,
        token: text(map, 2),
        code_id: int(map, 3),
        lobby_id: int(map, 4),
        game_no: text(map, 5),
        table_id: int(map, 6),
        seat: int(map, 7),
        mid: map
            .get(&8)
            .map(canonical_string)
            .unwrap_or_else(|| "0".to_owned()),
        d_list: float_seq(map, 9),
        kind: int(map, 10),
        user_name: text(map, 11),
        list: string_seq(map, 12),
        mids: int_seq(map, 13),
        object: text(map, 14),
        players: nested_entries(map, 15).iter().map(project_player).collect(),
        lobby: nested_entries(map, 16)
            .iter()
            .map(project_lobby_delta)
            .collect(),
        tables: nested_entries(map, 17).iter().map(project_table).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_game_no_short_gets_version_prefix() {
        let v = Value::Str("2501010012".into());
        let fixed = fix_game_no(Some(&v));
        assert_eq!(fixed, "252501010012");
        assert_eq!(fixed.len(), 12);
    }

    #[test]
    fn test_fix_game_no_full_length_passes_through() {
        let v = Value::Str("2501010012345".into());
        assert_eq!(fix_game_no(Some(&v)), "2501010012345");
    }

    #[test]
    fn test_fix_game_no_empty_stays_empty() {
        assert_eq!(fix_game_no(None), "");
        let v = Value::Str(String::new());
        assert_eq!(fix_game_no(Some(&v)), "");
    }

    #[test]
    fn test_fix_game_no_flattens_misclassified_nested() {
        // A digit string that accidentally parsed as a tag stream comes
        // back as a sub-message; its field values are joined in field-id
        // order before the prefix rule.
        let mut m = TagMap::new();
        m.insert(1, Value::Int(50));
        m.insert(2, Value::Int(101));
        let fixed = fix_game_no(Some(&Value::Nested(m)));
        assert_eq!(fixed, "2550101");
    }

    #[test]
    fn test_fix_game_no_integer_is_stringified() {
        let v = Value::Int(1234567890);
        assert_eq!(fix_game_no(Some(&v)), "251234567890");
    }

    #[test]
    fn test_canonical_string_scalars_and_composites() {
        assert_eq!(canonical_string(&Value::Int(5)), "5");
        assert_eq!(canonical_string(&Value::Float(2.0)), "2");
        assert_eq!(canonical_string(&Value::Str("x".into())), "x");
        assert_eq!(canonical_string(&Value::Nested(TagMap::new())), "");
        assert_eq!(canonical_string(&Value::Repeated(vec![])), "");
    }

    #[test]
    fn test_project_public_all_defaults() {
        let mut map = TagMap::new();
        map.insert(1, Value::Int(43));
        let rec = project_public(&map);
        assert_eq!(rec.cmd, 43);
        assert_eq!(rec.token, "");
        assert_eq!(rec.table_id, 0);
        assert_eq!(rec.mid, "0");
        assert!(rec.tables.is_empty());
        assert!(rec.list.is_empty());
    }

    #[test]
    fn test_project_table_summary() {
        let mut dealer = TagMap::new();
        dealer.insert(1, Value::Int(12));
        dealer.insert(2, Value::Str("May".into()));
        dealer.insert(6, Value::Int(1));

        let mut table = TagMap::new();
        table.insert(1, Value::Int(3));
        table.insert(2, Value::Str("88".into()));
        table.insert(4, Value::Int(1));
        table.insert(5, Value::Int(20));
        table.insert(11, Value::Str("2501010012".into()));
        table.insert(15, Value::Float(1500.0));
        table.insert(16, Value::Int(42));
        table.insert(17, Value::Nested(dealer));

        let mut map = TagMap::new();
        map.insert(1, Value::Int(43));
        map.insert(17, Value::Nested(table));

        let rec = project_public(&map);
        assert_eq!(rec.tables.len(), 1);
        let t = &rec.tables[0];
        assert_eq!(t.table_id, 3);
        assert_eq!(t.state, 1);
        assert_eq!(t.count_down, 20);
        assert_eq!(t.game_no, "252501010012");
        assert_eq!(t.total_amount, 1500.0);
        assert_eq!(t.online_count, 42);
        let d = t.dealer.as_ref().expect("dealer");
        assert_eq!(d.id, 12);
        assert_eq!(d.name, "May");
        assert!(d.online);
    }

    #[test]
    fn test_project_repeated_tables() {
        let mut t1 = TagMap::new();
        t1.insert(1, Value::Int(1));
        let mut t2 = TagMap::new();
        t2.insert(1, Value::Int(2));
        let mut map = TagMap::new();
        map.insert(1, Value::Int(43));
        map.insert(
            17,
            Value::Repeated(vec![Value::Nested(t1), Value::Nested(t2)]),
        );
        let rec = project_public(&map);
        let ids: Vec<_> = rec.tables.iter().map(|t| t.table_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_project_lobby_delta_parses_numeric_strings() {
        let mut lp = TagMap::new();
        lp.insert(1, Value::Int(7));
        lp.insert(2, Value::Str("15".into()));
        lp.insert(3, Value::Str("2500.5".into()));
        lp.insert(5, Value::Int(1));
        let mut map = TagMap::new();
        map.insert(1, Value::Int(207));
        map.insert(16, Value::Nested(lp));
        let rec = project_public(&map);
        assert_eq!(rec.lobby.len(), 1);
        let d = &rec.lobby[0];
        assert_eq!(d.table_id, 7);
        assert_eq!(d.online_count, 15);
        assert_eq!(d.total_amount, 2500.5);
        assert!(d.seat_full);
    }

    #[test]
    fn test_scalar_in_list_slot_projects_as_empty_list() {
        // A repeated string field that arrived as a lone scalar is "no
        // data", not a one-element list.
        let mut table = TagMap::new();
        table.insert(1, Value::Int(9));
        table.insert(10, Value::Str("#1#0#5".into()));
        let mut map = TagMap::new();
        map.insert(1, Value::Int(43));
        map.insert(17, Value::Nested(table));
        let rec = project_public(&map);
        assert!(rec.tables[0].roads.is_empty());
    }
}
