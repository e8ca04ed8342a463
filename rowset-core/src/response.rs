//! Response classification and normalization.
//!
//! A raw driver result comes in one of three shapes:
//!
//! - a header object `{ "affectedRows", "insertId", "info" }` for writes,
//! - a row array `[ {..}, {..} ]` for a single result set,
//! - a procedure packet `[ [rows..], [rows..], header ]` for `CALL`.
//!
//! [`Packet::decode`] turns the JSON tree into one of these variants and
//! [`build_envelope`] produces the [`Envelope`] returned to callers.

use std::fmt::{self, Display};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{trace, warn};

use crate::mapper::normalize_row;
use crate::value::{MultiRecordSet, RecordSet};
use crate::{Error, Result};

/// Column a procedure selects alone to name the recordset that follows it
pub const RECORDSET_NAME_COLUMN: &str = "recordsetName";

/// Name of the recordset when a result has only one
pub const DEFAULT_RECORDSET_NAME: &str = "items";

static CHANGED_ROWS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Changed:\s*(\d+)").expect("unable to compile changed rows regex")
});

/// Write metadata reported by the driver
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResultHeader {
    pub affected_rows: u64,
    pub insert_id: u64,
    pub info: String,
}

impl ResultHeader {
    /// Read a header object; `None` if `raw` is not one.
    pub fn from_json(raw: &JsonValue) -> Option<Self> {
        if !is_header_result(raw) {
            return None;
        }
        Some(Self {
            affected_rows: raw["affectedRows"].as_u64().unwrap_or(0),
            insert_id: raw["insertId"].as_u64().unwrap_or(0),
            info: raw["info"].as_str().unwrap_or_default().to_string(),
        })
    }

    /// Header as the driver would serialize it
    pub fn to_json(&self) -> JsonValue {
        serde_json::json!({
            "affectedRows": self.affected_rows,
            "insertId": self.insert_id,
            "info": self.info,
        })
    }
}

/// True if `raw` is an object carrying `affectedRows`, `insertId` and `info`.
pub fn is_header_result(raw: &JsonValue) -> bool {
    match raw.as_object() {
        Some(object) => ["affectedRows", "insertId", "info"]
            .iter()
            .all(|key| object.contains_key(*key)),
        None => false,
    }
}

/// True if `raw` is an array (possibly empty) of plain row objects.
pub fn is_row_array(raw: &JsonValue) -> bool {
    match raw.as_array() {
        Some(rows) => rows.iter().all(is_plain_row),
        None => false,
    }
}

fn is_plain_row(raw: &JsonValue) -> bool {
    raw.is_object() && !is_header_result(raw)
}

/// Result sets of a stored-procedure call and its trailing header
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedurePacket<'a> {
    pub recordsets: Vec<&'a [JsonValue]>,
    pub header: ResultHeader,
}

/// Split a procedure result into its recordsets and header.
///
/// A bare header yields no recordsets. For an array, the last element must be
/// a header and every element before it a row array, otherwise `None`.
pub fn extract_procedure_packet(raw: &JsonValue) -> Option<ProcedurePacket<'_>> {
    if let Some(header) = ResultHeader::from_json(raw) {
        return Some(ProcedurePacket {
            recordsets: Vec::new(),
            header,
        });
    }

    let (last, segments) = raw.as_array()?.split_last()?;
    let header = ResultHeader::from_json(last)?;
    let recordsets = segments
        .iter()
        .map(|segment| {
            segment
                .as_array()
                .filter(|rows| rows.iter().all(is_plain_row))
                .map(Vec::as_slice)
        })
        .collect::<Option<Vec<_>>>()?;

    Some(ProcedurePacket { recordsets, header })
}

/// Number following `Changed:` in the driver's info text, 0 when absent.
pub fn parse_changed_rows(info: &str) -> u64 {
    CHANGED_ROWS
        .captures(info)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Decoded shape of a raw driver result
#[derive(Debug, Clone, PartialEq)]
pub enum Packet<'a> {
    Header(ResultHeader),
    Rows(&'a [JsonValue]),
    Procedure(ProcedurePacket<'a>),
}

impl<'a> Packet<'a> {
    pub fn decode(raw: &'a JsonValue) -> Result<Self> {
        if let Some(header) = ResultHeader::from_json(raw) {
            return Ok(Packet::Header(header));
        }
        if let Some(rows) = raw.as_array().filter(|_| is_row_array(raw)) {
            return Ok(Packet::Rows(rows.as_slice()));
        }
        if let Some(packet) = extract_procedure_packet(raw) {
            return Ok(Packet::Procedure(packet));
        }
        Err(Error::invalid_response(format!(
            "unrecognized result shape: {}",
            truncate(&raw.to_string(), 120)
        )))
    }

    fn describe(&self) -> &'static str {
        match self {
            Packet::Header(_) => "a result header",
            Packet::Rows(_) => "a row array",
            Packet::Procedure(_) => "a procedure packet",
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Wrap a single result set as `{ items: rows }`.
pub fn single_recordset(rows: RecordSet) -> MultiRecordSet {
    let mut multi = MultiRecordSet::new();
    multi.insert(DEFAULT_RECORDSET_NAME.to_string(), rows);
    multi
}

/// Name the recordsets of a procedure result.
///
/// One recordset is named `items`. With more, a one-row one-column recordset
/// holding [`RECORDSET_NAME_COLUMN`] names the recordset after it; recordsets
/// without a name become `items_1`, `items_2`, ...
pub fn to_multi_recordset(recordsets: Vec<RecordSet>) -> MultiRecordSet {
    if recordsets.len() <= 1 {
        return match recordsets.into_iter().next() {
            Some(rows) => single_recordset(rows),
            None => MultiRecordSet::new(),
        };
    }

    let mut multi = MultiRecordSet::new();
    let mut pending: Option<String> = None;
    let mut anonymous = 0usize;

    for rows in recordsets {
        if let Some(name) = name_marker(&rows) {
            if let Some(replaced) = pending.replace(name) {
                trace!(marker = %replaced, "name marker superseded by the next one");
            }
            continue;
        }

        let name = match pending.take() {
            Some(name) => name,
            None => {
                anonymous += 1;
                format!("{}_{}", DEFAULT_RECORDSET_NAME, anonymous)
            }
        };
        trace!(recordset = %name, rows = rows.len(), "named recordset");
        multi.insert(name, rows);
    }

    if let Some(name) = pending {
        warn!(marker = %name, "name marker without a following recordset");
    }

    multi
}

fn name_marker(rows: &RecordSet) -> Option<String> {
    match rows.as_slice() {
        [row] if row.len() == 1 => row.get(RECORDSET_NAME_COLUMN).map(|v| v.to_string()),
        _ => None,
    }
}

/// The response shape returned by every operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub affected_rows: u64,
    pub changed_rows: u64,
    pub insert_id: u64,
    pub items: MultiRecordSet,
}

impl Envelope {
    fn from_header(header: &ResultHeader) -> Self {
        Self {
            affected_rows: header.affected_rows,
            changed_rows: parse_changed_rows(&header.info),
            insert_id: header.insert_id,
            items: MultiRecordSet::new(),
        }
    }

    /// Rows of the recordset named `items`, if present
    pub fn rows(&self) -> Option<&RecordSet> {
        self.items.get(DEFAULT_RECORDSET_NAME)
    }
}

/// Kind of statement that produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Select,
    Insert,
    Update,
    Delete,
    Proc,
    Unknown,
}

impl OperationKind {
    /// Classify a statement by its leading keyword.
    pub fn from_sql(sql: &str) -> Self {
        let keyword = sql
            .split(|c: char| c.is_whitespace() || c == '(')
            .find(|word| !word.is_empty())
            .unwrap_or_default();

        match keyword.to_ascii_uppercase().as_str() {
            "SELECT" => OperationKind::Select,
            "INSERT" => OperationKind::Insert,
            "UPDATE" => OperationKind::Update,
            "DELETE" => OperationKind::Delete,
            "CALL" => OperationKind::Proc,
            _ => OperationKind::Unknown,
        }
    }

    fn accepts(&self, packet: &Packet<'_>) -> bool {
        use OperationKind::*;
        match packet {
            Packet::Rows(_) => matches!(self, Select | Proc | Unknown),
            Packet::Header(_) => matches!(self, Insert | Update | Delete | Proc | Unknown),
            Packet::Procedure(_) => matches!(self, Proc | Unknown),
        }
    }
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Select => "SELECT",
            OperationKind::Insert => "INSERT",
            OperationKind::Update => "UPDATE",
            OperationKind::Delete => "DELETE",
            OperationKind::Proc => "CALL",
            OperationKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Turn one raw driver result into an [`Envelope`].
pub fn build_envelope(raw: &JsonValue, kind: OperationKind) -> Result<Envelope> {
    let packet = Packet::decode(raw)?;
    trace!(%kind, packet = packet.describe(), "classified driver result");

    if !kind.accepts(&packet) {
        return Err(Error::invalid_response(format!(
            "{} statement returned {}",
            kind,
            packet.describe()
        )));
    }

    match packet {
        Packet::Header(header) => Ok(Envelope::from_header(&header)),
        Packet::Rows(rows) => Ok(Envelope {
            items: single_recordset(normalize_rows(rows)?),
            ..Envelope::default()
        }),
        Packet::Procedure(packet) => {
            let recordsets = packet
                .recordsets
                .iter()
                .map(|rows| normalize_rows(rows))
                .collect::<Result<Vec<_>>>()?;
            Ok(Envelope {
                items: to_multi_recordset(recordsets),
                ..Envelope::from_header(&packet.header)
            })
        }
    }
}

fn normalize_rows(rows: &[JsonValue]) -> Result<RecordSet> {
    rows.iter().map(normalize_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Record;
    use crate::Value;
    use serde_json::json;

    fn header(affected: u64, insert_id: u64, info: &str) -> JsonValue {
        json!({"affectedRows": affected, "insertId": insert_id, "info": info})
    }

    fn row(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn ids(ids: &[i64]) -> RecordSet {
        ids.iter().map(|id| row(&[("id", Value::I64(*id))])).collect()
    }

    fn marker(name: &str) -> RecordSet {
        vec![row(&[(RECORDSET_NAME_COLUMN, name.into())])]
    }

    #[test]
    fn test_is_header_result() {
        assert!(is_header_result(&header(1, 0, "")));
        assert!(!is_header_result(&json!({"affectedRows": 1, "insertId": 0})));
        assert!(!is_header_result(&json!([header(1, 0, "")])));
        assert!(!is_header_result(&json!(null)));
    }

    #[test]
    fn test_is_row_array() {
        assert!(is_row_array(&json!([])));
        assert!(is_row_array(&json!([{"id": 1}, {"id": 2}])));
        assert!(!is_row_array(&json!([{"id": 1}, 5])));
        assert!(!is_row_array(&json!([[{"id": 1}]])));
        assert!(!is_row_array(&json!({"id": 1})));
    }

    #[test]
    fn test_extract_procedure_packet() {
        let raw = json!([[{"id": 1}], [], header(0, 0, "")]);
        let packet = extract_procedure_packet(&raw).unwrap();
        assert_eq!(packet.recordsets.len(), 2);
        assert!(packet.recordsets[1].is_empty());
        assert_eq!(packet.header, ResultHeader::default());

        let bare = header(3, 0, "");
        let packet = extract_procedure_packet(&bare).unwrap();
        assert!(packet.recordsets.is_empty());
        assert_eq!(packet.header.affected_rows, 3);
    }

    #[test]
    fn test_extract_procedure_packet_rejects_violations() {
        // last element is not a header
        assert!(extract_procedure_packet(&json!([[{"id": 1}], [{"id": 2}]])).is_none());
        // segment is not a row array
        assert!(extract_procedure_packet(&json!([[1, 2], header(0, 0, "")])).is_none());
        assert!(extract_procedure_packet(&json!([{"id": 1}, header(0, 0, "")])).is_none());
        assert!(extract_procedure_packet(&json!([])).is_none());
        assert!(extract_procedure_packet(&json!("x")).is_none());
    }

    #[test]
    fn test_parse_changed_rows() {
        assert_eq!(parse_changed_rows("Rows matched: 3  Changed: 2  Warnings: 0"), 2);
        assert_eq!(parse_changed_rows("Changed:17"), 17);
        assert_eq!(parse_changed_rows(""), 0);
        assert_eq!(parse_changed_rows("Records: 1  Duplicates: 0"), 0);
    }

    #[test]
    fn test_decode() {
        let raw = header(1, 5, "");
        assert!(matches!(Packet::decode(&raw), Ok(Packet::Header(_))));

        let raw = json!([{"id": 1}]);
        assert!(matches!(Packet::decode(&raw), Ok(Packet::Rows(rows)) if rows.len() == 1));

        let raw = json!([[{"id": 1}], header(0, 0, "")]);
        assert!(matches!(Packet::decode(&raw), Ok(Packet::Procedure(_))));

        for raw in [json!(5), json!({"id": 1}), json!([[{"id": 1}]]), json!(null)] {
            assert!(matches!(
                Packet::decode(&raw),
                Err(Error::InvalidResponse { .. })
            ));
        }
    }

    #[test]
    fn test_to_multi_recordset_trivial() {
        assert!(to_multi_recordset(Vec::new()).is_empty());

        let multi = to_multi_recordset(vec![ids(&[1, 2])]);
        assert_eq!(multi.len(), 1);
        assert_eq!(multi["items"], ids(&[1, 2]));
    }

    #[test]
    fn test_to_multi_recordset_named() {
        let multi = to_multi_recordset(vec![marker("A"), ids(&[1]), marker("B"), ids(&[2, 3])]);
        assert_eq!(multi.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(multi["A"], ids(&[1]));
        assert_eq!(multi["B"], ids(&[2, 3]));
    }

    #[test]
    fn test_to_multi_recordset_anonymous() {
        let multi = to_multi_recordset(vec![ids(&[1]), ids(&[2])]);
        assert_eq!(multi.keys().collect::<Vec<_>>(), vec!["items_1", "items_2"]);
    }

    #[test]
    fn test_to_multi_recordset_mixed() {
        // markers do not advance the anonymous counter
        let multi = to_multi_recordset(vec![ids(&[1]), marker("users"), ids(&[2]), ids(&[3])]);
        assert_eq!(
            multi.keys().collect::<Vec<_>>(),
            vec!["items_1", "users", "items_2"]
        );
        assert_eq!(multi["items_2"], ids(&[3]));
    }

    #[test]
    fn test_to_multi_recordset_marker_edge_cases() {
        // trailing marker is dropped
        let multi = to_multi_recordset(vec![ids(&[1]), marker("orphan")]);
        assert_eq!(multi.keys().collect::<Vec<_>>(), vec!["items_1"]);

        // consecutive markers: the later one names the recordset
        let multi = to_multi_recordset(vec![marker("A"), marker("B"), ids(&[1])]);
        assert_eq!(multi.keys().collect::<Vec<_>>(), vec!["B"]);

        // duplicate names: later rows replace earlier ones in place
        let multi = to_multi_recordset(vec![
            marker("A"),
            ids(&[1]),
            ids(&[2]),
            marker("A"),
            ids(&[3]),
        ]);
        assert_eq!(multi.keys().collect::<Vec<_>>(), vec!["A", "items_1"]);
        assert_eq!(multi["A"], ids(&[3]));
    }

    #[test]
    fn test_marker_needs_a_single_column() {
        let not_marker = vec![row(&[
            (RECORDSET_NAME_COLUMN, "A".into()),
            ("id", Value::I64(1)),
        ])];
        let multi = to_multi_recordset(vec![not_marker.clone(), ids(&[1])]);
        assert_eq!(multi["items_1"], not_marker);
        assert_eq!(multi["items_2"], ids(&[1]));
    }

    #[test]
    fn test_build_envelope_procedure_named() {
        let raw = json!([
            [{"recordsetName": "A"}],
            [{"id": 1}],
            [{"recordsetName": "B"}],
            [{"id": 2}, {"id": 3}],
            header(0, 0, "")
        ]);
        let envelope = build_envelope(&raw, OperationKind::Proc).unwrap();
        assert_eq!(envelope.items.len(), 2);
        assert_eq!(envelope.items["A"], ids(&[1]));
        assert_eq!(envelope.items["B"], ids(&[2, 3]));
    }

    #[test]
    fn test_build_envelope_procedure_anonymous() {
        let raw = json!([[{"id": 1}], [{"id": 2}], header(0, 0, "")]);
        let envelope = build_envelope(&raw, OperationKind::Proc).unwrap();
        assert_eq!(envelope.items["items_1"], ids(&[1]));
        assert_eq!(envelope.items["items_2"], ids(&[2]));

        let raw = json!([[{"id": 1}], header(0, 0, "")]);
        let envelope = build_envelope(&raw, OperationKind::Proc).unwrap();
        assert_eq!(envelope.items.keys().collect::<Vec<_>>(), vec!["items"]);
        assert_eq!(envelope.rows(), Some(&ids(&[1])));
    }

    #[test]
    fn test_build_envelope_write() {
        let raw = header(3, 0, "Rows matched: 3  Changed: 2  Warnings: 0");
        let envelope = build_envelope(&raw, OperationKind::Update).unwrap();
        assert_eq!(envelope.affected_rows, 3);
        assert_eq!(envelope.changed_rows, 2);
        assert_eq!(envelope.insert_id, 0);
        assert!(envelope.items.is_empty());

        let envelope = build_envelope(&header(1, 42, ""), OperationKind::Insert).unwrap();
        assert_eq!(envelope.insert_id, 42);
        assert_eq!(envelope.changed_rows, 0);
    }

    #[test]
    fn test_build_envelope_select() {
        let envelope = build_envelope(&json!([{"id": 1}, {"id": 2}]), OperationKind::Select).unwrap();
        assert_eq!(envelope.affected_rows, 0);
        assert_eq!(envelope.rows(), Some(&ids(&[1, 2])));

        let envelope = build_envelope(&json!([]), OperationKind::Select).unwrap();
        assert_eq!(envelope.rows(), Some(&Vec::new()));
    }

    #[test]
    fn test_build_envelope_unwraps_nested_rows() {
        let raw = json!([{"users": {"id": 1}}]);
        let envelope = build_envelope(&raw, OperationKind::Select).unwrap();
        assert_eq!(envelope.rows(), Some(&ids(&[1])));

        let raw = json!([{"a": {"b": {"id": 1}}}]);
        assert!(matches!(
            build_envelope(&raw, OperationKind::Select),
            Err(Error::UnexpectedRowStructure { .. })
        ));
    }

    #[test]
    fn test_build_envelope_rejects_mismatched_kind() {
        assert!(matches!(
            build_envelope(&header(1, 0, ""), OperationKind::Select),
            Err(Error::InvalidResponse { .. })
        ));
        assert!(matches!(
            build_envelope(&json!([{"id": 1}]), OperationKind::Delete),
            Err(Error::InvalidResponse { .. })
        ));
        let packet = json!([[{"id": 1}], header(0, 0, "")]);
        assert!(matches!(
            build_envelope(&packet, OperationKind::Select),
            Err(Error::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_envelope_serializes_camel_case() {
        let envelope = build_envelope(&header(2, 7, "Changed: 1"), OperationKind::Insert).unwrap();
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"affectedRows": 2, "changedRows": 1, "insertId": 7, "items": {}})
        );
    }

    #[test]
    fn test_operation_kind_from_sql() {
        assert_eq!(OperationKind::from_sql("SELECT * FROM t"), OperationKind::Select);
        assert_eq!(OperationKind::from_sql("  insert into t"), OperationKind::Insert);
        assert_eq!(OperationKind::from_sql("Update t SET a = 1"), OperationKind::Update);
        assert_eq!(OperationKind::from_sql("DELETE FROM t"), OperationKind::Delete);
        assert_eq!(OperationKind::from_sql("CALL sp_get()"), OperationKind::Proc);
        assert_eq!(OperationKind::from_sql("(SELECT 1)"), OperationKind::Select);
        assert_eq!(OperationKind::from_sql("SHOW TABLES"), OperationKind::Unknown);
        assert_eq!(OperationKind::from_sql(""), OperationKind::Unknown);
    }

    #[test]
    fn test_header_round_trip() {
        let header = ResultHeader {
            affected_rows: 1,
            insert_id: 9,
            info: String::new(),
        };
        assert_eq!(ResultHeader::from_json(&header.to_json()), Some(header));
    }
}
