//! Renaming of recordset columns to domain property names

use serde_json::{Map, Value as JsonValue};

use crate::fields::{FieldMap, MultiFieldMap};
use crate::value::{MultiRecordSet, Record, RecordSet};
use crate::{Error, Result, Value};

/// Rename every row's column keys to property names.
///
/// `field_map` goes from property to column, so it is inverted once up front.
/// Keys without a mapping are kept as they are.
pub fn convert_recordset(rows: RecordSet, field_map: &FieldMap) -> RecordSet {
    if field_map.is_empty() {
        return rows;
    }
    let columns = field_map.invert();
    rows.into_iter()
        .map(|record| convert_record(record, &columns))
        .collect()
}

/// Apply [`convert_recordset`] to each named recordset with that recordset's own map.
pub fn convert_multi_recordset(multi: MultiRecordSet, field_maps: &MultiFieldMap) -> MultiRecordSet {
    multi
        .into_iter()
        .map(|(name, rows)| {
            let rows = match field_maps.get(&name) {
                Some(map) => convert_recordset(rows, map),
                None => rows,
            };
            (name, rows)
        })
        .collect()
}

fn convert_record(record: Record, columns: &FieldMap) -> Record {
    record
        .into_iter()
        .map(|(key, value)| match columns.get(&key) {
            Some(property) => (property.to_string(), value),
            None => (key, value),
        })
        .collect()
}

/// Flatten one raw driver row into a [`Record`].
///
/// Drivers that nest tables return `{ "users": { "id": 1 } }`; a single-key
/// wrapper around a flat object is unwrapped. Anything deeper fails.
pub fn normalize_row(raw: &JsonValue) -> Result<Record> {
    let object = raw
        .as_object()
        .ok_or_else(|| Error::unexpected_row(format!("expected an object, got {}", raw)))?;

    if is_flat(object) {
        return Ok(to_record(object));
    }

    if object.len() == 1 {
        if let Some((_, inner)) = object.iter().next() {
            if let Some(inner) = inner.as_object().filter(|inner| is_flat(inner)) {
                return Ok(to_record(inner));
            }
        }
    }

    Err(Error::unexpected_row(format!(
        "row is not a flat record: {}",
        raw
    )))
}

fn is_flat(object: &Map<String, JsonValue>) -> bool {
    object
        .values()
        .all(|v| !matches!(v, JsonValue::Object(_) | JsonValue::Array(_)))
}

fn to_record(object: &Map<String, JsonValue>) -> Record {
    object
        .iter()
        .map(|(key, value)| (key.clone(), Value::from_json(value)))
        .collect()
}
