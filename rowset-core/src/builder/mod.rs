//! Action builders: accumulate a statement, compile it and execute it once

pub mod common;
pub mod delete;
pub mod insert;
pub mod proc;
pub mod select;
pub mod update;

pub use common::{Condition, IntoCondition, IntoFields, IntoRecord, OrderRule, QueryBuilder};
pub use delete::Delete;
pub use insert::Insert;
pub use proc::Proc;
pub use select::Select;
pub use update::Update;

use crate::fields::FieldMap;
use crate::mapper::convert_recordset;
use crate::response::Envelope;

/// Rename the columns of every recordset in `envelope` with one field map.
fn convert_items(mut envelope: Envelope, field_map: &FieldMap) -> Envelope {
    if field_map.is_empty() {
        return envelope;
    }
    envelope.items = envelope
        .items
        .into_iter()
        .map(|(name, rows)| (name, convert_recordset(rows, field_map)))
        .collect();
    envelope
}
