//! INSERT action builder

use tracing::{debug, warn};

use super::common::{Condition, IntoRecord, QueryBuilder};
use super::convert_items;
use crate::compiler::{compile_insert, compile_select};
use crate::db::Db;
use crate::executor::Driver;
use crate::fields::FieldMap;
use crate::response::{Envelope, OperationKind};
use crate::value::Record;
use crate::{Result, Value};

/// Property the read-back query filters on unless [`Insert::key`] says otherwise
pub const DEFAULT_KEY: &str = "id";

/// INSERT builder.
///
/// After the write succeeds the new row is read back by its insert id, so
/// `items` holds the row as stored, defaults included.
#[derive(Debug)]
pub struct Insert<'a, D: Driver> {
    db: &'a Db<D>,
    table: Option<String>,
    object: Record,
    key: String,
}

impl<'a, D: Driver> Insert<'a, D> {
    pub(crate) fn new(db: &'a Db<D>) -> Self {
        Self {
            db,
            table: None,
            object: Record::new(),
            key: DEFAULT_KEY.to_string(),
        }
    }

    pub fn into(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Add the properties of `object` to the row being written
    pub fn object<R>(mut self, object: R) -> Self
    where
        R: IntoRecord,
    {
        self.object.extend(object.into_record());
        self
    }

    /// Set a single property
    pub fn set(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.object.insert(property.into(), value.into());
        self
    }

    /// Property holding the auto-increment id, used by the read-back query
    pub fn key(mut self, property: impl Into<String>) -> Self {
        self.key = property.into();
        self
    }

    /// Write the row, then read it back.
    ///
    /// Fails if either statement fails, even when the INSERT itself went through.
    pub async fn execute(self, field_map: Option<&FieldMap>) -> Result<Envelope> {
        let table = self.table.as_deref().unwrap_or_default();
        let field_map = self.db.field_map_for(table, field_map);
        let sql = self.to_sql(&field_map)?;

        debug!(table, %sql, "executing insert");
        let written = self.db.run(&sql, OperationKind::Insert).await?;

        let read_back = compile_select(
            &[],
            table,
            &[Condition::eq(self.key.as_str(), written.insert_id)],
            &[],
            &field_map,
        )?;
        debug!(table, sql = %read_back, "reading back inserted row");
        let stored = match self.db.run(&read_back, OperationKind::Select).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(table, insert_id = written.insert_id, error = %e, "read-back after insert failed");
                return Err(e);
            }
        };

        Ok(Envelope {
            items: convert_items(stored, &field_map).items,
            ..written
        })
    }
}

impl<D: Driver> QueryBuilder for Insert<'_, D> {
    fn kind(&self) -> OperationKind {
        OperationKind::Insert
    }

    fn to_sql(&self, field_map: &FieldMap) -> Result<String> {
        compile_insert(
            self.table.as_deref().unwrap_or_default(),
            &self.object,
            field_map,
        )
    }
}
