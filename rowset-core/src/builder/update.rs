//! UPDATE action builder

use tracing::debug;

use super::common::{Condition, IntoCondition, IntoRecord, QueryBuilder};
use crate::compiler::compile_update;
use crate::db::Db;
use crate::executor::Driver;
use crate::fields::FieldMap;
use crate::response::{Envelope, OperationKind};
use crate::value::Record;
use crate::{Result, Value};

/// UPDATE builder. Rows are selected by conditions only.
#[derive(Debug)]
pub struct Update<'a, D: Driver> {
    db: &'a Db<D>,
    table: Option<String>,
    object: Record,
    conditions: Vec<Condition>,
}

impl<'a, D: Driver> Update<'a, D> {
    pub(crate) fn new(db: &'a Db<D>) -> Self {
        Self {
            db,
            table: None,
            object: Record::new(),
            conditions: Vec::new(),
        }
    }

    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Add properties to write
    pub fn object<R>(mut self, object: R) -> Self
    where
        R: IntoRecord,
    {
        self.object.extend(object.into_record());
        self
    }

    pub fn set(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.object.insert(property.into(), value.into());
        self
    }

    pub fn where_<C>(mut self, condition: C) -> Self
    where
        C: IntoCondition,
    {
        self.conditions.push(condition.into_condition());
        self
    }

    pub fn conditions<I, C>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: IntoCondition,
    {
        self.conditions
            .extend(conditions.into_iter().map(IntoCondition::into_condition));
        self
    }

    pub async fn execute(self, field_map: Option<&FieldMap>) -> Result<Envelope> {
        let table = self.table.as_deref().unwrap_or_default();
        let field_map = self.db.field_map_for(table, field_map);
        let sql = self.to_sql(&field_map)?;

        debug!(table, %sql, "executing update");
        self.db.run(&sql, OperationKind::Update).await
    }
}

impl<D: Driver> QueryBuilder for Update<'_, D> {
    fn kind(&self) -> OperationKind {
        OperationKind::Update
    }

    fn to_sql(&self, field_map: &FieldMap) -> Result<String> {
        compile_update(
            self.table.as_deref().unwrap_or_default(),
            &self.object,
            &self.conditions,
            field_map,
        )
    }
}
