//! DELETE action builder

use tracing::debug;

use super::common::{Condition, IntoCondition, QueryBuilder};
use crate::compiler::{compile_deactivate, compile_delete};
use crate::db::Db;
use crate::executor::Driver;
use crate::fields::FieldMap;
use crate::response::{Envelope, OperationKind};
use crate::Result;

/// DELETE builder. At least one condition is required.
///
/// With [`Delete::soft`] the rows are deactivated (`is_active = 0`) instead of removed.
#[derive(Debug)]
pub struct Delete<'a, D: Driver> {
    db: &'a Db<D>,
    table: Option<String>,
    conditions: Vec<Condition>,
    soft: bool,
}

impl<'a, D: Driver> Delete<'a, D> {
    pub(crate) fn new(db: &'a Db<D>) -> Self {
        Self {
            db,
            table: None,
            conditions: Vec::new(),
            soft: false,
        }
    }

    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
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

    /// Clear the is-active flag instead of deleting
    pub fn soft(mut self) -> Self {
        self.soft = true;
        self
    }

    pub async fn execute(self, field_map: Option<&FieldMap>) -> Result<Envelope> {
        let table = self.table.as_deref().unwrap_or_default();
        let field_map = self.db.field_map_for(table, field_map);
        let sql = self.to_sql(&field_map)?;

        debug!(table, soft = self.soft, %sql, "executing delete");
        self.db.run(&sql, self.kind()).await
    }
}

impl<D: Driver> QueryBuilder for Delete<'_, D> {
    fn kind(&self) -> OperationKind {
        if self.soft {
            OperationKind::Update
        } else {
            OperationKind::Delete
        }
    }

    fn to_sql(&self, field_map: &FieldMap) -> Result<String> {
        let table = self.table.as_deref().unwrap_or_default();
        if self.soft {
            compile_deactivate(table, &self.conditions, field_map)
        } else {
            compile_delete(table, &self.conditions, field_map)
        }
    }
}
