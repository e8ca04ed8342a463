//! SELECT action builder

use tracing::debug;

use super::common::{Condition, IntoCondition, IntoFields, OrderRule, QueryBuilder};
use super::convert_items;
use crate::compiler::compile_select;
use crate::db::Db;
use crate::executor::Driver;
use crate::fields::FieldMap;
use crate::response::{Envelope, OperationKind};
use crate::Result;

/// SELECT builder. Rows come back under `items`.
#[derive(Debug)]
pub struct Select<'a, D: Driver> {
    db: &'a Db<D>,
    table: Option<String>,
    fields: Vec<String>,
    conditions: Vec<Condition>,
    order: Vec<OrderRule>,
}

impl<'a, D: Driver> Select<'a, D> {
    pub(crate) fn new(db: &'a Db<D>) -> Self {
        Self {
            db,
            table: None,
            fields: Vec::new(),
            conditions: Vec::new(),
            order: Vec::new(),
        }
    }

    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Add projected fields. Names are trimmed; empty names and
    /// case-insensitive repeats are skipped. No fields means `SELECT *`.
    pub fn fields<F>(mut self, fields: F) -> Self
    where
        F: IntoFields,
    {
        for field in fields.into_fields() {
            let field = field.trim();
            if field.is_empty() || self.fields.iter().any(|f| f.eq_ignore_ascii_case(field)) {
                continue;
            }
            self.fields.push(field.to_string());
        }
        self
    }

    /// Add a WHERE condition; conditions are AND-ed
    pub fn where_<C>(mut self, condition: C) -> Self
    where
        C: IntoCondition,
    {
        self.conditions.push(condition.into_condition());
        self
    }

    /// Add several WHERE conditions at once
    pub fn conditions<I, C>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: IntoCondition,
    {
        self.conditions
            .extend(conditions.into_iter().map(IntoCondition::into_condition));
        self
    }

    pub fn order(mut self, rule: OrderRule) -> Self {
        self.order.push(rule);
        self
    }

    pub fn order_by(self, field: impl Into<String>, ascending: bool) -> Self {
        let rule = if ascending {
            OrderRule::asc(field)
        } else {
            OrderRule::desc(field)
        };
        self.order(rule)
    }

    /// Run the query.
    ///
    /// Without `field_map`, the facade's registry entry for the table is used.
    pub async fn execute(self, field_map: Option<&FieldMap>) -> Result<Envelope> {
        let table = self.table.as_deref().unwrap_or_default();
        let field_map = self.db.field_map_for(table, field_map);
        let sql = self.to_sql(&field_map)?;

        debug!(table, %sql, "executing select");
        let envelope = self.db.run(&sql, OperationKind::Select).await?;
        Ok(convert_items(envelope, &field_map))
    }
}

impl<D: Driver> QueryBuilder for Select<'_, D> {
    fn kind(&self) -> OperationKind {
        OperationKind::Select
    }

    fn to_sql(&self, field_map: &FieldMap) -> Result<String> {
        compile_select(
            &self.fields,
            self.table.as_deref().unwrap_or_default(),
            &self.conditions,
            &self.order,
            field_map,
        )
    }
}
