//! Stored-procedure action builder

use tracing::debug;

use super::common::QueryBuilder;
use crate::compiler::compile_call_procedure;
use crate::db::Db;
use crate::executor::Driver;
use crate::fields::{FieldMap, MultiFieldMap};
use crate::mapper::convert_multi_recordset;
use crate::response::{Envelope, OperationKind};
use crate::{Result, Value};

/// `CALL` builder.
///
/// Every result set of the procedure lands in `items`, named by the
/// procedure's `recordsetName` markers or numbered `items_1`, `items_2`, ...
#[derive(Debug)]
pub struct Proc<'a, D: Driver> {
    db: &'a Db<D>,
    name: Option<String>,
    params: Option<Value>,
}

impl<'a, D: Driver> Proc<'a, D> {
    pub(crate) fn new(db: &'a Db<D>) -> Self {
        Self {
            db,
            name: None,
            params: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace the parameters: a single primitive or an array of primitives
    pub fn params(mut self, params: impl Into<Value>) -> Self {
        self.params = Some(params.into());
        self
    }

    /// Append one parameter
    pub fn param(mut self, param: impl Into<Value>) -> Self {
        let param = param.into();
        self.params = Some(match self.params.take() {
            None => Value::Array(vec![param]),
            Some(Value::Array(mut items)) => {
                items.push(param);
                Value::Array(items)
            }
            Some(single) => Value::Array(vec![single, param]),
        });
        self
    }

    /// Call the procedure.
    ///
    /// `field_maps` renames each recordset with its own map. Without it, maps
    /// are looked up in the facade's registry by recordset name.
    pub async fn execute(self, field_maps: Option<&MultiFieldMap>) -> Result<Envelope> {
        let sql = self.to_sql(&FieldMap::new())?;

        debug!(procedure = self.name.as_deref().unwrap_or_default(), %sql, "executing procedure");
        let mut envelope = self.db.run(&sql, OperationKind::Proc).await?;

        let registered;
        let field_maps = match (field_maps, self.db.registry()) {
            (Some(maps), _) => Some(maps),
            (None, Some(registry)) => {
                registered = registry.multi_field_map(envelope.items.keys().map(String::as_str));
                Some(&registered)
            }
            (None, None) => None,
        };
        if let Some(maps) = field_maps {
            envelope.items = convert_multi_recordset(envelope.items, maps);
        }
        Ok(envelope)
    }
}

impl<D: Driver> QueryBuilder for Proc<'_, D> {
    fn kind(&self) -> OperationKind {
        OperationKind::Proc
    }

    // Procedure parameters are positional; the field map does not apply.
    fn to_sql(&self, _field_map: &FieldMap) -> Result<String> {
        compile_call_procedure(self.name.as_deref().unwrap_or_default(), self.params.as_ref())
    }
}
