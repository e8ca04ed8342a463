//! Statement compiler: builder state to MySQL text.
//!
//! Every function here is pure. The field map is an explicit argument of each
//! call, so concurrent compilations never share naming state. Values are
//! inlined as escaped literals; no placeholders are produced.

use indexmap::IndexSet;

use crate::builder::common::{Condition, OrderRule};
use crate::fields::FieldMap;
use crate::value::Record;
use crate::{Error, Operator, Result, Value};

/// Soft-delete column used when the field map has no `isActive` entry
pub const DEFAULT_IS_ACTIVE_COLUMN: &str = "is_active";

/// Property name looked up in the field map to find the soft-delete column
pub const IS_ACTIVE_PROPERTY: &str = "isActive";

/// Compile a SELECT statement.
///
/// # Examples
/// ```
/// use rowset_core::compiler::compile_select;
/// use rowset_core::{Condition, FieldMap, OrderRule};
///
/// let sql = compile_select(
///     &["id".to_string(), "name".to_string()],
///     "users",
///     &[Condition::eq("name", "John")],
///     &[OrderRule::asc("name")],
///     &FieldMap::new(),
/// )
/// .unwrap();
/// assert_eq!(sql, "SELECT id, name FROM users WHERE name = 'John' ORDER BY name ASC");
/// ```
pub fn compile_select(
    fields: &[String],
    table: &str,
    conditions: &[Condition],
    order: &[OrderRule],
    field_map: &FieldMap,
) -> Result<String> {
    let table = require_name(table, "table")?;

    let mut sql = String::from("SELECT ");
    if fields.is_empty() {
        sql.push('*');
    } else {
        let columns: Vec<&str> = fields.iter().map(|f| field_map.column(f)).collect();
        sql.push_str(&columns.join(", "));
    }

    sql.push_str(" FROM ");
    sql.push_str(table);

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_clause(conditions, field_map)?);
    }

    if !order.is_empty() {
        let rules: Vec<String> = order
            .iter()
            .map(|rule| compile_order_rule(rule, field_map))
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&rules.join(", "));
    }

    Ok(sql)
}

/// Compile an INSERT of a single object.
pub fn compile_insert(table: &str, object: &Record, field_map: &FieldMap) -> Result<String> {
    let table = require_name(table, "table")?;
    require_object(object)?;

    let columns: Vec<&str> = object.keys().map(|key| field_map.column(key)).collect();
    let values = object
        .values()
        .map(literal)
        .collect::<Result<Vec<_>>>()?;

    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        values.join(", ")
    ))
}

/// Compile an UPDATE of the rows matching `conditions`.
pub fn compile_update(
    table: &str,
    object: &Record,
    conditions: &[Condition],
    field_map: &FieldMap,
) -> Result<String> {
    let table = require_name(table, "table")?;
    require_object(object)?;
    require_conditions(conditions)?;

    let assignments = object
        .iter()
        .map(|(key, value)| Ok(format!("{} = {}", field_map.column(key), literal(value)?)))
        .collect::<Result<Vec<_>>>()?;

    Ok(format!(
        "UPDATE {} SET {} WHERE {}",
        table,
        assignments.join(", "),
        where_clause(conditions, field_map)?
    ))
}

/// Compile a DELETE of the rows matching `conditions`.
pub fn compile_delete(table: &str, conditions: &[Condition], field_map: &FieldMap) -> Result<String> {
    let table = require_name(table, "table")?;
    require_conditions(conditions)?;

    Ok(format!(
        "DELETE FROM {} WHERE {}",
        table,
        where_clause(conditions, field_map)?
    ))
}

/// Compile a soft delete: clears the is-active flag instead of removing rows.
pub fn compile_deactivate(
    table: &str,
    conditions: &[Condition],
    field_map: &FieldMap,
) -> Result<String> {
    let table = require_name(table, "table")?;
    require_conditions(conditions)?;

    let column = field_map
        .get(IS_ACTIVE_PROPERTY)
        .unwrap_or(DEFAULT_IS_ACTIVE_COLUMN);

    Ok(format!(
        "UPDATE {} SET {} = 0 WHERE {}",
        table,
        column,
        where_clause(conditions, field_map)?
    ))
}

/// Compile a stored-procedure call.
///
/// `params` may be absent, a single primitive, or an array of primitives.
pub fn compile_call_procedure(name: &str, params: Option<&Value>) -> Result<String> {
    let name = require_name(name, "name")?;

    let params: Vec<&Value> = match params {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(value) => vec![value],
    };

    if params.iter().any(|p| !p.is_primitive()) {
        return Err(Error::invalid_argument(
            "array",
            "can contain only primitive values",
        ));
    }

    let literals = params
        .into_iter()
        .map(literal)
        .collect::<Result<Vec<_>>>()?;

    Ok(format!("CALL {}({})", name, literals.join(", ")))
}

/// Compile a single WHERE condition.
pub fn compile_condition(condition: &Condition, field_map: &FieldMap) -> Result<String> {
    let column = field_map.column(&condition.field);

    if condition.operator.is_set() {
        return compile_set_condition(column, condition.operator, &condition.value);
    }

    match &condition.value {
        Value::Null if condition.operator.is_negative() => Ok(format!("{} IS NOT NULL", column)),
        Value::Null => Ok(format!("{} IS NULL", column)),
        value => Ok(format!(
            "{} {} {}",
            column,
            condition.operator,
            literal(value)?
        )),
    }
}

// IN / NOT IN: duplicates collapse, a NULL member becomes a separate IS [NOT] NULL
// branch OR-ed with the value list.
fn compile_set_condition(column: &str, operator: Operator, value: &Value) -> Result<String> {
    let members: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };

    if members.iter().any(|m| !m.is_primitive()) {
        return Err(Error::invalid_argument(
            "value",
            "expected a primitive or an array of primitives",
        ));
    }

    let has_null = members.iter().any(|m| m.is_null());
    let literals = members
        .into_iter()
        .filter(|m| !m.is_null())
        .map(literal)
        .collect::<Result<IndexSet<String>>>()?;

    let mut parts = Vec::with_capacity(2);
    if !literals.is_empty() {
        let list: Vec<&str> = literals.iter().map(String::as_str).collect();
        parts.push(format!("{} {} ({})", column, operator, list.join(", ")));
    }
    if has_null {
        let not = if operator == Operator::IN { "" } else { "NOT " };
        parts.push(format!("{} IS {}NULL", column, not));
    }

    match parts.len() {
        0 => Err(Error::invalid_argument(
            "value",
            format!("{} requires at least one value", operator),
        )),
        1 => Ok(parts.remove(0)),
        _ => Ok(format!("({})", parts.join(" OR "))),
    }
}

fn compile_order_rule(rule: &OrderRule, field_map: &FieldMap) -> String {
    let direction = if rule.ascending { "ASC" } else { "DESC" };
    format!("{} {}", field_map.column(&rule.field), direction)
}

fn where_clause(conditions: &[Condition], field_map: &FieldMap) -> Result<String> {
    let parts = conditions
        .iter()
        .map(|c| compile_condition(c, field_map))
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join(" AND "))
}

/// Render a value as a MySQL literal.
///
/// Booleans become `1`/`0` and `None`/null becomes `NULL`; strings are quoted and
/// escaped the way the MySQL client libraries escape them.
pub fn literal(value: &Value) -> Result<String> {
    let text = match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::I32(i) => i.to_string(),
        Value::I64(i) => i.to_string(),
        Value::U64(u) => u.to_string(),
        Value::F32(f) if f.is_finite() => f.to_string(),
        Value::F64(f) if f.is_finite() => f.to_string(),
        Value::F32(_) | Value::F64(_) => "NULL".to_string(),
        Value::String(s) => quote(s),
        #[cfg(feature = "datetime-support")]
        Value::DateTime(dt) => quote(&dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        #[cfg(feature = "decimal-support")]
        Value::Decimal(d) => d.to_string(),
        #[cfg(feature = "uuid-support")]
        Value::Uuid(u) => quote(&u.hyphenated().to_string()),
        Value::Json(j) => quote(&j.to_string()),
        Value::Array(_) => {
            return Err(Error::invalid_argument(
                "value",
                "arrays are only allowed with IN and NOT IN",
            ))
        }
    };
    Ok(text)
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn require_name<'a>(value: &'a str, name: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_argument(name, "must be a non-empty string"));
    }
    Ok(trimmed)
}

fn require_object(object: &Record) -> Result<()> {
    if object.is_empty() {
        return Err(Error::invalid_argument(
            "object",
            "must be an object with at least one property",
        ));
    }
    Ok(())
}

fn require_conditions(conditions: &[Condition]) -> Result<()> {
    if conditions.is_empty() {
        return Err(Error::invalid_argument(
            "where",
            "must contain at least one condition",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::op;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn object(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn users_map() -> FieldMap {
        FieldMap::from([
            ("id", "user_id"),
            ("name", "user_name"),
            ("isActive", "user_is_active"),
        ])
    }

    fn assert_invalid(result: Result<String>, expected: &str) {
        match result {
            Err(Error::InvalidArgument { name, .. }) => assert_eq!(name, expected),
            other => panic!("expected InvalidArgument({}), got {:?}", expected, other),
        }
    }

    #[test]
    fn test_select_end_to_end() {
        let sql = compile_select(
            &fields(&["id", "name"]),
            "users",
            &[Condition::eq("name", "John")],
            &[OrderRule::asc("name")],
            &FieldMap::new(),
        )
        .unwrap();
        assert_eq!(
            sql,
            "SELECT id, name FROM users WHERE name = 'John' ORDER BY name ASC"
        );
    }

    #[test]
    fn test_select_all_without_clauses() {
        let sql = compile_select(&[], "users", &[], &[], &FieldMap::new()).unwrap();
        assert_eq!(sql, "SELECT * FROM users");
    }

    #[test]
    fn test_select_maps_every_field_reference() {
        let sql = compile_select(
            &fields(&["id", "name", "email"]),
            "users",
            &[
                Condition::new("id", op::GT, 10),
                Condition::new("name", op::LIKE, "A%"),
            ],
            &[OrderRule::desc("name"), OrderRule::asc("id")],
            &users_map(),
        )
        .unwrap();
        assert_eq!(
            sql,
            "SELECT user_id, user_name, email FROM users \
             WHERE user_id > 10 AND user_name LIKE 'A%' \
             ORDER BY user_name DESC, user_id ASC"
        );
    }

    #[test]
    fn test_select_requires_table() {
        assert_invalid(compile_select(&[], "", &[], &[], &FieldMap::new()), "table");
        assert_invalid(compile_select(&[], "   ", &[], &[], &FieldMap::new()), "table");
    }

    #[test]
    fn test_insert() {
        let sql = compile_insert(
            "users",
            &object(&[("name", "Adam".into()), ("age", 30.into())]),
            &users_map(),
        )
        .unwrap();
        assert_eq!(sql, "INSERT INTO users (user_name, age) VALUES ('Adam', 30)");
    }

    #[test]
    fn test_insert_boolean_and_null_literals() {
        let sql = compile_insert(
            "t",
            &object(&[("a", true.into()), ("b", false.into()), ("c", Value::Null)]),
            &FieldMap::new(),
        )
        .unwrap();
        assert_eq!(sql, "INSERT INTO t (a, b, c) VALUES (1, 0, NULL)");
        assert!(!sql.contains("true"));
        assert!(!sql.contains("false"));
    }

    #[test]
    fn test_insert_validation() {
        assert_invalid(
            compile_insert("", &object(&[("a", 1.into())]), &FieldMap::new()),
            "table",
        );
        assert_invalid(compile_insert("t", &Record::new(), &FieldMap::new()), "object");
    }

    #[test]
    fn test_update() {
        let sql = compile_update(
            "users",
            &object(&[("name", "Ewa".into()), ("isActive", true.into())]),
            &[Condition::eq("id", 3)],
            &users_map(),
        )
        .unwrap();
        assert_eq!(
            sql,
            "UPDATE users SET user_name = 'Ewa', user_is_active = 1 WHERE user_id = 3"
        );
    }

    #[test]
    fn test_update_validation() {
        let obj = object(&[("name", "Ewa".into())]);
        let cond = [Condition::eq("id", 3)];
        assert_invalid(compile_update("", &obj, &cond, &FieldMap::new()), "table");
        assert_invalid(
            compile_update("users", &Record::new(), &cond, &FieldMap::new()),
            "object",
        );
        assert_invalid(compile_update("users", &obj, &[], &FieldMap::new()), "where");
    }

    #[test]
    fn test_delete() {
        let sql = compile_delete(
            "users",
            &[Condition::eq("id", 3), Condition::new("name", op::NEQ, "root")],
            &users_map(),
        )
        .unwrap();
        assert_eq!(
            sql,
            "DELETE FROM users WHERE user_id = 3 AND user_name <> 'root'"
        );
        assert_invalid(compile_delete("users", &[], &FieldMap::new()), "where");
        assert_invalid(
            compile_delete("", &[Condition::eq("id", 3)], &FieldMap::new()),
            "table",
        );
    }

    #[test]
    fn test_deactivate() {
        let cond = [Condition::eq("id", 3)];
        let sql = compile_deactivate("users", &cond, &users_map()).unwrap();
        assert_eq!(sql, "UPDATE users SET user_is_active = 0 WHERE user_id = 3");

        let sql = compile_deactivate("users", &cond, &FieldMap::new()).unwrap();
        assert_eq!(sql, "UPDATE users SET is_active = 0 WHERE id = 3");

        assert_invalid(compile_deactivate("users", &[], &FieldMap::new()), "where");
    }

    #[test]
    fn test_call_procedure() {
        assert_eq!(compile_call_procedure("sp_get", None).unwrap(), "CALL sp_get()");
        assert_eq!(
            compile_call_procedure("sp_get", Some(&Value::Array(vec![]))).unwrap(),
            "CALL sp_get()"
        );
        assert_eq!(
            compile_call_procedure("sp_get", Some(&Value::from(5))).unwrap(),
            "CALL sp_get(5)"
        );
        assert_eq!(
            compile_call_procedure(
                "sp_get",
                Some(&Value::Array(vec![
                    "a".into(),
                    1.into(),
                    true.into(),
                    false.into(),
                    Value::Null
                ]))
            )
            .unwrap(),
            "CALL sp_get('a', 1, 1, 0, NULL)"
        );
    }

    #[test]
    fn test_call_procedure_validation() {
        assert_invalid(compile_call_procedure("", None), "name");
        assert_invalid(
            compile_call_procedure(
                "sp_get",
                Some(&Value::Array(vec![Value::from(vec![1, 2])])),
            ),
            "array",
        );
        assert_invalid(
            compile_call_procedure("sp_get", Some(&Value::Json(serde_json::json!({"a": 1})))),
            "array",
        );
    }

    #[test]
    fn test_condition_null_handling() {
        let map = FieldMap::new();
        let compile = |operator: Operator| compile_condition(&Condition::new("a", operator, ()), &map).unwrap();
        assert_eq!(compile(op::EQ), "a IS NULL");
        assert_eq!(compile(op::NEQ), "a IS NOT NULL");
        assert_eq!(compile(op::NOT_LIKE), "a IS NOT NULL");
        assert_eq!(compile(op::LIKE), "a IS NULL");
        assert_eq!(compile(op::GT), "a IS NULL");
        assert_eq!(compile(op::IN), "a IS NULL");
        assert_eq!(compile(op::NOT_IN), "a IS NOT NULL");
    }

    #[test]
    fn test_in_deduplicates() {
        let map = FieldMap::new();
        let with_duplicates =
            compile_condition(&Condition::new("a", op::IN, vec![1, 1, 2]), &map).unwrap();
        let without = compile_condition(&Condition::new("a", op::IN, vec![1, 2]), &map).unwrap();
        assert_eq!(with_duplicates, without);
        assert_eq!(without, "a IN (1, 2)");
    }

    #[test]
    fn test_in_splits_null() {
        let map = FieldMap::new();
        let values = Value::from(vec![Some(1), Some(2), None]);

        let sql = compile_condition(&Condition::new("a", op::IN, values.clone()), &map).unwrap();
        assert_eq!(sql, "(a IN (1, 2) OR a IS NULL)");

        let sql = compile_condition(&Condition::new("a", op::NOT_IN, values), &map).unwrap();
        assert_eq!(sql, "(a NOT IN (1, 2) OR a IS NOT NULL)");

        let only_null = Value::from(vec![None::<i32>, None]);
        let sql = compile_condition(&Condition::new("a", op::IN, only_null), &map).unwrap();
        assert_eq!(sql, "a IS NULL");
    }

    #[test]
    fn test_in_single_primitive() {
        let sql =
            compile_condition(&Condition::new("name", op::IN, "x"), &users_map()).unwrap();
        assert_eq!(sql, "user_name IN ('x')");
    }

    #[test]
    fn test_in_rejects_invalid_values() {
        let map = FieldMap::new();
        let nested = Value::Array(vec![Value::from(vec![1])]);
        assert!(matches!(
            compile_condition(&Condition::new("a", op::IN, nested), &map),
            Err(Error::InvalidArgument { ref name, .. }) if name == "value"
        ));

        let empty = Value::Array(Vec::new());
        assert!(matches!(
            compile_condition(&Condition::new("a", op::NOT_IN, empty), &map),
            Err(Error::InvalidArgument { ref name, .. }) if name == "value"
        ));

        let json = Value::Json(serde_json::json!({"a": 1}));
        assert!(compile_condition(&Condition::new("a", op::IN, json), &map).is_err());
    }

    #[test]
    fn test_array_outside_in_is_rejected() {
        let result = compile_condition(&Condition::new("a", op::EQ, vec![1, 2]), &FieldMap::new());
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn test_literal_escaping() {
        assert_eq!(literal(&"O'Brien".into()).unwrap(), "'O\\'Brien'");
        assert_eq!(literal(&"a\\b".into()).unwrap(), "'a\\\\b'");
        assert_eq!(literal(&"line\nbreak".into()).unwrap(), "'line\\nbreak'");
        assert_eq!(literal(&"\"q\"".into()).unwrap(), "'\\\"q\\\"'");
        assert_eq!(literal(&Value::F64(1.5)).unwrap(), "1.5");
        assert_eq!(literal(&Value::F64(f64::NAN)).unwrap(), "NULL");
        assert_eq!(literal(&Value::U64(u64::MAX)).unwrap(), u64::MAX.to_string());
    }

    #[test]
    fn test_field_map_isolation_between_calls() {
        // the map of one call must not leak into the next
        let mapped = compile_delete("users", &[Condition::eq("id", 1)], &users_map()).unwrap();
        let plain = compile_delete("users", &[Condition::eq("id", 1)], &FieldMap::new()).unwrap();
        assert_eq!(mapped, "DELETE FROM users WHERE user_id = 1");
        assert_eq!(plain, "DELETE FROM users WHERE id = 1");
    }
}
