//! Common types and traits shared across all action builders

use std::collections::HashMap;

use crate::fields::FieldMap;
use crate::response::OperationKind;
use crate::value::Record;
use crate::{IntoOperator, Operator, Result, Value};

/// Core trait for all action builders
pub trait QueryBuilder {
    /// Kind of statement the builder produces
    fn kind(&self) -> OperationKind;

    /// Validate the accumulated state and compile it with `field_map`
    fn to_sql(&self, field_map: &FieldMap) -> Result<String>;
}

/// A WHERE condition: `field operator value`
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: impl IntoOperator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator: operator.into_operator(),
            value: value.into(),
        }
    }

    /// Shorthand for an equality condition
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::EQ, value)
    }
}

/// Trait for conditions that can be used in WHERE clauses
pub trait IntoCondition {
    fn into_condition(self) -> Condition;
}

impl IntoCondition for Condition {
    fn into_condition(self) -> Condition {
        self
    }
}

// Shorthand equality: where_(("age", 18))
impl<T> IntoCondition for (&str, T)
where
    T: Into<Value>,
{
    fn into_condition(self) -> Condition {
        Condition::new(self.0, Operator::EQ, self.1)
    }
}

// Explicit operators: where_(("age", op::GT, 18)) or where_(("age", ">", 18))
impl<T, O> IntoCondition for (&str, O, T)
where
    T: Into<Value>,
    O: IntoOperator,
{
    fn into_condition(self) -> Condition {
        Condition::new(self.0, self.1, self.2)
    }
}

/// An ORDER BY rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRule {
    pub field: String,
    pub ascending: bool,
}

impl OrderRule {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

/// Trait to convert various types into a list of field names
pub trait IntoFields {
    fn into_fields(self) -> Vec<String>;
}

impl IntoFields for &str {
    fn into_fields(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoFields for String {
    fn into_fields(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoFields for Vec<String> {
    fn into_fields(self) -> Vec<String> {
        self
    }
}

impl IntoFields for Vec<&str> {
    fn into_fields(self) -> Vec<String> {
        self.into_iter().map(|s| s.to_string()).collect()
    }
}

impl<const N: usize> IntoFields for [&str; N] {
    fn into_fields(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl IntoFields for (&str, &str) {
    fn into_fields(self) -> Vec<String> {
        vec![self.0.to_string(), self.1.to_string()]
    }
}

impl IntoFields for (&str, &str, &str) {
    fn into_fields(self) -> Vec<String> {
        vec![self.0.to_string(), self.1.to_string(), self.2.to_string()]
    }
}

impl IntoFields for (&str, &str, &str, &str) {
    fn into_fields(self) -> Vec<String> {
        vec![
            self.0.to_string(),
            self.1.to_string(),
            self.2.to_string(),
            self.3.to_string(),
        ]
    }
}

/// Trait for the property/value objects written by INSERT and UPDATE
pub trait IntoRecord {
    fn into_record(self) -> Record;
}

impl IntoRecord for Record {
    fn into_record(self) -> Record {
        self
    }
}

impl IntoRecord for HashMap<String, Value> {
    fn into_record(self) -> Record {
        self.into_iter().collect()
    }
}

impl<K, V> IntoRecord for Vec<(K, V)>
where
    K: Into<String>,
    V: Into<Value>,
{
    fn into_record(self) -> Record {
        self.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
    }
}

impl<K, V, const N: usize> IntoRecord for [(K, V); N]
where
    K: Into<String>,
    V: Into<Value>,
{
    fn into_record(self) -> Record {
        self.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
    }
}

// Only objects carry properties; any other JSON yields an empty record.
impl IntoRecord for serde_json::Value {
    fn into_record(self) -> Record {
        match self {
            serde_json::Value::Object(object) => object
                .iter()
                .map(|(k, v)| (k.clone(), Value::from_json(v)))
                .collect(),
            _ => Record::new(),
        }
    }
}
