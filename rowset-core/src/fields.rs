//! Property-to-column name maps and the per-table structure registry

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Maps domain property names (`userName`) to database column names (`user_name`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(IndexMap<String, String>);

/// Field maps keyed by recordset name.
pub type MultiFieldMap = IndexMap<String, FieldMap>;

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, property: impl Into<String>, column: impl Into<String>) -> &mut Self {
        self.0.insert(property.into(), column.into());
        self
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.0.get(property).map(String::as_str)
    }

    /// Column for `property`, or `property` itself when unmapped.
    pub fn column<'a>(&'a self, property: &'a str) -> &'a str {
        self.get(property).unwrap_or(property)
    }

    /// Column-to-property map. When two properties share a column the later one wins.
    pub fn invert(&self) -> FieldMap {
        self.0
            .iter()
            .map(|(property, column)| (column.clone(), property.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for FieldMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        FieldMap(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for FieldMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Structure of one table as stored in the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    #[serde(rename = "fieldsMap", default)]
    pub fields_map: FieldMap,
}

/// Registry of table structures, used to resolve field maps by table name.
///
/// Loaded from JSON shaped like `{ "users": { "fieldsMap": { "userName": "user_name" } } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldRegistry {
    tables: IndexMap<String, TableDefinition>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_table(mut self, name: impl Into<String>, fields_map: FieldMap) -> Self {
        self.tables
            .insert(name.into(), TableDefinition { fields_map });
        self
    }

    pub fn field_map(&self, table: &str) -> Option<&FieldMap> {
        self.tables.get(table).map(|t| &t.fields_map)
    }

    /// Column name of `property` in `table`, if both are registered.
    pub fn field_name(&self, table: &str, property: &str) -> Option<&str> {
        self.field_map(table).and_then(|m| m.get(property))
    }

    /// Field maps for the given recordset names; unregistered names are skipped.
    pub fn multi_field_map<'a, I>(&self, names: I) -> MultiFieldMap
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter_map(|name| {
                self.field_map(name)
                    .map(|map| (name.to_string(), map.clone()))
            })
            .collect()
    }
}
