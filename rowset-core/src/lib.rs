//! Rowset Core - a fluent MySQL statement builder with normalized responses
//!
//! Builders compile SELECT, INSERT, UPDATE, DELETE and CALL statements with
//! inlined, escaped literals and run them through a [`Driver`]. Every result,
//! whatever the statement, comes back as one [`Envelope`]:
//!
//! ```text
//! { affectedRows, changedRows, insertId, items: { <recordset name>: [rows] } }
//! ```
//!
//! Property names can be translated to column names with a [`FieldMap`],
//! given per call or looked up in a [`FieldRegistry`] bound to the [`Db`].

pub mod builder;
pub mod compiler;
pub mod config;
pub mod db;
pub mod error;
pub mod executor;
pub mod fields;
pub mod mapper;
pub mod operator;
pub mod response;
pub mod value;

// Re-export main types
pub use builder::{
    Condition, Delete, Insert, IntoCondition, IntoFields, IntoRecord, OrderRule, Proc,
    QueryBuilder, Select, Update,
};
pub use config::ConnectionConfig;
pub use db::Db;
pub use error::{Error, Result};
pub use executor::Driver;
#[cfg(feature = "mysql")]
pub use executor::MySqlDriver;
pub use fields::{FieldMap, FieldRegistry, MultiFieldMap};
pub use operator::{op, IntoOperator, Operator};
pub use response::{Envelope, OperationKind};
pub use value::{MultiRecordSet, Record, RecordSet, Value};
