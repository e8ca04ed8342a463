//! Driver interface and result assembly

use std::future::Future;

use serde_json::Value as JsonValue;

use crate::config::ConnectionConfig;
use crate::response::{OperationKind, ResultHeader};
use crate::Result;

/// The database driver the builders hand compiled statements to.
///
/// Implementations return the raw result shapes understood by
/// [`crate::response::build_envelope`]: a header object for writes, a row
/// array for queries and `[rows.., header]` for procedure calls. Failures must
/// be reported as [`crate::Error::Connection`] or [`crate::Error::Statement`].
pub trait Driver: Send + Sync {
    /// Execute one SQL statement
    fn execute(
        &self,
        config: &ConnectionConfig,
        sql: &str,
    ) -> impl Future<Output = Result<JsonValue>> + Send;
}

/// One item of a driver's result stream
#[derive(Debug, Clone, PartialEq)]
pub enum ResultEvent {
    /// A row of the current result set, as a JSON object
    Row(JsonValue),
    /// End of a result set or of the whole statement
    Done { affected_rows: u64, insert_id: u64 },
}

/// Fold a stream of row and completion events into the raw result shape for `kind`.
pub fn assemble(kind: OperationKind, events: Vec<ResultEvent>) -> JsonValue {
    let mut segments: Vec<Vec<JsonValue>> = Vec::new();
    let mut current = Vec::new();
    let mut header = ResultHeader::default();

    for event in events {
        match event {
            ResultEvent::Row(row) => current.push(row),
            ResultEvent::Done {
                affected_rows,
                insert_id,
            } => {
                segments.push(std::mem::take(&mut current));
                header = ResultHeader {
                    affected_rows,
                    insert_id,
                    info: String::new(),
                };
            }
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }

    let has_rows = segments.iter().any(|rows| !rows.is_empty());
    match kind {
        OperationKind::Select => first_segment(segments),
        OperationKind::Unknown if has_rows => first_segment(segments),
        OperationKind::Proc => {
            // the last completion closes the call itself, not a result set
            segments.pop();
            let mut packet: Vec<JsonValue> = segments.into_iter().map(JsonValue::Array).collect();
            packet.push(header.to_json());
            JsonValue::Array(packet)
        }
        _ => header.to_json(),
    }
}

fn first_segment(segments: Vec<Vec<JsonValue>>) -> JsonValue {
    JsonValue::Array(segments.into_iter().next().unwrap_or_default())
}

#[cfg(feature = "mysql")]
pub use mysql::MySqlDriver;

/// sqlx-backed MySQL driver
#[cfg(feature = "mysql")]
pub mod mysql {
    use futures::TryStreamExt;
    use serde_json::{Map, Value as JsonValue};
    use sqlx::mysql::{MySqlConnection, MySqlRow};
    use sqlx::{Column, Connection, Either, Executor, Row, TypeInfo, ValueRef};
    use tracing::{debug, trace};

    use super::{assemble, Driver, ResultEvent};
    use crate::config::ConnectionConfig;
    use crate::response::OperationKind;
    use crate::{Error, Result};

    /// Opens one connection per statement and closes it afterwards.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct MySqlDriver;

    impl MySqlDriver {
        pub fn new() -> Self {
            Self
        }
    }

    impl Driver for MySqlDriver {
        async fn execute(&self, config: &ConnectionConfig, sql: &str) -> Result<JsonValue> {
            trace!(host = %config.host, database = %config.database, "connecting");
            let mut conn = MySqlConnection::connect_with(&config.connect_options())
                .await
                .map_err(Error::connection)?;

            let events = collect_events(&mut conn, sql).await;

            if let Err(e) = conn.close().await {
                debug!(error = %e, "failed to close connection");
            }

            Ok(assemble(OperationKind::from_sql(sql), events?))
        }
    }

    async fn collect_events(conn: &mut MySqlConnection, sql: &str) -> Result<Vec<ResultEvent>> {
        let mut events = Vec::new();
        let mut stream = (&mut *conn).fetch_many(sql);

        while let Some(item) = stream.try_next().await.map_err(Error::statement)? {
            match item {
                Either::Left(done) => events.push(ResultEvent::Done {
                    affected_rows: done.rows_affected(),
                    insert_id: done.last_insert_id(),
                }),
                Either::Right(row) => events.push(ResultEvent::Row(row_to_json(&row)?)),
            }
        }

        Ok(events)
    }

    fn row_to_json(row: &MySqlRow) -> Result<JsonValue> {
        let mut object = Map::with_capacity(row.columns().len());
        for column in row.columns() {
            let index = column.ordinal();
            let value = column_to_json(row, index, column.type_info().name())?;
            object.insert(column.name().to_string(), value);
        }
        Ok(JsonValue::Object(object))
    }

    // Statements without arguments run over the text protocol, so every
    // non-numeric column can be read back as its textual form.
    fn column_to_json(row: &MySqlRow, index: usize, type_name: &str) -> Result<JsonValue> {
        let raw = row.try_get_raw(index).map_err(Error::statement)?;
        if raw.is_null() {
            return Ok(JsonValue::Null);
        }

        let value = match type_name {
            "BOOLEAN" => JsonValue::from(row.try_get::<bool, _>(index).map_err(Error::statement)?),
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                JsonValue::from(row.try_get::<i64, _>(index).map_err(Error::statement)?)
            }
            "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
            | "BIGINT UNSIGNED" => {
                JsonValue::from(row.try_get::<u64, _>(index).map_err(Error::statement)?)
            }
            "FLOAT" => JsonValue::from(row.try_get::<f32, _>(index).map_err(Error::statement)? as f64),
            "DOUBLE" => JsonValue::from(row.try_get::<f64, _>(index).map_err(Error::statement)?),
            "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
                let bytes = row
                    .try_get_unchecked::<Vec<u8>, _>(index)
                    .map_err(Error::statement)?;
                JsonValue::from(String::from_utf8_lossy(&bytes).into_owned())
            }
            _ => JsonValue::from(
                row.try_get_unchecked::<String, _>(index)
                    .map_err(Error::statement)?,
            ),
        };
        Ok(value)
    }
}
