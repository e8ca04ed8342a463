//! Entry point binding a connection and an optional field registry to the builders

use std::borrow::Cow;

use tracing::trace;

use crate::builder::{Delete, Insert, Proc, Select, Update};
use crate::config::ConnectionConfig;
use crate::executor::Driver;
use crate::fields::{FieldMap, FieldRegistry};
use crate::response::{build_envelope, Envelope, OperationKind};
use crate::Result;

/// Creates action builders that execute against one connection.
///
/// # Examples
/// ```no_run
/// # #[cfg(feature = "mysql")]
/// # async fn demo() -> rowset_core::Result<()> {
/// use rowset_core::{ConnectionConfig, Db};
///
/// let db = Db::mysql(ConnectionConfig::new("localhost", "app", "secret", "shop"));
/// let envelope = db
///     .select()
///     .from("users")
///     .fields(("id", "name"))
///     .where_(("name", "John"))
///     .execute(None)
///     .await?;
/// println!("{:?}", envelope.rows());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Db<D: Driver> {
    config: ConnectionConfig,
    driver: D,
    registry: Option<FieldRegistry>,
}

impl<D: Driver> Db<D> {
    pub fn new(config: ConnectionConfig, driver: D) -> Self {
        Self {
            config,
            driver,
            registry: None,
        }
    }

    /// Resolve field maps from `registry` whenever `execute` gets none.
    pub fn with_registry(mut self, registry: FieldRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn registry(&self) -> Option<&FieldRegistry> {
        self.registry.as_ref()
    }

    pub fn select(&self) -> Select<'_, D> {
        Select::new(self)
    }

    pub fn insert(&self) -> Insert<'_, D> {
        Insert::new(self)
    }

    pub fn update(&self) -> Update<'_, D> {
        Update::new(self)
    }

    pub fn delete(&self) -> Delete<'_, D> {
        Delete::new(self)
    }

    pub fn proc(&self) -> Proc<'_, D> {
        Proc::new(self)
    }

    /// The explicit map, else the registered map of `table`, else an empty one.
    pub(crate) fn field_map_for<'a>(
        &'a self,
        table: &str,
        explicit: Option<&'a FieldMap>,
    ) -> Cow<'a, FieldMap> {
        explicit
            .or_else(|| self.registry.as_ref().and_then(|r| r.field_map(table)))
            .map(Cow::Borrowed)
            .unwrap_or_default()
    }

    /// Send `sql` to the driver and normalize what comes back.
    pub(crate) async fn run(&self, sql: &str, kind: OperationKind) -> Result<Envelope> {
        let raw = self.driver.execute(&self.config, sql).await?;
        trace!(%kind, "driver returned");
        build_envelope(&raw, kind)
    }
}

#[cfg(feature = "mysql")]
impl Db<crate::executor::MySqlDriver> {
    /// Facade over the bundled sqlx MySQL driver
    pub fn mysql(config: ConnectionConfig) -> Self {
        Self::new(config, crate::executor::MySqlDriver::new())
    }
}
