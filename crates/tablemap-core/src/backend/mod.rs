//! Backend contract: connections, dialects, and the named backend registry.
//!
//! A [`Backend`] hands out connections; a [`ConnectionScope`] owns one for
//! exactly one public session operation and closes it on every exit path.

mod dialect;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use dialect::{DatabaseType, Dialect};

use crate::{
    error::{BackendExecutionError, SchemaError},
    statement::DboCommand,
    value::{RowDictionary, Value},
};
use std::{
    collections::HashMap,
    fmt,
    ops::{Deref, DerefMut},
    sync::Arc,
};

///
/// Connection
///
/// One live database connection. Parameter names in a [`DboCommand`] are
/// bare; implementations bind only the names the statement text references,
/// prefixed with their dialect marker, and ignore the rest.
///

pub trait Connection: Send {
    fn open(&mut self) -> Result<(), BackendExecutionError>;

    fn close(&mut self) -> Result<(), BackendExecutionError>;

    /// Run a statement and return the number of affected rows.
    fn execute(&mut self, command: &DboCommand) -> Result<i64, BackendExecutionError>;

    /// First column of the first row, or `Value::Null` when nothing came back.
    fn execute_scalar(&mut self, command: &DboCommand) -> Result<Value, BackendExecutionError>;

    fn execute_reader(
        &mut self,
        command: &DboCommand,
    ) -> Result<Vec<RowDictionary>, BackendExecutionError>;

    /// Insert and read back the backend-assigned identity as one unit.
    fn insert_returning_identity(
        &mut self,
        command: &DboCommand,
        last_identity: &str,
    ) -> Result<Value, BackendExecutionError> {
        let combined = command.with_text(format!("{}\n{last_identity}", command.text()));

        self.execute_scalar(&combined)
    }

    fn table_exists(&mut self, _table: &str) -> Result<bool, BackendExecutionError> {
        Ok(false)
    }
}

///
/// Backend
///
/// Connection factory bound to one dialect.
///

pub trait Backend: Send + Sync {
    fn dialect(&self) -> Dialect;

    fn connect(&self) -> Result<Box<dyn Connection>, BackendExecutionError>;
}

///
/// ConnectionScope
///
/// Opened connection that closes itself when dropped.
///

pub struct ConnectionScope {
    backend: String,
    connection: Box<dyn Connection>,
}

impl ConnectionScope {
    pub fn acquire(name: &str, backend: &dyn Backend) -> Result<Self, BackendExecutionError> {
        let mut connection = backend.connect().map_err(|err| err.with_context("connect"))?;
        connection.open().map_err(|err| err.with_context("open"))?;

        Ok(Self {
            backend: name.to_string(),
            connection,
        })
    }
}

impl Deref for ConnectionScope {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.connection.as_ref()
    }
}

impl DerefMut for ConnectionScope {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection.as_mut()
    }
}

impl Drop for ConnectionScope {
    fn drop(&mut self) {
        if let Err(err) = self.connection.close() {
            tracing::warn!(backend = %self.backend, error = %err, "connection close failed");
        }
    }
}

///
/// BackendRegistry
///
/// Named backends available to a session.
///

#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn Backend>>,
}

impl BackendRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate registered backend names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        backend: impl Backend + 'static,
    ) -> Result<(), SchemaError> {
        self.register_shared(name, Arc::new(backend))
    }

    pub fn register_shared(
        &mut self,
        name: impl Into<String>,
        backend: Arc<dyn Backend>,
    ) -> Result<(), SchemaError> {
        let name = name.into();
        if self.backends.contains_key(&name) {
            return Err(SchemaError::BackendAlreadyRegistered(name));
        }
        self.backends.insert(name, backend);

        Ok(())
    }

    pub fn try_get(&self, name: &str) -> Result<Arc<dyn Backend>, SchemaError> {
        self.backends
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::BackendNotFound(name.to_string()))
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();

        f.debug_struct("BackendRegistry")
            .field("backends", &names)
            .finish()
    }
}
