//! Reference SQLite backend on `rusqlite`.
//!
//! In-memory databases live as long as their [`SqliteBackend`]; every
//! connection handed out shares the one underlying handle. File databases
//! open a fresh handle per connection.

use crate::{
    backend::{Backend, Connection, DatabaseType, Dialect},
    config::{BackendConfig, ConfigError},
    error::BackendExecutionError,
    statement::DboCommand,
    value::{RowDictionary, Value, format_datetime},
};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use std::{
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};

type SharedHandle = Arc<Mutex<rusqlite::Connection>>;

#[derive(Clone, Debug)]
enum Target {
    File(PathBuf),
    Memory(SharedHandle),
}

///
/// SqliteBackend
///

#[derive(Clone, Debug)]
pub struct SqliteBackend {
    target: Target,
}

impl SqliteBackend {
    /// Backend over a database file, created on first open.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            target: Target::File(path.into()),
        }
    }

    /// Private in-memory database.
    pub fn in_memory() -> Result<Self, BackendExecutionError> {
        let handle = rusqlite::Connection::open_in_memory().map_err(sqlite_error("open"))?;

        Ok(Self {
            target: Target::Memory(Arc::new(Mutex::new(handle))),
        })
    }

    /// Build from a config entry; `:memory:` selects an in-memory database,
    /// otherwise `Data Source=` (or the whole string) names the file.
    pub fn from_config(config: &BackendConfig) -> Result<Self, ConfigError> {
        config.expect_database(DatabaseType::Sqlite)?;

        let source = config
            .connection_value("data source")
            .unwrap_or_else(|| config.connection_string.trim());
        if source == ":memory:" {
            return Ok(Self::in_memory()?);
        }

        Ok(Self::open(source))
    }
}

impl Backend for SqliteBackend {
    fn dialect(&self) -> Dialect {
        Dialect::SQLITE
    }

    fn connect(&self) -> Result<Box<dyn Connection>, BackendExecutionError> {
        Ok(Box::new(SqliteConnection {
            target: self.target.clone(),
            live: None,
        }))
    }
}

///
/// SqliteConnection
///

struct SqliteConnection {
    target: Target,
    live: Option<SharedHandle>,
}

impl SqliteConnection {
    fn with_handle<R>(
        &self,
        context: &'static str,
        f: impl FnOnce(&rusqlite::Connection) -> rusqlite::Result<R>,
    ) -> Result<R, BackendExecutionError> {
        let handle = self
            .live
            .as_ref()
            .ok_or_else(|| BackendExecutionError::new(context, "connection is not open"))?;
        let guard = handle.lock().unwrap_or_else(PoisonError::into_inner);

        f(&guard).map_err(sqlite_error(context))
    }
}

impl Connection for SqliteConnection {
    fn open(&mut self) -> Result<(), BackendExecutionError> {
        let handle = match &self.target {
            Target::Memory(shared) => Arc::clone(shared),
            Target::File(path) => {
                let handle = rusqlite::Connection::open(path).map_err(sqlite_error("open"))?;
                Arc::new(Mutex::new(handle))
            }
        };
        self.live = Some(handle);

        Ok(())
    }

    fn close(&mut self) -> Result<(), BackendExecutionError> {
        self.live = None;

        Ok(())
    }

    fn execute(&mut self, command: &DboCommand) -> Result<i64, BackendExecutionError> {
        self.with_handle("execute", |conn| {
            let changed = prepare(conn, command)?.raw_execute()?;

            Ok(i64::try_from(changed).unwrap_or(i64::MAX))
        })
    }

    fn execute_scalar(&mut self, command: &DboCommand) -> Result<Value, BackendExecutionError> {
        self.with_handle("execute scalar", |conn| scalar(conn, command))
    }

    fn execute_reader(
        &mut self,
        command: &DboCommand,
    ) -> Result<Vec<RowDictionary>, BackendExecutionError> {
        self.with_handle("execute reader", |conn| {
            let mut stmt = prepare(conn, command)?;
            let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

            let mut out = Vec::new();
            let mut rows = stmt.raw_query();
            while let Some(row) = rows.next()? {
                let mut dict = RowDictionary::new();
                for (index, name) in names.iter().enumerate() {
                    dict.push_column(name.as_str(), from_sql(row.get_ref(index)?));
                }
                out.push(dict);
            }

            Ok(out)
        })
    }

    // rusqlite prepares one statement at a time, so the identity read runs
    // separately while the handle stays locked
    fn insert_returning_identity(
        &mut self,
        command: &DboCommand,
        last_identity: &str,
    ) -> Result<Value, BackendExecutionError> {
        self.with_handle("insert", |conn| {
            prepare(conn, command)?.raw_execute()?;

            scalar(conn, &command.with_text(last_identity))
        })
    }

    fn table_exists(&mut self, table: &str) -> Result<bool, BackendExecutionError> {
        self.with_handle("table exists", |conn| {
            let count: i64 = conn.query_row(
                "select count(0) from sqlite_master where type = 'table' and name = ?1",
                [table],
                |row| row.get(0),
            )?;

            Ok(count > 0)
        })
    }
}

// Bind every name the statement references; unreferenced bindings are ignored.
fn prepare<'c>(
    conn: &'c rusqlite::Connection,
    command: &DboCommand,
) -> rusqlite::Result<rusqlite::Statement<'c>> {
    let mut stmt = conn.prepare(command.text())?;
    for (name, value) in command.bindings() {
        if let Some(index) = stmt.parameter_index(&format!("@{name}"))? {
            stmt.raw_bind_parameter(index, value)?;
        }
    }

    Ok(stmt)
}

fn scalar(conn: &rusqlite::Connection, command: &DboCommand) -> rusqlite::Result<Value> {
    let mut stmt = prepare(conn, command)?;
    let mut rows = stmt.raw_query();

    let value = match rows.next()? {
        Some(row) => from_sql(row.get_ref(0)?),
        None => Value::Null,
    };

    Ok(value)
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Int(v),
        ValueRef::Real(v) => Value::Float(v),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

fn sqlite_error(context: &'static str) -> impl Fn(rusqlite::Error) -> BackendExecutionError {
    move |err| BackendExecutionError::new(context, err.to_string())
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(SqlValue::Null),
            Self::Bool(v) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*v))),
            Self::Int(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Self::Float(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Self::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Self::Blob(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
            Self::DateTime(dt) => ToSqlOutput::Owned(SqlValue::Text(format_datetime(dt))),
        })
    }
}
