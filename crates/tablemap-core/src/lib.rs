//! Core runtime for tablemap: values, table metadata, the predicate compiler,
//! statement rendering, row materialization, and the session facade.
#![warn(unreachable_pub)]

extern crate self as tablemap;

// public exports are one module level down
pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod hooks;
pub mod materialize;
pub mod model;
pub mod obs;
pub mod query;
pub mod response;
pub mod session;
pub mod statement;
pub mod traits;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

pub use error::OrmError;

///
/// CONSTANTS
///

/// Canonical text layout for datetime parameters and stored datetime text.
///
/// Seven fractional digits keep 100ns precision intact across backends that
/// parse datetimes from text.
pub const DATETIME_FORMAT: &str = "yyyy-MM-dd HH:mm:ss.fffffff";

/// Column alias used by count statements.
pub const COUNT_ALIAS: &str = "tt";

/// Name of the backend a table binds to when it does not name one.
pub const DEFAULT_BACKEND: &str = "default";

///
/// Prelude
///
/// Domain vocabulary only: entities, predicates, values, and the session.
///

pub mod prelude {
    pub use crate::{
        backend::BackendRegistry,
        hooks::{FireEvent, LifecycleObserver, RecordChange},
        query::{Association, Column, Expr, Predicate},
        response::{CrudReturn, CrudStatus},
        session::{DbSession, DeleteOptions, SaveOptions},
        statement::StatementKind,
        traits::{Entity, FieldValue},
        value::Value,
    };

    #[cfg(feature = "sqlite")]
    pub use crate::backend::sqlite::SqliteBackend;
}
