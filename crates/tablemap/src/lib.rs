//! ## Crate layout
//! - `backend`: connection contract, dialects, the backend registry, and the
//!   bundled SQLite backend.
//! - `catalog` / `model`: per-type table metadata.
//! - `query`: typed predicates and their compiler.
//! - `statement`: SQL rendering for reads, writes, and DDL.
//! - `materialize`: flat joined rows to de-duplicated object graphs.
//! - `session`: the execution facade returning `CrudReturn`.
//! - `obs`: per-thread operation metrics.
//!
//! `#[derive(Entity)]` generates the metadata and a typed column handle set;
//! the `prelude` carries what application code usually needs.

pub use tablemap_core::{
    COUNT_ALIAS, DATETIME_FORMAT, DEFAULT_BACKEND, OrmError, backend, catalog, config, error,
    hooks, impl_enum_field_value, materialize, model, obs, query, response, session, statement,
    traits, value,
};
pub use tablemap_derive::Entity;

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::Entity;
    pub use tablemap_core::prelude::*;
}
