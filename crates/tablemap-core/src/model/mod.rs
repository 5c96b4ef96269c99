//! Runtime table metadata.
//!
//! A [`TableDefinition`] is built once per domain type through
//! [`TableBuilder`], then shared read-only by the compiler, the statement
//! builder, and the materializer. Field access goes through the accessor
//! closures captured at registration, never through runtime reflection.
pub mod field;
pub mod rule;
pub mod table;

pub use field::{
    AssociationDefinition, AutomaticValue, Cardinality, FieldDefinition, FieldKind, FieldOptions,
    JoinKeys,
};
pub use rule::{ValidationFailure, ValidationRule};
pub use table::{TableBuilder, TableDefinition};
