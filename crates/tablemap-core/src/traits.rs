use crate::{
    catalog,
    error::{CoercionError, SchemaError},
    model::TableDefinition,
    value::{RowDictionary, Value, ValueType},
};
use std::any::Any;

// ============================================================================
// ENTITY IDENTITY & SCHEMA
// ============================================================================

///
/// Entity
///
/// A domain type mapped onto one table.
///
/// `describe` is the registration point: it is invoked once per process by
/// the schema catalog and must return the complete field-accessor table.
/// It must not ask the catalog for `Self`.
///

pub trait Entity: Any + Clone + Default + Send + Sync {
    fn describe() -> TableDefinition;

    /// Assign caller-generated key values right before an insert.
    ///
    /// Only invoked for tables without an identity field.
    fn assign_keys(&mut self) {}

    /// Flatten the scalar fields into a name → value mapping.
    fn to_row(&self) -> Result<RowDictionary, SchemaError> {
        catalog::table_definition::<Self>().to_row(self)
    }
}

// ============================================================================
// FIELD VALUES
// ============================================================================

///
/// FieldValue
///
/// Conversion between a Rust field type and a runtime [`Value`].
/// `from_value` implements the coercion policy used during materialization.
///

pub trait FieldValue: Sized {
    const KIND: ValueType;
    const NULLABLE: bool = false;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, CoercionError>;
}

