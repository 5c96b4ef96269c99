use crate::{
    error::{CoercionError, SchemaError},
    model::TableDefinition,
    traits::{Entity, FieldValue},
    value::{Value, ValueType},
};
use std::{any::Any, fmt, sync::Arc};

type ReadFn = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
type WriteFn = Arc<dyn Fn(&mut dyn Any, Value) -> Result<(), FieldWriteError> + Send + Sync>;
type AttachFn = Arc<dyn Fn(&mut dyn Any, Box<dyn Any>) -> bool + Send + Sync>;

///
/// AutomaticValue
///
/// How the backend fills a field on insert.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AutomaticValue {
    #[default]
    None,
    /// Backend-assigned identity, read back after insert.
    Identity,
    /// Server-computed column, never written by the mapper.
    Computed,
}

///
/// Cardinality
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Cardinality {
    One,
    Many,
}

///
/// JoinKeys
///
/// Join columns for an association: `child.child_column = parent.parent_column`.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct JoinKeys {
    pub parent_column: &'static str,
    pub child_column: &'static str,
}

impl JoinKeys {
    #[must_use]
    pub const fn new(parent_column: &'static str, child_column: &'static str) -> Self {
        Self {
            parent_column,
            child_column,
        }
    }
}

///
/// FieldOptions
///
/// Declarative flags supplied at registration.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FieldOptions {
    pub primary_key: bool,
    pub automatic: AutomaticValue,
    pub ignore_for_save: bool,
}

impl FieldOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            primary_key: false,
            automatic: AutomaticValue::None,
            ignore_for_save: false,
        }
    }

    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    #[must_use]
    pub const fn identity(mut self) -> Self {
        self.automatic = AutomaticValue::Identity;
        self
    }

    #[must_use]
    pub const fn computed(mut self) -> Self {
        self.automatic = AutomaticValue::Computed;
        self
    }

    #[must_use]
    pub const fn ignore_for_save(mut self) -> Self {
        self.ignore_for_save = true;
        self
    }
}

///
/// AssociationDefinition
///

#[derive(Clone)]
pub struct AssociationDefinition {
    pub cardinality: Cardinality,
    pub keys: JoinKeys,
    target: fn() -> Arc<TableDefinition>,
    attach: AttachFn,
}

impl AssociationDefinition {
    /// Resolve the associated table through the catalog.
    #[must_use]
    pub fn target(&self) -> Arc<TableDefinition> {
        (self.target)()
    }

    /// Move a materialized child into its parent; false on a type mismatch.
    pub(crate) fn attach(&self, parent: &mut dyn Any, child: Box<dyn Any>) -> bool {
        (self.attach)(parent, child)
    }
}

impl fmt::Debug for AssociationDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssociationDefinition")
            .field("cardinality", &self.cardinality)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

///
/// FieldKind
///

#[derive(Clone, Debug)]
pub enum FieldKind {
    Scalar { value_type: ValueType, nullable: bool },
    Association(AssociationDefinition),
}

///
/// FieldWriteError
///

#[derive(Debug)]
pub(crate) enum FieldWriteError {
    ForeignType,
    Coercion(CoercionError),
}

///
/// FieldDefinition
///
/// One mapped field plus its typed accessors.
///

#[derive(Clone)]
pub struct FieldDefinition {
    pub name: &'static str,
    pub kind: FieldKind,
    pub options: FieldOptions,
    read: Option<ReadFn>,
    write: Option<WriteFn>,
}

impl FieldDefinition {
    /// Build a scalar field from a getter/setter lens pair.
    pub fn scalar<E, T>(
        name: &'static str,
        options: FieldOptions,
        get: impl Fn(&E) -> &T + Send + Sync + 'static,
        get_mut: impl Fn(&mut E) -> &mut T + Send + Sync + 'static,
    ) -> Self
    where
        E: Entity,
        T: FieldValue + 'static,
    {
        let read: ReadFn = Arc::new(move |entity: &dyn Any| {
            entity.downcast_ref::<E>().map(|e| get(e).to_value())
        });
        let write: WriteFn = Arc::new(move |entity: &mut dyn Any, value: Value| {
            let entity = entity
                .downcast_mut::<E>()
                .ok_or(FieldWriteError::ForeignType)?;
            *get_mut(entity) = T::from_value(value).map_err(FieldWriteError::Coercion)?;

            Ok(())
        });

        Self {
            name,
            kind: FieldKind::Scalar {
                value_type: T::KIND,
                nullable: T::NULLABLE,
            },
            options,
            read: Some(read),
            write: Some(write),
        }
    }

    /// Build a one-to-many association stored in a `Vec<C>`.
    pub fn one_to_many<E, C>(
        name: &'static str,
        keys: JoinKeys,
        children: impl Fn(&mut E) -> &mut Vec<C> + Send + Sync + 'static,
    ) -> Self
    where
        E: Entity,
        C: Entity,
    {
        let attach: AttachFn = Arc::new(move |parent: &mut dyn Any, child: Box<dyn Any>| {
            match (parent.downcast_mut::<E>(), child.downcast::<C>()) {
                (Some(parent), Ok(child)) => {
                    children(parent).push(*child);
                    true
                }
                _ => false,
            }
        });

        Self::new_association::<C>(name, Cardinality::Many, keys, attach)
    }

    /// Build a one-to-one association stored in an `Option<C>`.
    pub fn one_to_one<E, C>(
        name: &'static str,
        keys: JoinKeys,
        slot: impl Fn(&mut E) -> &mut Option<C> + Send + Sync + 'static,
    ) -> Self
    where
        E: Entity,
        C: Entity,
    {
        let attach: AttachFn = Arc::new(move |parent: &mut dyn Any, child: Box<dyn Any>| {
            match (parent.downcast_mut::<E>(), child.downcast::<C>()) {
                (Some(parent), Ok(child)) => {
                    *slot(parent) = Some(*child);
                    true
                }
                _ => false,
            }
        });

        Self::new_association::<C>(name, Cardinality::One, keys, attach)
    }

    fn new_association<C: Entity>(
        name: &'static str,
        cardinality: Cardinality,
        keys: JoinKeys,
        attach: AttachFn,
    ) -> Self {
        Self {
            name,
            kind: FieldKind::Association(AssociationDefinition {
                cardinality,
                keys,
                target: crate::catalog::table_definition::<C>,
                attach,
            }),
            options: FieldOptions::new().ignore_for_save(),
            read: None,
            write: None,
        }
    }

    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(self.kind, FieldKind::Scalar { .. })
    }

    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        self.options.primary_key
    }

    #[must_use]
    pub fn is_automatic(&self) -> bool {
        self.options.automatic != AutomaticValue::None
    }

    /// Declared scalar type; `None` for associations.
    #[must_use]
    pub const fn value_type(&self) -> Option<ValueType> {
        match self.kind {
            FieldKind::Scalar { value_type, .. } => Some(value_type),
            FieldKind::Association(_) => None,
        }
    }

    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        matches!(self.kind, FieldKind::Scalar { nullable: true, .. })
    }

    #[must_use]
    pub const fn association(&self) -> Option<&AssociationDefinition> {
        match &self.kind {
            FieldKind::Association(assoc) => Some(assoc),
            FieldKind::Scalar { .. } => None,
        }
    }

    /// Read the field from an entity of the owning type.
    pub fn read(&self, entity: &dyn Any, owner: &str) -> Result<Value, SchemaError> {
        self.read
            .as_ref()
            .and_then(|read| read(entity))
            .ok_or_else(|| self.mismatch(owner))
    }

    pub(crate) fn write(
        &self,
        entity: &mut dyn Any,
        value: Value,
    ) -> Result<(), FieldWriteError> {
        match &self.write {
            Some(write) => write(entity, value),
            None => Err(FieldWriteError::ForeignType),
        }
    }

    pub(crate) fn mismatch(&self, owner: &str) -> SchemaError {
        SchemaError::AccessorMismatch {
            entity: owner.to_string(),
            field: self.name.to_string(),
        }
    }
}

impl fmt::Debug for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::table_definition,
        test_support::{Order, User},
    };

    #[test]
    fn association_fields_expose_their_join() {
        let users = table_definition::<User>();

        let orders = users
            .field("orders")
            .and_then(FieldDefinition::association)
            .expect("orders is an association");
        assert_eq!(orders.cardinality, Cardinality::Many);
        assert_eq!(orders.keys, JoinKeys::new("id", "user_id"));
        assert_eq!(orders.target().type_id(), table_definition::<Order>().type_id());

        let profile = users
            .field("profile")
            .and_then(FieldDefinition::association)
            .expect("profile is an association");
        assert_eq!(profile.cardinality, Cardinality::One);
    }

    #[test]
    fn scalar_fields_have_no_association() {
        let users = table_definition::<User>();
        let name = users.field("name").expect("name field");

        assert!(name.association().is_none());
        assert!(name.is_scalar());
    }
}
