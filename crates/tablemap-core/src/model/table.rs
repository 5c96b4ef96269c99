use crate::{
    DEFAULT_BACKEND,
    error::SchemaError,
    model::{
        AutomaticValue, FieldDefinition, FieldOptions, JoinKeys, ValidationFailure,
        ValidationRule,
    },
    traits::{Entity, FieldValue},
    value::RowDictionary,
};
use std::{
    any::{Any, TypeId, type_name},
    fmt,
    marker::PhantomData,
};

///
/// TableDefinition
///
/// Per-type mapping metadata. Immutable once built.
///

pub struct TableDefinition {
    entity_name: &'static str,
    type_id: TypeId,
    table_name: &'static str,
    database_name: Option<&'static str>,
    prefix_database_name: bool,
    backend: &'static str,
    fields: Vec<FieldDefinition>,
    primary_keys: Vec<usize>,
    rules: Vec<ValidationRule>,
    create: fn() -> Box<dyn Any>,
}

impl TableDefinition {
    #[must_use]
    pub fn builder<E: Entity>(table_name: &'static str) -> TableBuilder<E> {
        TableBuilder {
            table_name,
            database_name: None,
            prefix_database_name: false,
            backend: DEFAULT_BACKEND,
            fields: Vec::new(),
            rules: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Short type name used in composite materialization keys.
    #[must_use]
    pub const fn entity_name(&self) -> &'static str {
        self.entity_name
    }

    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[must_use]
    pub const fn table_name(&self) -> &'static str {
        self.table_name
    }

    /// Table name as written in SQL, prefixed with the database when configured.
    #[must_use]
    pub fn name(&self) -> String {
        match (self.prefix_database_name, self.database_name) {
            (true, Some(database)) => format!("{database}.{}", self.table_name),
            _ => self.table_name.to_string(),
        }
    }

    #[must_use]
    pub const fn backend(&self) -> &'static str {
        self.backend
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn scalar_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|field| field.is_scalar())
    }

    pub fn association_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|field| !field.is_scalar())
    }

    pub fn primary_key_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.primary_keys.iter().map(|&index| &self.fields[index])
    }

    #[must_use]
    pub fn has_primary_key(&self) -> bool {
        !self.primary_keys.is_empty()
    }

    /// Fail with a schema error when `operation` needs a key and none exists.
    pub fn require_primary_key(&self, operation: &'static str) -> Result<(), SchemaError> {
        if self.has_primary_key() {
            Ok(())
        } else {
            Err(SchemaError::MissingPrimaryKey {
                entity: self.entity_name.to_string(),
                operation,
            })
        }
    }

    /// The field whose value the backend assigns on insert, if any.
    #[must_use]
    pub fn identity_field(&self) -> Option<&FieldDefinition> {
        self.scalar_fields()
            .find(|field| field.options.automatic == AutomaticValue::Identity)
    }

    #[must_use]
    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    /// Fresh default instance of the mapped type.
    #[must_use]
    pub fn new_instance(&self) -> Box<dyn Any> {
        (self.create)()
    }

    /// Flatten scalar fields of `entity` into a row keyed by field name.
    pub fn to_row(&self, entity: &dyn Any) -> Result<RowDictionary, SchemaError> {
        let mut row = RowDictionary::new();
        for field in self.scalar_fields() {
            row.push_column(field.name, field.read(entity, self.entity_name)?);
        }

        Ok(row)
    }

    /// Evaluate validation rules; an empty result means the entity is valid.
    pub fn validate(&self, entity: &dyn Any) -> Result<Vec<ValidationFailure>, SchemaError> {
        let mut failures = Vec::new();
        for rule in &self.rules {
            let field = self
                .field(rule.field)
                .ok_or_else(|| SchemaError::UnknownField {
                    entity: self.entity_name.to_string(),
                    field: rule.field.to_string(),
                })?;
            let value = field.read(entity, self.entity_name)?;
            if !rule.validate(&value) {
                failures.push(ValidationFailure {
                    field: rule.field.to_string(),
                    message: rule.message.clone(),
                });
            }
        }

        Ok(failures)
    }
}

impl fmt::Debug for TableDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableDefinition")
            .field("entity_name", &self.entity_name)
            .field("table_name", &self.table_name)
            .field("database_name", &self.database_name)
            .field("prefix_database_name", &self.prefix_database_name)
            .field("backend", &self.backend)
            .field("fields", &self.fields)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

///
/// TableBuilder
///
/// Registration-time builder producing the accessor table for `E`.
///

pub struct TableBuilder<E: Entity> {
    table_name: &'static str,
    database_name: Option<&'static str>,
    prefix_database_name: bool,
    backend: &'static str,
    fields: Vec<FieldDefinition>,
    rules: Vec<ValidationRule>,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Entity> TableBuilder<E> {
    /// Owning database; `prefix` writes table names as `database.table`.
    #[must_use]
    pub const fn database(mut self, name: &'static str, prefix: bool) -> Self {
        self.database_name = Some(name);
        self.prefix_database_name = prefix;
        self
    }

    #[must_use]
    pub const fn backend(mut self, name: &'static str) -> Self {
        self.backend = name;
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn scalar<T: FieldValue + 'static>(
        self,
        name: &'static str,
        options: FieldOptions,
        get: impl Fn(&E) -> &T + Send + Sync + 'static,
        get_mut: impl Fn(&mut E) -> &mut T + Send + Sync + 'static,
    ) -> Self {
        self.field(FieldDefinition::scalar(name, options, get, get_mut))
    }

    #[must_use]
    pub fn one_to_many<C: Entity>(
        self,
        name: &'static str,
        keys: JoinKeys,
        children: impl Fn(&mut E) -> &mut Vec<C> + Send + Sync + 'static,
    ) -> Self {
        self.field(FieldDefinition::one_to_many(name, keys, children))
    }

    #[must_use]
    pub fn one_to_one<C: Entity>(
        self,
        name: &'static str,
        keys: JoinKeys,
        slot: impl Fn(&mut E) -> &mut Option<C> + Send + Sync + 'static,
    ) -> Self {
        self.field(FieldDefinition::one_to_one(name, keys, slot))
    }

    #[must_use]
    pub fn rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    #[must_use]
    pub fn build(self) -> TableDefinition {
        let primary_keys = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, field)| field.is_scalar() && field.is_primary_key())
            .map(|(index, _)| index)
            .collect();

        TableDefinition {
            entity_name: short_type_name(type_name::<E>()),
            type_id: TypeId::of::<E>(),
            table_name: self.table_name,
            database_name: self.database_name,
            prefix_database_name: self.prefix_database_name,
            backend: self.backend,
            fields: self.fields,
            primary_keys,
            rules: self.rules,
            create: create_boxed::<E>,
        }
    }
}

fn create_boxed<E: Entity>() -> Box<dyn Any> {
    Box::new(E::default())
}

// `a::b::User<c::D>` → `User<c::D>`
fn short_type_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    let start = head.rfind("::").map_or(0, |index| index + 2);

    &full[start..]
}
