//! Row materialization.
//!
//! Rebuilds typed object graphs from flat, joined result rows. Every object
//! is identified by a composite key built from its primary-key columns and
//! the key of the object that owns it, so a parent repeated across rows by a
//! one-to-many join is built once and collects one child per distinct key.
//!
//! Objects live in an arena while rows are scanned; children record their
//! parent's arena slot and are moved into the parent only at the end, so
//! every returned graph is a plain owned tree.

#[cfg(test)]
mod tests;

use crate::{
    catalog,
    error::{CoercionError, FieldCoercionError, OrmError, SchemaError},
    model::{FieldDefinition, TableDefinition, field::FieldWriteError},
    traits::Entity,
    value::{RowDictionary, Value, ValueType},
};
use std::{any::Any, collections::HashMap, sync::Arc};

type NodeId = usize;

///
/// Slot
///
/// Outcome of resolving one object from one row.
///

enum Slot {
    /// First sighting; the node was just created.
    New(NodeId),
    /// Already materialized from an earlier row.
    Existing,
    /// No object on this branch of the row.
    Absent,
}

struct Node {
    object: Box<dyn Any>,
    table: Arc<TableDefinition>,
    children: Vec<(usize, NodeId)>,
}

///
/// Materializer
///
/// Per-call state: the node arena and the composite-key cache.
///

#[derive(Default)]
pub struct Materializer {
    nodes: Vec<Node>,
    cache: HashMap<String, NodeId>,
    roots: Vec<NodeId>,
}

impl Materializer {
    /// Materialize `rows` into distinct root objects, in first-seen order.
    pub fn materialize<E: Entity>(rows: &[RowDictionary]) -> Result<Vec<E>, OrmError> {
        let table = catalog::table_definition::<E>();
        let mut state = Self::default();

        for row in rows {
            if let Slot::New(id) = state.resolve(&table, row, "", "", true)? {
                state.roots.push(id);
            }
        }

        state
            .assemble()?
            .into_iter()
            .map(|object| {
                object
                    .downcast::<E>()
                    .map(|boxed| *boxed)
                    .map_err(|_| accessor_mismatch(&table).into())
            })
            .collect()
    }

    fn resolve(
        &mut self,
        table: &Arc<TableDefinition>,
        row: &RowDictionary,
        prefix: &str,
        parent_key: &str,
        is_root: bool,
    ) -> Result<Slot, OrmError> {
        let Some(key) = composite_key(table, row, prefix, parent_key, is_root)? else {
            return Ok(Slot::Absent);
        };

        let cached = key.as_ref().and_then(|k| self.cache.get(k)).copied();
        let (slot, id) = match cached {
            Some(id) => (Slot::Existing, id),
            None => {
                let Some(object) = populate(table, row, prefix)? else {
                    return Ok(Slot::Absent);
                };
                let id = self.nodes.len();
                self.nodes.push(Node {
                    object,
                    table: Arc::clone(table),
                    children: Vec::new(),
                });
                if let Some(key) = &key {
                    self.cache.insert(key.clone(), id);
                }
                (Slot::New(id), id)
            }
        };

        // nested objects are resolved for every row, including repeats
        let owner_key = key.unwrap_or_else(|| format!("{parent_key}/{}#{id}", table.entity_name()));
        for (index, field) in table.fields().iter().enumerate() {
            let Some(association) = field.association() else {
                continue;
            };
            let target = association.target();
            let child_prefix = format!("{prefix}{}_", field.name);

            if let Slot::New(child) = self.resolve(&target, row, &child_prefix, &owner_key, false)? {
                self.nodes[id].children.push((index, child));
            }
        }

        Ok(slot)
    }

    // Children always sit at higher arena slots than their parent, so a
    // reverse sweep finishes every child before its parent takes it.
    fn assemble(self) -> Result<Vec<Box<dyn Any>>, OrmError> {
        let mut objects = Vec::with_capacity(self.nodes.len());
        let mut links = Vec::with_capacity(self.nodes.len());
        for node in self.nodes {
            objects.push(Some(node.object));
            links.push((node.table, node.children));
        }

        for id in (0..objects.len()).rev() {
            let (table, children) = &links[id];
            for &(field_index, child_id) in children {
                let child = objects[child_id]
                    .take()
                    .ok_or_else(|| accessor_mismatch(table))?;
                let parent = objects[id]
                    .as_deref_mut()
                    .ok_or_else(|| accessor_mismatch(table))?;

                let field = &table.fields()[field_index];
                let attached = field
                    .association()
                    .is_some_and(|association| association.attach(parent, child));
                if !attached {
                    return Err(field.mismatch(table.entity_name()).into());
                }
            }
        }

        self.roots
            .into_iter()
            .map(|id| {
                objects[id]
                    .take()
                    .ok_or_else(|| accessor_mismatch(&links[id].0).into())
            })
            .collect()
    }
}

/// Shorthand for [`Materializer::materialize`].
pub fn materialize<E: Entity>(rows: &[RowDictionary]) -> Result<Vec<E>, OrmError> {
    Materializer::materialize(rows)
}

// Outer `None`: no object on this branch. Inner `None`: the table has no
// key, so every row yields a fresh object.
fn composite_key(
    table: &TableDefinition,
    row: &RowDictionary,
    prefix: &str,
    parent_key: &str,
    is_root: bool,
) -> Result<Option<Option<String>>, SchemaError> {
    if !table.has_primary_key() {
        let any_value = table
            .scalar_fields()
            .any(|f| row.get(&format!("{prefix}{}", f.name)).is_some_and(|v| !v.is_null()));

        return Ok((is_root || any_value).then_some(None));
    }

    let mut parts = Vec::new();
    let mut all_null = true;
    for field in table.primary_key_fields() {
        let column = format!("{prefix}{}", field.name);
        let Some(value) = row.get(&column) else {
            if is_root {
                return Err(SchemaError::MissingKeyColumn {
                    entity: table.entity_name().to_string(),
                    column,
                });
            }
            return Ok(None);
        };

        if value.is_null() {
            if !field.is_nullable() {
                return Ok(None);
            }
            parts.push(None);
        } else {
            all_null = false;
            parts.push(Some(value.to_string()));
        }
    }

    if all_null {
        return Ok(None);
    }

    let mut key = format!("{parent_key}/{}", table.entity_name());
    for part in parts {
        // length-prefixed: distinct key tuples never share an encoding
        match part {
            Some(text) => {
                key.push_str(&format!("|{}:{text}", text.len()));
            }
            None => key.push_str("|~"),
        }
    }

    Ok(Some(Some(key)))
}

// Build a fresh instance from the row's columns. `None` when a key field
// cannot hold its value.
fn populate(
    table: &TableDefinition,
    row: &RowDictionary,
    prefix: &str,
) -> Result<Option<Box<dyn Any>>, OrmError> {
    let mut object = table.new_instance();

    for field in table.scalar_fields() {
        let Some(value) = row.get(&format!("{prefix}{}", field.name)) else {
            continue;
        };

        match field.write(object.as_mut(), value.clone()) {
            Ok(()) => {}
            Err(FieldWriteError::ForeignType) => {
                return Err(field.mismatch(table.entity_name()).into());
            }
            Err(FieldWriteError::Coercion(_)) if field.is_primary_key() => return Ok(None),
            Err(FieldWriteError::Coercion(err)) if err.is_null() => {}
            Err(FieldWriteError::Coercion(source)) => {
                return Err(coercion_error(table, field, value, source).into());
            }
        }
    }

    Ok(Some(object))
}

pub(crate) fn coercion_error(
    table: &TableDefinition,
    field: &FieldDefinition,
    value: &Value,
    source: CoercionError,
) -> FieldCoercionError {
    FieldCoercionError {
        entity: table.entity_name().to_string(),
        field: field.name.to_string(),
        declared: field.value_type().unwrap_or(ValueType::Null),
        found: value.value_type(),
        source,
    }
}

fn accessor_mismatch(table: &TableDefinition) -> SchemaError {
    SchemaError::AccessorMismatch {
        entity: table.entity_name().to_string(),
        field: String::new(),
    }
}
