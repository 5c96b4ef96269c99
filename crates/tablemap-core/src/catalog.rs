//! Process-wide schema catalog.
//!
//! One [`TableDefinition`] per domain type, built on first access through
//! `Entity::describe` and shared read-only afterwards. Concurrent first access
//! to the same type runs the registration exactly once.
use crate::{model::TableDefinition, traits::Entity};
use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, LazyLock, OnceLock, PoisonError, RwLock},
};

type Slot = Arc<OnceLock<Arc<TableDefinition>>>;

static CATALOG: LazyLock<RwLock<HashMap<TypeId, Slot>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Resolve the table definition for `E`, building it on first use.
#[must_use]
pub fn table_definition<E: Entity>() -> Arc<TableDefinition> {
    let slot = slot_for(TypeId::of::<E>());

    // the map lock is released here; only callers racing on `E` wait below
    Arc::clone(slot.get_or_init(|| {
        let definition = E::describe();
        tracing::debug!(
            entity = definition.entity_name(),
            table = definition.table_name(),
            fields = definition.fields().len(),
            "registered table definition"
        );

        Arc::new(definition)
    }))
}

/// True once `E` has been described.
#[must_use]
pub fn is_registered<E: Entity>() -> bool {
    CATALOG
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&TypeId::of::<E>())
        .is_some_and(|slot| slot.get().is_some())
}

fn slot_for(type_id: TypeId) -> Slot {
    if let Some(slot) = CATALOG
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&type_id)
    {
        return Arc::clone(slot);
    }

    let mut map = CATALOG.write().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(map.entry(type_id).or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Order, User};
    use std::thread;

    #[test]
    fn definition_is_cached_per_type() {
        let first = table_definition::<User>();
        let second = table_definition::<User>();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(is_registered::<User>());
        assert_eq!(first.table_name(), "Users");
    }

    #[test]
    fn concurrent_first_access_yields_one_instance() {
        let handles: Vec<_> = (0..8)
            .map(|_| thread::spawn(table_definition::<Order>))
            .collect();
        let defs: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("catalog thread should not panic"))
            .collect();

        for def in &defs[1..] {
            assert!(Arc::ptr_eq(&defs[0], def));
        }
    }
}
