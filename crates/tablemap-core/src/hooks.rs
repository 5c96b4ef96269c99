//! Lifecycle notifications around writes.
//!
//! Observers are passed per call through the write options; the session
//! invokes them synchronously on the calling thread.

use crate::{model::ValidationFailure, statement::StatementKind};

///
/// FireEvent
///
/// Which save notifications `save_changes` emits.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FireEvent {
    None,
    OnBeforeSave,
    OnAfterSave,
    #[default]
    OnBeforeAndAfter,
}

impl FireEvent {
    #[must_use]
    pub const fn before(self) -> bool {
        matches!(self, Self::OnBeforeSave | Self::OnBeforeAndAfter)
    }

    #[must_use]
    pub const fn after(self) -> bool {
        matches!(self, Self::OnAfterSave | Self::OnBeforeAndAfter)
    }
}

///
/// RecordChange
///
/// Payload of a lifecycle notification. Before-notifications carry zero
/// affected rows.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RecordChange {
    pub records_affected: i64,
    pub change_type: StatementKind,
}

impl RecordChange {
    #[must_use]
    pub const fn new(records_affected: i64, change_type: StatementKind) -> Self {
        Self {
            records_affected,
            change_type,
        }
    }

    /// Before a save the statement kind is not yet known.
    #[must_use]
    pub const fn pending_save() -> Self {
        Self::new(0, StatementKind::UnknownStatement)
    }

    #[must_use]
    pub const fn pending_delete() -> Self {
        Self::new(0, StatementKind::Delete)
    }
}

///
/// LifecycleObserver
///
/// Every method has an empty default; implement only what you need.
///

pub trait LifecycleObserver<E>: Send + Sync {
    fn before_save(&self, _entity: &E, _change: RecordChange) {}

    fn after_save(&self, _entity: &E, _change: RecordChange) {}

    fn before_delete(&self, _entity: &E, _change: RecordChange) {}

    fn after_delete(&self, _entity: &E, _change: RecordChange) {}

    /// Validation rejected the entity; nothing was written.
    fn validation_failed(&self, _entity: &E, _failures: &[ValidationFailure]) {}

    /// The backend rejected a write.
    fn operation_failed(&self, _entity: &E, _change_type: StatementKind, _message: &str) {}
}
