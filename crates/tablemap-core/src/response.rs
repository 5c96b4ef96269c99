use crate::statement::StatementKind;
use derive_more::Display;

///
/// CrudStatus
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
pub enum CrudStatus {
    #[default]
    None,
    Ok,
    Fail,
}

///
/// CrudReturn
///
/// Outcome of a write. Backend failures land here as `Fail` with the driver
/// message; metadata errors never do.
///

#[derive(Clone, Debug, PartialEq)]
pub struct CrudReturn<E> {
    pub status: CrudStatus,

    /// Rows the backend reported; `-1` when no statement ran.
    pub records_affected: i64,

    pub change_type: StatementKind,
    pub message: Option<String>,

    /// The saved object, with any backend-assigned identity filled in.
    pub data: Option<E>,
}

impl<E> Default for CrudReturn<E> {
    fn default() -> Self {
        Self {
            status: CrudStatus::None,
            records_affected: -1,
            change_type: StatementKind::None,
            message: None,
            data: None,
        }
    }
}

impl<E> CrudReturn<E> {
    #[must_use]
    pub fn ok(change_type: StatementKind, records_affected: i64) -> Self {
        Self {
            status: CrudStatus::Ok,
            records_affected,
            change_type,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn fail(change_type: StatementKind, message: impl Into<String>) -> Self {
        Self {
            status: CrudStatus::Fail,
            change_type,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: E) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, CrudStatus::Ok)
    }

    #[must_use]
    pub const fn is_fail(&self) -> bool {
        matches!(self.status, CrudStatus::Fail)
    }
}
