//! SQL statement rendering from table metadata and compiled predicates.

mod builder;
mod command;
mod trace;


pub use builder::{StatementBuilder, ddl_matches};
pub use command::DboCommand;
pub use trace::statement_trace;

use derive_more::Display;

///
/// StatementKind
///
/// What a statement does. Doubles as the `change_type` of a write outcome.
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq)]
pub enum StatementKind {
    #[default]
    None,
    Insert,
    Update,
    Delete,
    DeleteAll,
    Select,
    SelectReload,
    UnknownStatement,
    ExistenceCheck,
    CreateTable,
    DropTable,
}

impl StatementKind {
    /// Kinds that change stored rows.
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(
            self,
            Self::Insert | Self::Update | Self::Delete | Self::DeleteAll
        )
    }
}
