use crate::value::ValueType;
use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// DatabaseType
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    #[display("mysql")]
    MySql,
    #[display("oracle")]
    Oracle,
    #[display("postgresql")]
    PostgreSql,
    #[display("sqlite")]
    Sqlite,
    #[display("sqlserver")]
    SqlServer,
}

///
/// Dialect
///
/// Per-backend SQL fragments. Every statement the crate renders goes through
/// one of these, so a `(table, dialect)` pair always yields the same text.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Dialect {
    pub database_type: DatabaseType,

    /// Placeholder marker written before parameter names in SQL text.
    pub parameter_prefix: char,

    /// Statement appended after an insert to read the new identity back.
    pub last_identity: Option<&'static str>,

    /// `chrono` layout for datetime literals in scripts.
    pub datetime_format: &'static str,

    /// The identity column carries its own `primary key` clause.
    pub inline_identity_key: bool,
}

impl Dialect {
    pub const MYSQL: Self = Self {
        database_type: DatabaseType::MySql,
        parameter_prefix: '@',
        last_identity: Some("select last_insert_id()"),
        datetime_format: "%Y-%m-%d %H:%M:%S%.6f",
        inline_identity_key: false,
    };

    pub const ORACLE: Self = Self {
        database_type: DatabaseType::Oracle,
        parameter_prefix: ':',
        last_identity: None,
        datetime_format: "%Y-%m-%d %H:%M:%S%.f",
        inline_identity_key: false,
    };

    pub const POSTGRESQL: Self = Self {
        database_type: DatabaseType::PostgreSql,
        parameter_prefix: '@',
        last_identity: Some("select lastval()"),
        datetime_format: "%Y-%m-%d %H:%M:%S%.6f",
        inline_identity_key: false,
    };

    pub const SQLITE: Self = Self {
        database_type: DatabaseType::Sqlite,
        parameter_prefix: '@',
        last_identity: Some("select last_insert_rowid()"),
        datetime_format: "%Y-%m-%d %H:%M:%S%.f",
        inline_identity_key: true,
    };

    pub const SQLSERVER: Self = Self {
        database_type: DatabaseType::SqlServer,
        parameter_prefix: '@',
        last_identity: Some("select scope_identity()"),
        datetime_format: "%Y-%m-%d %H:%M:%S%.f",
        inline_identity_key: false,
    };

    #[must_use]
    pub const fn for_database(database_type: DatabaseType) -> Self {
        match database_type {
            DatabaseType::MySql => Self::MYSQL,
            DatabaseType::Oracle => Self::ORACLE,
            DatabaseType::PostgreSql => Self::POSTGRESQL,
            DatabaseType::Sqlite => Self::SQLITE,
            DatabaseType::SqlServer => Self::SQLSERVER,
        }
    }

    /// `@name` (or the dialect's marker) for a bare parameter name.
    #[must_use]
    pub fn placeholder(&self, name: &str) -> String {
        format!("{}{name}", self.parameter_prefix)
    }

    /// Column type for a declared scalar type.
    #[must_use]
    pub const fn column_type(&self, value_type: ValueType) -> &'static str {
        use DatabaseType as D;
        use ValueType as V;

        match (self.database_type, value_type) {
            (D::Sqlite, V::Bool | V::Int) => "integer",
            (D::Sqlite, V::Float) => "real",
            (D::Sqlite, V::Text | V::DateTime | V::Null) => "text",
            (D::Sqlite, V::Blob) => "blob",

            (D::SqlServer, V::Bool) => "bit",
            (D::SqlServer, V::Int) => "bigint",
            (D::SqlServer, V::Float) => "float",
            (D::SqlServer, V::Text | V::Null) => "nvarchar(max)",
            (D::SqlServer, V::Blob) => "varbinary(max)",
            (D::SqlServer, V::DateTime) => "datetime2(7)",

            (D::MySql, V::Bool) => "tinyint(1)",
            (D::MySql, V::Int) => "bigint",
            (D::MySql, V::Float) => "double",
            (D::MySql, V::Text | V::Null) => "longtext",
            (D::MySql, V::Blob) => "longblob",
            (D::MySql, V::DateTime) => "datetime(6)",

            (D::PostgreSql, V::Bool) => "boolean",
            (D::PostgreSql, V::Int) => "bigint",
            (D::PostgreSql, V::Float) => "double precision",
            (D::PostgreSql, V::Text | V::Null) => "text",
            (D::PostgreSql, V::Blob) => "bytea",
            (D::PostgreSql, V::DateTime) => "timestamp",

            (D::Oracle, V::Bool) => "number(1)",
            (D::Oracle, V::Int) => "number(19)",
            (D::Oracle, V::Float) => "binary_double",
            (D::Oracle, V::Text | V::Null) => "nclob",
            (D::Oracle, V::Blob) => "blob",
            (D::Oracle, V::DateTime) => "timestamp(7)",
        }
    }

    /// Full column definition for a backend-assigned identity.
    #[must_use]
    pub const fn identity_column(&self) -> &'static str {
        match self.database_type {
            DatabaseType::Sqlite => "integer primary key autoincrement",
            DatabaseType::SqlServer => "bigint identity(1,1)",
            DatabaseType::MySql => "bigint auto_increment",
            DatabaseType::PostgreSql => "bigserial",
            DatabaseType::Oracle => "number(19) generated by default as identity",
        }
    }

    /// Statement that renames a table in place.
    #[must_use]
    pub fn rename_table(&self, from: &str, to: &str) -> String {
        match self.database_type {
            DatabaseType::MySql => format!("rename table {from} to {to}"),
            DatabaseType::SqlServer => format!("exec sp_rename '{from}', '{to}'"),
            DatabaseType::Oracle | DatabaseType::PostgreSql | DatabaseType::Sqlite => {
                format!("alter table {from} rename to {to}")
            }
        }
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::SQLITE
    }
}
