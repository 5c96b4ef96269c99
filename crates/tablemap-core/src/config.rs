//! Backend connection settings.
//!
//! Hosts usually keep one [`BackendConfig`] per named backend in a JSON file
//! and build the matching [`Backend`](crate::backend::Backend) from it.

use crate::{
    backend::{DatabaseType, Dialect},
    error::BackendExecutionError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("invalid backend config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("backend '{name}' is configured for {database_type}, not {expected}")]
    DatabaseMismatch {
        name: String,
        database_type: DatabaseType,
        expected: DatabaseType,
    },

    #[error(transparent)]
    Backend(#[from] BackendExecutionError),
}

///
/// BackendConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BackendConfig {
    pub name: String,
    pub database_type: DatabaseType,
    pub connection_string: String,

    #[serde(default = "default_pooling")]
    pub pooling: bool,
}

const fn default_pooling() -> bool {
    true
}

impl BackendConfig {
    pub fn new(
        name: impl Into<String>,
        database_type: DatabaseType,
        connection_string: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            database_type,
            connection_string: connection_string.into(),
            pooling: true,
        }
    }

    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        Dialect::for_database(self.database_type)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a JSON array of configs.
    pub fn list_from_json(json: &str) -> Result<Vec<Self>, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub(crate) fn expect_database(&self, expected: DatabaseType) -> Result<(), ConfigError> {
        if self.database_type == expected {
            Ok(())
        } else {
            Err(ConfigError::DatabaseMismatch {
                name: self.name.clone(),
                database_type: self.database_type,
                expected,
            })
        }
    }

    /// Value of a `key=value;` entry in the connection string, matched
    /// case-insensitively.
    #[must_use]
    pub fn connection_value(&self, key: &str) -> Option<&str> {
        self.connection_string.split(';').find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            k.trim().eq_ignore_ascii_case(key).then(|| v.trim())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip_keeps_every_field() {
        let config = BackendConfig {
            pooling: false,
            ..BackendConfig::new("main", DatabaseType::Sqlite, "Data Source=app.db")
        };

        let json = config.to_json().expect("serialize");
        assert!(json.contains("\"database_type\": \"sqlite\""));
        assert_eq!(BackendConfig::from_json(&json).expect("parse"), config);
    }

    #[test]
    fn pooling_defaults_to_true() {
        let config = BackendConfig::from_json(
            r#"{"name":"reports","database_type":"sqlserver","connection_string":"Server=x"}"#,
        )
        .expect("parse");

        assert!(config.pooling);
        assert_eq!(config.dialect(), Dialect::SQLSERVER);
    }

    #[test]
    fn config_lists_parse_every_backend() {
        let configs = BackendConfig::list_from_json(
            r#"[
                {"name":"default","database_type":"sqlite","connection_string":"Data Source=:memory:"},
                {"name":"reports","database_type":"postgresql","connection_string":"Host=db","pooling":false}
            ]"#,
        )
        .expect("parse");

        let names: Vec<_> = configs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["default", "reports"]);
        assert_eq!(configs[1].database_type, DatabaseType::PostgreSql);
        assert!(!configs[1].pooling);

        assert!(BackendConfig::list_from_json(r#"{"name":"solo"}"#).is_err());
    }

    #[test]
    fn connection_values_are_case_insensitive() {
        let config = BackendConfig::new(
            "main",
            DatabaseType::Sqlite,
            "Data Source = app.db; Version=3;",
        );

        assert_eq!(config.connection_value("data source"), Some("app.db"));
        assert_eq!(config.connection_value("version"), Some("3"));
        assert_eq!(config.connection_value("password"), None);
    }

    #[test]
    fn unknown_database_type_is_rejected() {
        let err = BackendConfig::from_json(
            r#"{"name":"x","database_type":"access","connection_string":""}"#,
        )
        .expect_err("should fail");

        assert!(matches!(err, ConfigError::Json(_)));
    }
}
