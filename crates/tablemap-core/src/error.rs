use crate::value::ValueType;
use std::fmt;
use thiserror::Error as ThisError;

///
/// OrmError
///
/// Aggregate error returned by catalog, compiler, materializer, and read paths.
/// Write paths report backend failures through `CrudReturn` instead.
///

#[derive(Debug, ThisError)]
pub enum OrmError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    UnsupportedExpression(#[from] UnsupportedExpressionError),

    #[error(transparent)]
    FieldCoercion(#[from] FieldCoercionError),

    #[error(transparent)]
    Backend(#[from] BackendExecutionError),
}

impl OrmError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Schema(_) => ErrorClass::Schema,
            Self::UnsupportedExpression(_) => ErrorClass::Unsupported,
            Self::FieldCoercion(_) => ErrorClass::Coercion,
            Self::Backend(_) => ErrorClass::Backend,
        }
    }

    /// True for errors that indicate a programming or metadata mistake.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Schema(_) | Self::UnsupportedExpression(_))
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}: {self}", self.class())
    }
}

///
/// ErrorClass
/// Error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Schema,
    Unsupported,
    Coercion,
    Backend,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Schema => "schema",
            Self::Unsupported => "unsupported",
            Self::Coercion => "coercion",
            Self::Backend => "backend",
        };
        write!(f, "{label}")
    }
}

///
/// SchemaError
///
/// Metadata missing or inconsistent for a domain type.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("entity '{entity}' declares no primary key; '{operation}' requires one")]
    MissingPrimaryKey {
        entity: String,
        operation: &'static str,
    },

    #[error("entity '{entity}' has no field '{field}'")]
    UnknownField { entity: String, field: String },

    #[error("association cycle detected at '{entity}.{field}'")]
    AssociationCycle { entity: String, field: String },

    #[error("row is missing primary-key column '{column}' for entity '{entity}'")]
    MissingKeyColumn { entity: String, column: String },

    #[error("accessor for '{entity}.{field}' was called with a foreign type")]
    AccessorMismatch { entity: String, field: String },

    #[error("backend '{0}' is not registered")]
    BackendNotFound(String),

    #[error("backend '{0}' is already registered")]
    BackendAlreadyRegistered(String),
}

///
/// UnsupportedExpressionError
///
/// The predicate compiler met a node kind it cannot translate.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("unsupported expression node '{node}': {reason}")]
pub struct UnsupportedExpressionError {
    pub node: String,
    pub reason: String,
}

impl UnsupportedExpressionError {
    pub fn new(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            reason: reason.into(),
        }
    }
}

///
/// CoercionError
///
/// Low-level conversion failure raised by `FieldValue::from_value`.
/// The materializer attaches field context and turns it into a
/// [`FieldCoercionError`].
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CoercionError {
    #[error("null cannot be assigned to a non-nullable {target}")]
    UnexpectedNull { target: ValueType },

    #[error("{found} cannot be converted to {target}")]
    Mismatch { found: ValueType, target: ValueType },

    #[error("value {value} is out of range for {target}")]
    OutOfRange { value: String, target: &'static str },

    #[error("text '{text}' cannot be parsed as {target}")]
    Parse { text: String, target: ValueType },
}

impl CoercionError {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::UnexpectedNull { .. })
    }
}

///
/// FieldCoercionError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("cannot assign {found} to field '{entity}.{field}' ({declared}): {source}")]
pub struct FieldCoercionError {
    pub entity: String,
    pub field: String,
    pub declared: ValueType,
    pub found: ValueType,
    pub source: CoercionError,
}

///
/// BackendExecutionError
///
/// Failure reported by the connection while executing SQL.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{context}: {message}")]
pub struct BackendExecutionError {
    pub context: String,
    pub message: String,
}

impl BackendExecutionError {
    pub fn new(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Re-wrap with an outer context, keeping the inner one in the message.
    #[must_use]
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            message: format!("{}: {}", self.context, self.message),
        }
    }
}
