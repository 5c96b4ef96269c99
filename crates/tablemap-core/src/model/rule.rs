use crate::value::Value;
use std::{fmt, sync::Arc};

type CheckFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

///
/// ValidationRule
///
/// Field-level rule evaluated before a save when validation is requested.
///

#[derive(Clone)]
pub struct ValidationRule {
    pub field: &'static str,
    pub message: String,
    check: CheckFn,
}

impl ValidationRule {
    /// Non-null, and non-blank for text.
    #[must_use]
    pub fn required(field: &'static str) -> Self {
        Self::custom(field, format!("{field} is required"), |value| match value {
            Value::Null => false,
            Value::Text(text) => !text.trim().is_empty(),
            _ => true,
        })
    }

    /// Text no longer than `max` characters; other values pass.
    #[must_use]
    pub fn max_length(field: &'static str, max: usize) -> Self {
        Self::custom(
            field,
            format!("{field} must be at most {max} characters"),
            move |value| match value {
                Value::Text(text) => text.chars().count() <= max,
                _ => true,
            },
        )
    }

    pub fn custom(
        field: &'static str,
        message: impl Into<String>,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            field,
            message: message.into(),
            check: Arc::new(check),
        }
    }

    #[must_use]
    pub fn validate(&self, value: &Value) -> bool {
        (self.check)(value)
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("field", &self.field)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

///
/// ValidationFailure
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationFailure {
    pub field: String,
    pub message: String,
}
