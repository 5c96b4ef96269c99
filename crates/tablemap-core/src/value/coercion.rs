//! `FieldValue` implementations for the supported Rust field types.
//!
//! Conversion order follows one policy everywhere: an exact variant match is
//! taken as-is, `Option<T>` unwraps nulls before converting, and anything else
//! goes through a generic conversion to the declared type (numeric widening,
//! integral floats, numeric text, 0/1 booleans).

use crate::{
    error::CoercionError,
    traits::FieldValue,
    value::{Value, ValueType, parse_datetime},
};
use chrono::NaiveDateTime;

/// Convert a value to `i64` under the generic conversion policy.
pub(crate) fn coerce_i64(value: Value, target: ValueType) -> Result<i64, CoercionError> {
    match value {
        Value::Int(v) => Ok(v),
        Value::Bool(v) => Ok(i64::from(v)),
        Value::Float(v) => float_to_i64(v),
        Value::Text(text) => {
            let trimmed = text.trim();
            if let Ok(v) = trimmed.parse::<i64>() {
                return Ok(v);
            }
            match trimmed.parse::<f64>() {
                Ok(v) => float_to_i64(v),
                Err(_) => Err(CoercionError::Parse { text, target }),
            }
        }
        Value::Null => Err(CoercionError::UnexpectedNull { target }),
        other => Err(CoercionError::Mismatch {
            found: other.value_type(),
            target,
        }),
    }
}

#[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_i64(v: f64) -> Result<i64, CoercionError> {
    // 2^63 is the first float past i64::MAX
    if v.fract() != 0.0 || v < i64::MIN as f64 || v >= 9_223_372_036_854_775_808.0 {
        return Err(CoercionError::OutOfRange {
            value: v.to_string(),
            target: "i64",
        });
    }

    Ok(v as i64)
}

macro_rules! impl_field_value_int {
    ( $( $ty:ty ),* ) => {
        $(
            impl FieldValue for $ty {
                const KIND: ValueType = ValueType::Int;

                fn to_value(&self) -> Value {
                    Value::from(*self)
                }

                fn from_value(value: Value) -> Result<Self, CoercionError> {
                    let wide = coerce_i64(value, ValueType::Int)?;

                    Self::try_from(wide).map_err(|_| CoercionError::OutOfRange {
                        value: wide.to_string(),
                        target: stringify!($ty),
                    })
                }
            }
        )*
    };
}

impl_field_value_int!(i8, i16, i32, u8, u16, u32);

impl FieldValue for i64 {
    const KIND: ValueType = ValueType::Int;

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: Value) -> Result<Self, CoercionError> {
        coerce_i64(value, ValueType::Int)
    }
}

impl FieldValue for u64 {
    const KIND: ValueType = ValueType::Int;

    // values above i64::MAX travel as text rather than wrapping
    fn to_value(&self) -> Value {
        i64::try_from(*self).map_or_else(|_| Value::Text(self.to_string()), Value::Int)
    }

    fn from_value(value: Value) -> Result<Self, CoercionError> {
        if let Value::Text(text) = &value
            && let Ok(v) = text.trim().parse::<Self>()
        {
            return Ok(v);
        }
        let wide = coerce_i64(value, ValueType::Int)?;

        Self::try_from(wide).map_err(|_| CoercionError::OutOfRange {
            value: wide.to_string(),
            target: "u64",
        })
    }
}

impl FieldValue for f64 {
    const KIND: ValueType = ValueType::Float;

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    #[expect(clippy::cast_precision_loss)]
    fn from_value(value: Value) -> Result<Self, CoercionError> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as Self),
            Value::Bool(v) => Ok(if v { 1.0 } else { 0.0 }),
            Value::Text(text) => text.trim().parse().map_err(|_| CoercionError::Parse {
                text,
                target: ValueType::Float,
            }),
            Value::Null => Err(CoercionError::UnexpectedNull {
                target: ValueType::Float,
            }),
            other => Err(CoercionError::Mismatch {
                found: other.value_type(),
                target: ValueType::Float,
            }),
        }
    }
}

impl FieldValue for f32 {
    const KIND: ValueType = ValueType::Float;

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    #[expect(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> Result<Self, CoercionError> {
        f64::from_value(value).map(|v| v as Self)
    }
}

impl FieldValue for bool {
    const KIND: ValueType = ValueType::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, CoercionError> {
        match value {
            Value::Bool(v) => Ok(v),
            Value::Int(v) => Ok(v != 0),
            Value::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(CoercionError::Parse {
                    text,
                    target: ValueType::Bool,
                }),
            },
            Value::Null => Err(CoercionError::UnexpectedNull {
                target: ValueType::Bool,
            }),
            other => Err(CoercionError::Mismatch {
                found: other.value_type(),
                target: ValueType::Bool,
            }),
        }
    }
}

impl FieldValue for String {
    const KIND: ValueType = ValueType::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, CoercionError> {
        match value {
            Value::Text(v) => Ok(v),
            Value::Blob(bytes) => Self::from_utf8(bytes).map_err(|_| CoercionError::Mismatch {
                found: ValueType::Blob,
                target: ValueType::Text,
            }),
            Value::Null => Err(CoercionError::UnexpectedNull {
                target: ValueType::Text,
            }),
            other => Ok(other.to_string()),
        }
    }
}

impl FieldValue for Vec<u8> {
    const KIND: ValueType = ValueType::Blob;

    fn to_value(&self) -> Value {
        Value::Blob(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, CoercionError> {
        match value {
            Value::Blob(v) => Ok(v),
            Value::Text(text) => Ok(text.into_bytes()),
            Value::Null => Err(CoercionError::UnexpectedNull {
                target: ValueType::Blob,
            }),
            other => Err(CoercionError::Mismatch {
                found: other.value_type(),
                target: ValueType::Blob,
            }),
        }
    }
}

impl FieldValue for NaiveDateTime {
    const KIND: ValueType = ValueType::DateTime;

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn from_value(value: Value) -> Result<Self, CoercionError> {
        match value {
            Value::DateTime(v) => Ok(v),
            Value::Text(text) => parse_datetime(&text).ok_or(CoercionError::Parse {
                text,
                target: ValueType::DateTime,
            }),
            Value::Null => Err(CoercionError::UnexpectedNull {
                target: ValueType::DateTime,
            }),
            other => Err(CoercionError::Mismatch {
                found: other.value_type(),
                target: ValueType::DateTime,
            }),
        }
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const KIND: ValueType = T::KIND;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldValue::to_value)
    }

    fn from_value(value: Value) -> Result<Self, CoercionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

///
/// impl_enum_field_value
///
/// Map a fieldless enum onto its integer representation.
/// The enum must implement `Copy`, `Into<i64>` and `TryFrom<i64>`.
///

#[macro_export]
macro_rules! impl_enum_field_value {
    ($ty:ty) => {
        impl $crate::traits::FieldValue for $ty {
            const KIND: $crate::value::ValueType = $crate::value::ValueType::Int;

            fn to_value(&self) -> $crate::value::Value {
                $crate::value::Value::Int(::core::convert::Into::<i64>::into(*self))
            }

            fn from_value(
                value: $crate::value::Value,
            ) -> ::core::result::Result<Self, $crate::error::CoercionError> {
                let repr = <i64 as $crate::traits::FieldValue>::from_value(value)?;

                <Self as ::core::convert::TryFrom<i64>>::try_from(repr).map_err(|_| {
                    $crate::error::CoercionError::OutOfRange {
                        value: repr.to_string(),
                        target: ::core::stringify!($ty),
                    }
                })
            }
        }
    };
}
