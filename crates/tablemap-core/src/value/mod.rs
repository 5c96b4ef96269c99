mod coercion;
mod row;


use chrono::{NaiveDate, NaiveDateTime, Timelike};
use derive_more::Display;
use std::fmt;

pub use row::RowDictionary;

///
/// ValueType
///
/// Declared or observed kind of a scalar value.
/// `Null` only ever describes an observed value, never a declared field.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ValueType {
    #[display("null")]
    Null,
    #[display("bool")]
    Bool,
    #[display("int")]
    Int,
    #[display("float")]
    Float,
    #[display("text")]
    Text,
    #[display("blob")]
    Blob,
    #[display("datetime")]
    DateTime,
}

///
/// Value
///
/// Dynamically typed scalar exchanged with backends.
/// Null → SQL NULL (and `Option::None` on the domain side).
///

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
    DateTime(NaiveDateTime),
}

impl Value {
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Text(_) => ValueType::Text,
            Self::Blob(_) => ValueType::Blob,
            Self::DateTime(_) => ValueType::DateTime,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Interpret a count/scalar result as an integer.
    ///
    /// Backends disagree on the type of `count(0)`; integers, integral floats,
    /// and numeric text are all accepted.
    #[must_use]
    pub fn as_count(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            #[expect(clippy::cast_possible_truncation)]
            Self::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Self::Bool(v) => Some(i64::from(*v)),
            Self::Text(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    /// Replace datetimes with their canonical text form.
    ///
    /// Used for predicate parameters so backend-specific datetime parsers all
    /// receive the same lossless layout.
    #[must_use]
    pub fn normalize_literal(self) -> Self {
        match self {
            Self::DateTime(dt) => Self::Text(format_datetime(&dt)),
            other => other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Blob(bytes) => {
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Self::DateTime(dt) => f.write_str(&format_datetime(dt)),
        }
    }
}

/// Render a datetime as `yyyy-MM-dd HH:mm:ss.fffffff`.
#[must_use]
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    // leap-second nanos run past 1e9; clamp to the last representable tick
    let ticks = (dt.nanosecond() / 100).min(9_999_999);

    format!("{}.{ticks:07}", dt.format("%Y-%m-%d %H:%M:%S"))
}

/// Parse the datetime layouts backends commonly hand back as text.
#[must_use]
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    const LAYOUTS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
    ];

    let text = text.trim();
    LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(text, layout).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

// ---------------------------------------------------------------------
// From conversions
// ---------------------------------------------------------------------

macro_rules! value_from_int {
    ( $( $ty:ty ),* ) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::Int(i64::from(v))
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
