//! The closed scalar value type moved between entities and rows.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{encode_bool, SemanticType};

/// A single field value.
///
/// One variant per [`SemanticType`]. Enumerations carry the variant name;
/// resolving the name back into a Rust enum is the entity's job (see
/// [`Value::into_enum`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Text(String),
    Instant(DateTime<Utc>),
    Enumeration(String),
}

/// Errors converting a [`Value`] into a native field type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    /// The value's variant does not fit the requested type.
    #[error("expected a {expected} value, found {found}")]
    TypeMismatch {
        expected: SemanticType,
        found: SemanticType,
    },

    /// An integral value does not fit the target width.
    #[error("value {value} is out of range for {target}")]
    OutOfRange { value: i64, target: SemanticType },

    /// An enumeration name did not resolve to a variant.
    #[error("unknown enumeration variant: {0}")]
    UnknownVariant(String),

    /// The entity has no field with this name.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// An epoch offset outside the representable instant range.
    #[error("epoch milliseconds {0} do not form a valid instant")]
    InvalidInstant(i64),
}

impl Value {
    /// Builds an enumeration value from a variant name.
    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::Enumeration(name.into())
    }

    /// Builds an instant from epoch milliseconds.
    pub fn from_epoch_millis(millis: i64) -> Result<Self, ValueError> {
        DateTime::from_timestamp_millis(millis)
            .map(Self::Instant)
            .ok_or(ValueError::InvalidInstant(millis))
    }

    /// Returns the semantic type this value belongs to.
    pub fn semantic_type(&self) -> SemanticType {
        match self {
            Self::Byte(_) => SemanticType::Byte,
            Self::Short(_) => SemanticType::Short,
            Self::Int(_) => SemanticType::Int,
            Self::Long(_) => SemanticType::Long,
            Self::Float(_) => SemanticType::Float,
            Self::Double(_) => SemanticType::Double,
            Self::Boolean(_) => SemanticType::Boolean,
            Self::Text(_) => SemanticType::Text,
            Self::Instant(_) => SemanticType::Instant,
            Self::Enumeration(_) => SemanticType::Enumeration,
        }
    }

    /// Returns the value widened to `i64` if it is integral.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Byte(v) => Some(i64::from(v)),
            Self::Short(v) => Some(i64::from(v)),
            Self::Int(v) => Some(i64::from(v)),
            Self::Long(v) => Some(v),
            _ => None,
        }
    }

    /// Encodes the value in its column text form.
    ///
    /// Instants become epoch milliseconds and booleans become `#t` / `#f`.
    /// Everything else uses its plain textual representation.
    pub fn to_column_text(&self) -> String {
        match self {
            Self::Byte(v) => v.to_string(),
            Self::Short(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Long(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Double(v) => v.to_string(),
            Self::Boolean(v) => encode_bool(*v).to_string(),
            Self::Text(v) | Self::Enumeration(v) => v.clone(),
            Self::Instant(v) => v.timestamp_millis().to_string(),
        }
    }

    /// Resolves an enumeration value through `FromStr`.
    pub fn into_enum<E: std::str::FromStr>(self) -> Result<E, ValueError> {
        match self {
            Self::Enumeration(name) | Self::Text(name) => {
                name.parse().map_err(|_| ValueError::UnknownVariant(name))
            }
            other => Err(ValueError::TypeMismatch {
                expected: SemanticType::Enumeration,
                found: other.semantic_type(),
            }),
        }
    }

    fn mismatch(&self, expected: SemanticType) -> ValueError {
        ValueError::TypeMismatch {
            expected,
            found: self.semantic_type(),
        }
    }
}

macro_rules! integral_conversions {
    ($($native:ty => $variant:ident),* $(,)?) => {$(
        impl From<$native> for Value {
            fn from(v: $native) -> Self {
                Self::$variant(v)
            }
        }

        impl TryFrom<Value> for $native {
            type Error = ValueError;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                let wide = value
                    .as_i64()
                    .ok_or_else(|| value.mismatch(SemanticType::$variant))?;
                <$native>::try_from(wide).map_err(|_| ValueError::OutOfRange {
                    value: wide,
                    target: SemanticType::$variant,
                })
            }
        }
    )*};
}

integral_conversions!(i8 => Byte, i16 => Short, i32 => Int, i64 => Long);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl TryFrom<Value> for f32 {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Double(v) => Ok(v as f32),
            other => Err(other.mismatch(SemanticType::Float)),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Float(v) => Ok(f64::from(v)),
            Value::Double(v) => Ok(v),
            other => Err(other.mismatch(SemanticType::Double)),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl TryFrom<Value> for bool {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Boolean(v) => Ok(v),
            other => Err(other.mismatch(SemanticType::Boolean)),
        }
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

impl TryFrom<Value> for String {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(other.mismatch(SemanticType::Text)),
        }
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Instant(v)
    }
}

impl TryFrom<Value> for DateTime<Utc> {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Instant(v) => Ok(v),
            other => Err(other.mismatch(SemanticType::Instant)),
        }
    }
}
