//! Shared types, error definitions, and on-disk constants for Wrapee.
//!
//! This crate holds the vocabulary every other Wrapee crate speaks: the
//! closed set of semantic field types, the field role markers, the
//! [`Value`] sum type used to move scalars between entities and rows, and
//! the column naming scheme that forms the on-disk contract.
//!
//! The naming constants are part of the storage format. Changing any of
//! them makes existing databases unreadable.

use serde::{Deserialize, Serialize};

mod value;

pub use value::{Value, ValueError};

/// Column prefix for the identifier field: `_id_` + field name.
pub const ID_PREFIX: &str = "_id_";

/// Column prefix for reference fields: `_rid_` + field name.
pub const REFERENCE_PREFIX: &str = "_rid_";

/// Stored text token for `true`.
pub const BOOLEAN_TRUE: &str = "#t";

/// Stored text token for `false`.
pub const BOOLEAN_FALSE: &str = "#f";

/// Returns the column name of an identifier field.
pub fn id_column(field: &str) -> String {
    format!("{ID_PREFIX}{field}")
}

/// Returns the column name of a reference field.
pub fn reference_column(field: &str) -> String {
    format!("{REFERENCE_PREFIX}{field}")
}

/// Encodes a boolean as its sentinel token.
pub fn encode_bool(value: bool) -> &'static str {
    if value {
        BOOLEAN_TRUE
    } else {
        BOOLEAN_FALSE
    }
}

/// Decodes a sentinel token. Anything other than `#t` (in any case) is `false`.
pub fn decode_bool(token: &str) -> bool {
    token.eq_ignore_ascii_case(BOOLEAN_TRUE)
}

/// The semantic type of a persisted field.
///
/// The set is closed: every field an entity declares maps to exactly one of
/// these, and both the table generator and the row reader branch on it
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SemanticType {
    /// 8-bit signed integer.
    Byte,
    /// 16-bit signed integer.
    Short,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Stored as `#t` / `#f`.
    Boolean,
    /// UTF-8 text.
    Text,
    /// UTC instant, stored as epoch milliseconds.
    Instant,
    /// Enumeration, stored as the variant name.
    Enumeration,
}

impl SemanticType {
    /// Returns `true` for the integer family.
    pub fn is_integral(self) -> bool {
        matches!(self, Self::Byte | Self::Short | Self::Int | Self::Long)
    }

    /// Returns `true` for the floating-point family.
    pub fn is_floating(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    /// Returns the canonical label for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Byte => "BYTE",
            Self::Short => "SHORT",
            Self::Int => "INT",
            Self::Long => "LONG",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Boolean => "BOOLEAN",
            Self::Text => "TEXT",
            Self::Instant => "INSTANT",
            Self::Enumeration => "ENUMERATION",
        }
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The role marker a declared field carries.
///
/// A field carries at most one marker. Fields without a marker are ignored
/// entirely by the mapping layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldMarker {
    /// The row's primary key.
    Id,
    /// Persisted directly as a column value.
    Stored,
    /// Persisted as the referenced entity's identifier.
    Reference,
}
