//! Error types for schema inspection and data access.

use wrapee_db::{CursorError, StoreError};
use wrapee_types::{SemanticType, ValueError};

/// The entity declaration violates a structural requirement.
///
/// Every variant names the offending type or table.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StructureError {
    /// The inspected type lacks the storable marker.
    #[error("type {type_name} is not a storable entity")]
    NotAnEntity { type_name: String },

    /// No identifier field anywhere in the walked hierarchy.
    #[error("type {type_name} does not declare an identifier field")]
    MissingIdentifier { type_name: String },

    /// More than one identifier field in the walked hierarchy.
    #[error("type {type_name} declares more than one identifier field: {first}, {second}")]
    DuplicateIdentifier {
        type_name: String,
        first: String,
        second: String,
    },

    /// The identifier field is not of an integral type.
    #[error("identifier field {field} of type {type_name} must be integral, found {found}")]
    NonIntegralIdentifier {
        type_name: String,
        field: String,
        found: SemanticType,
    },

    /// Two fields map to the same column.
    #[error("type {type_name} maps more than one field to column {column}")]
    DuplicateColumn { type_name: String, column: String },

    /// The same table name was registered twice.
    #[error("table {table} is registered more than once")]
    DuplicateTable { table: String },
}

/// Why a single field could not be marshalled.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarshalError {
    /// The entity returned no value for a field that must be written.
    #[error("field has no value")]
    MissingValue,

    /// The entity returned a value of a different type than declared.
    #[error("declared {declared}, entity returned {found}")]
    WrongType {
        declared: SemanticType,
        found: SemanticType,
    },

    /// A column that must hold a value is NULL.
    #[error("column {0} is NULL")]
    NullColumn(String),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// Errors returned by data access operations.
#[derive(Debug, thiserror::Error)]
pub enum DaoError {
    #[error(transparent)]
    Structure(#[from] StructureError),

    /// A field could not be converted between entity and row.
    #[error("failed to marshal field '{field}' of {type_name}: {source}")]
    Marshal {
        type_name: String,
        field: String,
        source: MarshalError,
    },

    /// One row of a multi-row fetch could not be rebuilt; no rows are
    /// returned.
    #[error("failed to rebuild row {row}: {source}")]
    Row { row: usize, source: Box<DaoError> },

    /// The storage engine failed. Passed through untranslated.
    #[error(transparent)]
    Store(#[from] StoreError),
}
