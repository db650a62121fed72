//! Conversion between entity instances and rows.

use wrapee_db::{ColumnValues, Cursor};
use wrapee_types::{decode_bool, SemanticType, Value, ValueError};

use crate::error::{DaoError, MarshalError};
use crate::schema::{Classification, Entity, FieldDescriptor};

fn field_error(schema: &Classification, field: &FieldDescriptor, source: MarshalError) -> DaoError {
    DaoError::Marshal {
        type_name: schema.type_name().to_string(),
        field: field.name().to_string(),
        source,
    }
}

/// Narrows a row integer to the declared integral width.
fn integral(semantic_type: SemanticType, raw: i64) -> Result<Value, ValueError> {
    let out_of_range = |_| ValueError::OutOfRange {
        value: raw,
        target: semantic_type,
    };
    Ok(match semantic_type {
        SemanticType::Byte => Value::Byte(i8::try_from(raw).map_err(out_of_range)?),
        SemanticType::Short => Value::Short(i16::try_from(raw).map_err(out_of_range)?),
        SemanticType::Int => Value::Int(i32::try_from(raw).map_err(out_of_range)?),
        _ => Value::Long(raw),
    })
}

/// Builds the write payload for `entity`.
///
/// The identifier column is written only when `include_id` is set.
/// Reference columns are left out entirely when the reference is unset.
pub(crate) fn to_column_values<T: Entity>(
    schema: &Classification,
    entity: &T,
    include_id: bool,
) -> Result<ColumnValues, DaoError> {
    let mut values = ColumnValues::new();

    if include_id {
        let field = schema.identifier();
        let id = entity
            .get(field.name())
            .ok_or_else(|| field_error(schema, field, MarshalError::MissingValue))?;
        if id.as_i64().is_none() {
            return Err(field_error(
                schema,
                field,
                MarshalError::WrongType {
                    declared: field.semantic_type(),
                    found: id.semantic_type(),
                },
            ));
        }
        values.put(field.column(), id.to_column_text());
    }

    for field in schema.stored() {
        let value = entity
            .get(field.name())
            .ok_or_else(|| field_error(schema, field, MarshalError::MissingValue))?;
        if value.semantic_type() != field.semantic_type() {
            return Err(field_error(
                schema,
                field,
                MarshalError::WrongType {
                    declared: field.semantic_type(),
                    found: value.semantic_type(),
                },
            ));
        }
        values.put(field.column(), value.to_column_text());
    }

    for field in schema.references() {
        if let Some(target) = entity.reference(field.name()) {
            values.put(field.column(), target.id().to_string());
        }
    }

    Ok(values)
}

fn required<V>(column: &str, value: Option<V>) -> Result<V, MarshalError> {
    value.ok_or_else(|| MarshalError::NullColumn(column.to_string()))
}

/// Reads one stored field from the current row.
///
/// `Ok(None)` means the field stays unset, which only happens for a NULL
/// enumeration.
fn read_field(cursor: &Cursor, field: &FieldDescriptor) -> Result<Option<Value>, MarshalError> {
    let column = field.column();
    let column = column.as_str();

    let value = match field.semantic_type() {
        SemanticType::Byte | SemanticType::Short | SemanticType::Int | SemanticType::Long => {
            let raw = required(column, cursor.get_i64(column)?)?;
            integral(field.semantic_type(), raw)?
        }
        SemanticType::Float => Value::Float(required(column, cursor.get_f64(column)?)? as f32),
        SemanticType::Double => Value::Double(required(column, cursor.get_f64(column)?)?),
        SemanticType::Boolean => {
            Value::Boolean(decode_bool(&required(column, cursor.get_string(column)?)?))
        }
        SemanticType::Text => Value::Text(required(column, cursor.get_string(column)?)?),
        SemanticType::Instant => {
            Value::from_epoch_millis(required(column, cursor.get_i64(column)?)?)?
        }
        SemanticType::Enumeration => match cursor.get_string(column)? {
            Some(name) => Value::Enumeration(name),
            None => return Ok(None),
        },
    };

    Ok(Some(value))
}

/// Rebuilds an entity from the cursor's current row.
///
/// Reference fields are left at their default; read their ids with
/// [`crate::Dao::reference_id`].
pub(crate) fn from_cursor<T: Entity>(
    schema: &Classification,
    cursor: &Cursor,
) -> Result<T, DaoError> {
    let mut entity = T::default();

    let id_field = schema.identifier();
    let id_column = id_field.column();
    let id = cursor
        .get_i64(id_column.as_str())
        .map_err(MarshalError::from)
        .and_then(|raw| required(&id_column, raw))
        .and_then(|raw| Ok(integral(id_field.semantic_type(), raw)?))
        .and_then(|value| Ok(entity.set(id_field.name(), value)?));
    id.map_err(|e| field_error(schema, id_field, e))?;

    for field in schema.stored() {
        let value = read_field(cursor, field).map_err(|e| field_error(schema, field, e))?;
        if let Some(value) = value {
            entity
                .set(field.name(), value)
                .map_err(|e| field_error(schema, field, e.into()))?;
        }
    }

    Ok(entity)
}
