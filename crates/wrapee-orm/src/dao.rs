//! Data access objects: CRUD for one entity type in one table.

use std::marker::PhantomData;
use std::sync::Arc;

use rusqlite::Connection;
use wrapee_db::{ColumnValues, Cursor, Database, RelationalStore, Session, StoreError};
use wrapee_types::ValueError;

use crate::error::{DaoError, MarshalError};
use crate::marshal::{from_cursor, to_column_values};
use crate::schema::{Classification, Entity};

/// Binds an entity type to a table.
///
/// Holds no row data. The column list is derived once at construction
/// and stays fixed: identifier, stored fields, then references.
pub struct Dao<T: Entity> {
    db: Database,
    table: String,
    schema: Arc<Classification>,
    columns: Vec<String>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> std::fmt::Debug for Dao<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dao")
            .field("table", &self.table)
            .field("type_name", &self.schema.type_name())
            .field("columns", &self.columns)
            .finish()
    }
}

impl<T: Entity> Dao<T> {
    pub fn new(db: Database, schema: Arc<Classification>, table: impl Into<String>) -> Self {
        let columns = schema.column_names();
        Self {
            db,
            table: table.into(),
            schema,
            columns,
            _entity: PhantomData,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Columns read by every fetch, in order.
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn schema(&self) -> &Classification {
        &self.schema
    }

    /// Opens a session. The connection is released when the session is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns `DaoError::Store` if no connection is available.
    pub fn open(&self) -> Result<DaoSession<'_, T>, DaoError> {
        Ok(DaoSession {
            dao: self,
            conn: self.db.session()?,
        })
    }

    /// Reads the foreign id of reference field `field` from the cursor's
    /// current row. `field` is the declared name, without prefix.
    ///
    /// Returns `Ok(None)` when the reference was not set at write time.
    ///
    /// # Errors
    ///
    /// Returns `DaoError::Marshal` if `field` is not a declared reference,
    /// or if the cursor is not positioned or lacks the column.
    pub fn reference_id(&self, cursor: &Cursor, field: &str) -> Result<Option<i64>, DaoError> {
        let marshal_error = |source| DaoError::Marshal {
            type_name: self.schema.type_name().to_string(),
            field: field.to_string(),
            source,
        };

        let Some(column) = self.schema.reference_column(field) else {
            let unknown = ValueError::UnknownField(field.to_string());
            return Err(marshal_error(MarshalError::Value(unknown)));
        };
        cursor
            .get_i64(column.as_str())
            .map_err(|e| marshal_error(MarshalError::Cursor(e)))
    }

    fn id_predicate(&self, row_id: i64) -> String {
        format!("{} = {row_id}", self.schema.id_column())
    }
}

/// An open data access session.
pub struct DaoSession<'d, T: Entity> {
    dao: &'d Dao<T>,
    conn: Session,
}

impl<T: Entity> DaoSession<'_, T> {
    /// The underlying connection, for queries the DAO does not cover.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn payload(
        &self,
        entity: &T,
        include_id: bool,
        operation: &'static str,
    ) -> Result<ColumnValues, DaoError> {
        to_column_values(&self.dao.schema, entity, include_id).inspect_err(|e| {
            tracing::error!(
                table = self.dao.table.as_str(),
                operation,
                error = %e,
                "failed to marshal entity"
            );
        })
    }

    /// Inserts `entity` and returns the new row id.
    ///
    /// With `generate_id` the identifier column is left out and the
    /// database assigns it; otherwise the entity's own id is written. The
    /// entity itself is not modified.
    ///
    /// # Errors
    ///
    /// Returns `DaoError::Marshal` if a field cannot be encoded (nothing is
    /// written) or `DaoError::Store` if the insert fails.
    pub fn insert(&self, entity: &T, generate_id: bool) -> Result<i64, DaoError> {
        let values = self.payload(entity, !generate_id, "insert")?;
        Ok(self.conn.insert(&self.dao.table, &values)?)
    }

    /// Overwrites row `row_id` with `entity`, identifier included.
    ///
    /// Returns `true` if a row was updated.
    ///
    /// # Errors
    ///
    /// Same as [`DaoSession::insert`].
    pub fn update(&self, entity: &T, row_id: i64) -> Result<bool, DaoError> {
        let values = self.payload(entity, true, "update")?;
        let affected = self.conn.update(
            &self.dao.table,
            &values,
            Some(self.dao.id_predicate(row_id).as_str()),
        )?;
        Ok(affected > 0)
    }

    /// Deletes row `row_id`. Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `DaoError::Store` if the delete fails.
    pub fn delete(&self, row_id: i64) -> Result<bool, DaoError> {
        let affected = self
            .conn
            .delete(&self.dao.table, Some(self.dao.id_predicate(row_id).as_str()))?;
        Ok(affected > 0)
    }

    /// Deletes every row matching the raw SQL `predicate` (all rows for
    /// `None`) and returns the count.
    ///
    /// # Errors
    ///
    /// Returns `DaoError::Store` if the delete fails.
    pub fn delete_where(&self, predicate: Option<&str>) -> Result<usize, DaoError> {
        Ok(self.conn.delete(&self.dao.table, predicate)?)
    }

    fn select(&self, predicate: Option<&str>) -> Result<Cursor, DaoError> {
        Ok(self
            .conn
            .query(&self.dao.table, &self.dao.columns, predicate)?)
    }

    fn rebuild(&self, cursor: &Cursor, operation: &'static str) -> Result<T, DaoError> {
        from_cursor(&self.dao.schema, cursor).inspect_err(|e| {
            tracing::error!(
                table = self.dao.table.as_str(),
                operation,
                row = ?cursor.position(),
                error = %e,
                "failed to rebuild entity from row"
            );
        })
    }

    /// Fetches row `row_id`. `Ok(None)` means no such row.
    ///
    /// Reference fields come back unset.
    ///
    /// # Errors
    ///
    /// Returns `DaoError::Marshal` if the row cannot be rebuilt and
    /// `DaoError::Store` if the query fails.
    pub fn fetch(&self, row_id: i64) -> Result<Option<T>, DaoError> {
        let mut cursor = self.select(Some(self.dao.id_predicate(row_id).as_str()))?;
        if !cursor.move_to_first() {
            return Ok(None);
        }
        self.rebuild(&cursor, "fetch").map(Some)
    }

    /// Fetches every row matching `predicate` (all rows for `None`), in
    /// result order.
    ///
    /// All or nothing: if any row fails to rebuild, no rows are returned.
    ///
    /// # Errors
    ///
    /// Returns `DaoError::Row` naming the first row that failed, or
    /// `DaoError::Store` if the query fails.
    pub fn fetch_all(&self, predicate: Option<&str>) -> Result<Vec<T>, DaoError> {
        let mut cursor = self.select(predicate)?;
        let mut entities = Vec::with_capacity(cursor.count());

        cursor.move_to_first();
        while !cursor.is_after_last() {
            let entity = self
                .rebuild(&cursor, "fetch_all")
                .map_err(|source| DaoError::Row {
                    row: entities.len(),
                    source: Box::new(source),
                })?;
            entities.push(entity);
            cursor.move_to_next();
        }

        Ok(entities)
    }

    /// Returns the cursor for row `row_id`, positioned on it, or `None`
    /// if there is no such row.
    ///
    /// # Errors
    ///
    /// Returns `DaoError::Store` if the query fails.
    pub fn fetch_cursor(&self, row_id: i64) -> Result<Option<Cursor>, DaoError> {
        let mut cursor = self.select(Some(self.dao.id_predicate(row_id).as_str()))?;
        Ok(cursor.move_to_first().then_some(cursor))
    }

    /// Returns the cursor over rows matching `predicate`, positioned on
    /// the first one.
    ///
    /// # Errors
    ///
    /// Returns `DaoError::Store` if the query fails.
    pub fn fetch_cursor_where(&self, predicate: Option<&str>) -> Result<Cursor, DaoError> {
        let mut cursor = self.select(predicate)?;
        cursor.move_to_first();
        Ok(cursor)
    }

    /// Counts rows matching `predicate` (all rows for `None`).
    ///
    /// # Errors
    ///
    /// Returns `DaoError::Store` if the query fails.
    pub fn count_entries(&self, predicate: Option<&str>) -> Result<i64, DaoError> {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.dao.table);
        if let Some(p) = predicate.filter(|p| !p.trim().is_empty()) {
            sql.push_str(" WHERE ");
            sql.push_str(p);
        }

        let mut cursor = self.conn.raw_query(&sql)?;
        cursor.move_to_first();
        let count = cursor.get_i64(0).map_err(StoreError::from)?.unwrap_or(0);
        Ok(count)
    }
}
