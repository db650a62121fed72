//! Table-level write and read operations over a SQLite connection.

use rusqlite::{params_from_iter, Connection};

use crate::cursor::Cursor;
use crate::error::StoreError;

/// An ordered set of column/value pairs for an insert or update.
///
/// Values are carried in their textual column form; SQLite's column
/// affinity converts them to the declared storage class on write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnValues {
    entries: Vec<(String, String)>,
}

impl ColumnValues {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column value, replacing any earlier value for that column.
    pub fn put(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    /// Returns the value written for `column`, if any.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if the payload writes `column`.
    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Column names in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    /// Number of columns written.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no column is written.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, v)| v.as_str())
    }
}

fn where_suffix(predicate: Option<&str>) -> String {
    match predicate {
        Some(p) if !p.trim().is_empty() => format!(" WHERE {p}"),
        _ => String::new(),
    }
}

/// The relational operations the mapping layer needs from a storage engine.
///
/// Table and column names come from entity declarations and are written
/// into the SQL as-is. Predicates are caller-supplied SQL and are not
/// validated; `None` matches every row.
pub trait RelationalStore {
    /// Executes one or more DDL statements.
    fn execute_ddl(&self, ddl: &str) -> Result<(), StoreError>;

    /// Inserts one row and returns its row id.
    fn insert(&self, table: &str, values: &ColumnValues) -> Result<i64, StoreError>;

    /// Updates matching rows and returns how many were affected.
    fn update(
        &self,
        table: &str,
        values: &ColumnValues,
        predicate: Option<&str>,
    ) -> Result<usize, StoreError>;

    /// Deletes matching rows and returns how many were affected.
    fn delete(&self, table: &str, predicate: Option<&str>) -> Result<usize, StoreError>;

    /// Selects distinct `columns` from matching rows.
    fn query(
        &self,
        table: &str,
        columns: &[String],
        predicate: Option<&str>,
    ) -> Result<Cursor, StoreError>;

    /// Runs an arbitrary query.
    fn raw_query(&self, sql: &str) -> Result<Cursor, StoreError>;
}

impl RelationalStore for Connection {
    fn execute_ddl(&self, ddl: &str) -> Result<(), StoreError> {
        tracing::debug!(sql = ddl, "executing ddl");
        self.execute_batch(ddl)?;
        Ok(())
    }

    fn insert(&self, table: &str, values: &ColumnValues) -> Result<i64, StoreError> {
        let sql = if values.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES")
        } else {
            let columns: Vec<&str> = values.columns().collect();
            let placeholders: Vec<String> =
                (1..=values.len()).map(|i| format!("?{i}")).collect();
            format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        tracing::debug!(table, columns = ?values.columns().collect::<Vec<_>>(), "inserting row");
        self.execute(&sql, params_from_iter(values.values()))?;
        Ok(self.last_insert_rowid())
    }

    fn update(
        &self,
        table: &str,
        values: &ColumnValues,
        predicate: Option<&str>,
    ) -> Result<usize, StoreError> {
        if values.is_empty() {
            return Ok(0);
        }
        let assignments: Vec<String> = values
            .columns()
            .enumerate()
            .map(|(i, c)| format!("{c} = ?{}", i + 1))
            .collect();
        let sql = format!(
            "UPDATE {table} SET {}{}",
            assignments.join(", "),
            where_suffix(predicate)
        );

        tracing::debug!(table, predicate = ?predicate, "updating rows");
        Ok(self.execute(&sql, params_from_iter(values.values()))?)
    }

    fn delete(&self, table: &str, predicate: Option<&str>) -> Result<usize, StoreError> {
        let sql = format!("DELETE FROM {table}{}", where_suffix(predicate));
        tracing::debug!(table, predicate = ?predicate, "deleting rows");
        Ok(self.execute(&sql, [])?)
    }

    fn query(
        &self,
        table: &str,
        columns: &[String],
        predicate: Option<&str>,
    ) -> Result<Cursor, StoreError> {
        let sql = format!(
            "SELECT DISTINCT {} FROM {table}{}",
            columns.join(", "),
            where_suffix(predicate)
        );
        self.raw_query(&sql)
    }

    fn raw_query(&self, sql: &str) -> Result<Cursor, StoreError> {
        tracing::debug!(sql, "running query");
        let mut stmt = self.prepare(sql)?;
        Ok(Cursor::from_statement(&mut stmt, [])?)
    }
}
