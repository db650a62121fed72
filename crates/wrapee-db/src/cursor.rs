//! Materialized query results with positional navigation.
//!
//! A [`Cursor`] owns every row of a result set, so it can outlive the
//! statement that produced it. It starts positioned before the first row;
//! typed getters read from the current row and coerce between SQLite
//! storage classes the way SQLite itself does for numeric text.

use rusqlite::types::Value as SqlValue;
use rusqlite::{Params, Statement};
use thiserror::Error;

/// Errors reading a cursor column.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CursorError {
    /// No column with this name in the result set.
    #[error("no such column: {0}")]
    NoSuchColumn(String),

    /// Column index past the end of the result set.
    #[error("column index {0} out of bounds")]
    IndexOutOfBounds(usize),

    /// The cursor is before the first row or after the last one.
    #[error("cursor is not positioned on a row")]
    NotPositioned,

    /// The stored value cannot be read as the requested type.
    #[error("column '{column}' cannot be read as {target}")]
    Conversion {
        column: String,
        target: &'static str,
    },
}

/// Addresses a cursor column by position or by name.
pub trait ColumnIndex {
    /// Resolves to a column position in `cursor`.
    fn resolve(&self, cursor: &Cursor) -> Result<usize, CursorError>;
}

impl ColumnIndex for usize {
    fn resolve(&self, cursor: &Cursor) -> Result<usize, CursorError> {
        if *self < cursor.columns.len() {
            Ok(*self)
        } else {
            Err(CursorError::IndexOutOfBounds(*self))
        }
    }
}

impl ColumnIndex for &str {
    fn resolve(&self, cursor: &Cursor) -> Result<usize, CursorError> {
        cursor
            .column_index(self)
            .ok_or_else(|| CursorError::NoSuchColumn((*self).to_string()))
    }
}

impl ColumnIndex for &String {
    fn resolve(&self, cursor: &Cursor) -> Result<usize, CursorError> {
        self.as_str().resolve(cursor)
    }
}

/// A fully read result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    /// `None` until the first move.
    position: Option<usize>,
}

impl Cursor {
    /// Builds a cursor from column names and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns,
            rows,
            position: None,
        }
    }

    /// Runs `stmt` and reads every row into a cursor.
    pub fn from_statement<P: Params>(
        stmt: &mut Statement<'_>,
        params: P,
    ) -> rusqlite::Result<Self> {
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut result = stmt.query(params)?;
        while let Some(row) = result.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(row.get::<_, SqlValue>(i)?);
            }
            rows.push(values);
        }

        Ok(Self::new(columns, rows))
    }

    /// Number of rows in the result set.
    pub fn count(&self) -> usize {
        self.rows.len()
    }

    /// Column names in result order.
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Position of the named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Current row position, if the cursor has been moved.
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Moves to the first row. Returns `false` when the result is empty.
    pub fn move_to_first(&mut self) -> bool {
        self.position = Some(0);
        !self.rows.is_empty()
    }

    /// Moves to the next row. Returns `false` once past the last row.
    pub fn move_to_next(&mut self) -> bool {
        let next = self.position.map_or(0, |p| (p + 1).min(self.rows.len()));
        self.position = Some(next);
        next < self.rows.len()
    }

    /// Returns `true` when positioned past the last row, or when empty.
    pub fn is_after_last(&self) -> bool {
        if self.rows.is_empty() {
            return true;
        }
        matches!(self.position, Some(p) if p >= self.rows.len())
    }

    fn current(&self) -> Result<&[SqlValue], CursorError> {
        self.position
            .and_then(|p| self.rows.get(p))
            .map(Vec::as_slice)
            .ok_or(CursorError::NotPositioned)
    }

    fn cell<I: ColumnIndex>(&self, index: I) -> Result<(usize, &SqlValue), CursorError> {
        let i = index.resolve(self)?;
        let row = self.current()?;
        row.get(i)
            .map(|v| (i, v))
            .ok_or(CursorError::IndexOutOfBounds(i))
    }

    fn conversion(&self, i: usize, target: &'static str) -> CursorError {
        CursorError::Conversion {
            column: self.columns[i].clone(),
            target,
        }
    }

    /// Returns `true` if the column holds NULL on the current row.
    pub fn is_null<I: ColumnIndex>(&self, index: I) -> Result<bool, CursorError> {
        let (_, value) = self.cell(index)?;
        Ok(matches!(value, SqlValue::Null))
    }

    /// Reads the column as a 64-bit integer. NULL reads as `None`.
    pub fn get_i64<I: ColumnIndex>(&self, index: I) -> Result<Option<i64>, CursorError> {
        let (i, value) = self.cell(index)?;
        match value {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(v) => Ok(Some(*v)),
            SqlValue::Real(v) => Ok(Some(*v as i64)),
            SqlValue::Text(text) => {
                let text = text.trim();
                text.parse::<i64>()
                    .ok()
                    .or_else(|| text.parse::<f64>().ok().map(|f| f as i64))
                    .map(Some)
                    .ok_or_else(|| self.conversion(i, "integer"))
            }
            SqlValue::Blob(_) => Err(self.conversion(i, "integer")),
        }
    }

    /// Reads the column as a 64-bit float. NULL reads as `None`.
    pub fn get_f64<I: ColumnIndex>(&self, index: I) -> Result<Option<f64>, CursorError> {
        let (i, value) = self.cell(index)?;
        match value {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(v) => Ok(Some(*v as f64)),
            SqlValue::Real(v) => Ok(Some(*v)),
            SqlValue::Text(text) => text
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| self.conversion(i, "real")),
            SqlValue::Blob(_) => Err(self.conversion(i, "real")),
        }
    }

    /// Reads the column as text. NULL reads as `None`.
    pub fn get_string<I: ColumnIndex>(&self, index: I) -> Result<Option<String>, CursorError> {
        let (i, value) = self.cell(index)?;
        match value {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(v) => Ok(Some(v.to_string())),
            SqlValue::Real(v) => Ok(Some(v.to_string())),
            SqlValue::Text(text) => Ok(Some(text.clone())),
            SqlValue::Blob(bytes) => String::from_utf8(bytes.clone())
                .map(Some)
                .map_err(|_| self.conversion(i, "text")),
        }
    }
}
