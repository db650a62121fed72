//! Error types for the storage layer.

use crate::cursor::CursorError;

/// Errors raised by the storage engine and its lifecycle.
///
/// The mapping layer propagates these unchanged.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A SQLite statement failed.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The connection pool could not be built or could not hand out a
    /// connection.
    #[error("failed to obtain database connection: {0}")]
    Pool(#[from] r2d2::Error),

    /// A cursor column could not be read.
    #[error("cursor error: {0}")]
    Cursor(#[from] CursorError),

    /// The database on disk is newer than the requested schema version.
    #[error("cannot downgrade database from version {stored} to {requested}")]
    Downgrade { stored: u32, requested: u32 },

    /// Schema versions start at 1.
    #[error("database version must be at least 1, got {0}")]
    InvalidVersion(u32),
}
