//! Versioned database lifecycle and pooled sessions.

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::StoreError;
use crate::pool::{create_pool, DbPool, DbRuntimeSettings};

/// A checked-out connection. Dropping it ends the session.
pub type Session = PooledConnection<SqliteConnectionManager>;

/// Callbacks that build or rebuild the schema of a versioned database.
///
/// Both callbacks run inside the transaction that also records the new
/// version, so a failing callback leaves the database untouched.
pub trait SchemaHooks {
    /// Builds the schema of a brand-new database.
    ///
    /// # Errors
    ///
    /// Any error aborts the open and rolls back the transaction.
    fn on_create(&self, conn: &Connection) -> Result<(), StoreError>;

    /// Brings a database at `old_version` up to `new_version`.
    ///
    /// # Errors
    ///
    /// Any error aborts the open and rolls back the transaction.
    fn on_upgrade(
        &self,
        conn: &Connection,
        old_version: u32,
        new_version: u32,
    ) -> Result<(), StoreError>;
}

/// A pooled, versioned SQLite database.
///
/// Cloning is cheap and shares the pool. The underlying connections are
/// closed once the last clone is dropped.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    version: u32,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("version", &self.version)
            .field("state", &self.pool.state())
            .finish()
    }
}

impl Database {
    /// Opens (creating if needed) the database at `path` and brings its
    /// schema to `version` through `hooks`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidVersion` for version 0,
    /// `StoreError::Downgrade` if the stored version is newer, and any
    /// pool, SQLite or hook error otherwise.
    pub fn open(
        path: &str,
        version: u32,
        settings: DbRuntimeSettings,
        hooks: &dyn SchemaHooks,
    ) -> Result<Self, StoreError> {
        let pool = create_pool(path, settings)?;
        Self::from_pool(pool, version, hooks)
    }

    /// Wraps an existing pool, running create/upgrade as needed.
    ///
    /// # Errors
    ///
    /// Same as [`Database::open`].
    pub fn from_pool(
        pool: DbPool,
        version: u32,
        hooks: &dyn SchemaHooks,
    ) -> Result<Self, StoreError> {
        if version == 0 {
            return Err(StoreError::InvalidVersion(version));
        }

        let conn = pool.get()?;
        prepare_schema(&conn, version, hooks)?;
        drop(conn);

        Ok(Self { pool, version })
    }

    /// Checks out a connection for the duration of a session.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Pool` if no connection becomes available.
    pub fn session(&self) -> Result<Session, StoreError> {
        Ok(self.pool.get()?)
    }

    /// Number of sessions currently checked out.
    pub fn active_sessions(&self) -> u32 {
        let state = self.pool.state();
        state.connections - state.idle_connections
    }

    /// The schema version this handle was opened at.
    pub fn version(&self) -> u32 {
        self.version
    }
}

/// Reads the schema version stored in the database header.
///
/// # Errors
///
/// Returns `StoreError::Sqlite` on SQL failure.
pub(crate) fn stored_version(conn: &Connection) -> Result<u32, StoreError> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

fn check_version(stored: u32, version: u32) -> Result<bool, StoreError> {
    if stored > version {
        return Err(StoreError::Downgrade {
            stored,
            requested: version,
        });
    }
    Ok(stored < version)
}

/// Brings the schema to `version`.
///
/// The version is read again under an immediate transaction, so concurrent
/// openers of the same file run the hooks once between them.
fn prepare_schema(
    conn: &Connection,
    version: u32,
    hooks: &dyn SchemaHooks,
) -> Result<(), StoreError> {
    if !check_version(stored_version(conn)?, version)? {
        tracing::debug!(version, "database schema is current");
        return Ok(());
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let stored = stored_version(&tx)?;
    if !check_version(stored, version)? {
        tracing::debug!(version, "database schema brought current by another opener");
        return Ok(());
    }

    if stored == 0 {
        tracing::info!(version, "creating database schema");
        hooks.on_create(&tx)?;
    } else {
        tracing::info!(from = stored, to = version, "upgrading database schema");
        hooks.on_upgrade(&tx, stored, version)?;
    }
    tx.execute_batch(&format!("PRAGMA user_version = {version};"))?;
    tx.commit()?;

    Ok(())
}
