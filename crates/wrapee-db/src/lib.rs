//! Storage layer for Wrapee.
//!
//! Provides SQLite connection pooling (via `r2d2`), the [`RelationalStore`]
//! operations the mapping layer is written against, a materialized
//! [`Cursor`] over query results, and the versioned create/upgrade
//! lifecycle of a [`Database`].
//!
//! # Design decisions
//!
//! - **`r2d2` connection pool**: a session is a pooled connection guard.
//!   Dropping the guard releases the session on every exit path, so there
//!   is no manual open/close counter to keep balanced.
//! - **`PRAGMA user_version`**: the schema version lives in the database
//!   header. [`Database::open`] compares it with the requested version and
//!   invokes the [`SchemaHooks`] create or upgrade callback inside a single
//!   transaction.
//! - **Bound values, raw predicates**: column values are always bound as
//!   parameters. Predicates are caller-supplied SQL text and are inserted
//!   verbatim.

mod cursor;
mod database;
mod error;
mod pool;
mod store;

pub use cursor::{ColumnIndex, Cursor, CursorError};
pub use database::{Database, SchemaHooks, Session};
pub use error::StoreError;
pub use pool::{create_pool, DbPool, DbRuntimeSettings};
pub use store::{ColumnValues, RelationalStore};
