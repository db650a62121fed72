//! Object-relational mapping for Wrapee.
//!
//! Stores plain Rust structs as SQLite rows without per-type SQL. Each
//! entity type declares its fields once through [`Entity::descriptor`];
//! everything else is derived from that declaration.
//!
//! # Components
//!
//! | Component | Role |
//! |-----------|------|
//! | [`SchemaInspector`] | Classifies an entity's fields (identifier, stored, reference), climbing storable ancestors, and caches the result per type. |
//! | [`Dao`] / [`DaoSession`] | CRUD for one type in one table, built on the classification. |
//! | [`TableSet`] | Emits `CREATE TABLE` per entity and drives the drop-and-recreate upgrade. |
//!
//! # Column naming
//!
//! | Field role | Column |
//! |------------|--------|
//! | identifier | `_id_` + field name |
//! | stored | field name |
//! | reference | `_rid_` + field name |
//!
//! Booleans are stored as `#t` / `#f` and instants as epoch milliseconds.
//!
//! # Usage
//!
//! ```rust,ignore
//! use wrapee_orm::{Dao, SchemaInspector, TableSet};
//!
//! let inspector = SchemaInspector::new();
//! let tables = TableSet::new().register::<Item>(&inspector, "items")?;
//! let db = wrapee_db::Database::open("app.db", 1, Default::default(), &tables)?;
//!
//! let items: Dao<Item> = Dao::new(db, inspector.classify::<Item>()?, "items");
//! let session = items.open()?;
//! let id = session.insert(&item, true)?;
//! let fetched = session.fetch(id)?;
//! ```

mod dao;
mod error;
mod marshal;
mod schema;
mod table;

pub use dao::{Dao, DaoSession};
pub use error::{DaoError, MarshalError, StructureError};
pub use schema::{
    Classification, Entity, FieldDescriptor, Identifiable, SchemaInspector, TypeDescriptor,
};
pub use table::{create_table_sql, drop_table_sql, ManagedTable, TableSet};

pub use wrapee_types::{FieldMarker, SemanticType, Value, ValueError};

#[cfg(test)]
mod tests;
