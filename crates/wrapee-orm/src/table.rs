//! Table definitions derived from entity classifications.
//!
//! [`TableSet`] is the list of tables a database manages. It plugs into
//! [`wrapee_db::Database`] as the [`SchemaHooks`] implementation: a new
//! database gets one `CREATE TABLE` per registered entity, and a version
//! upgrade drops every managed table and creates it again. Upgrades keep
//! no data.

use std::sync::Arc;

use rusqlite::Connection;
use wrapee_db::{RelationalStore, SchemaHooks, StoreError};

use crate::error::StructureError;
use crate::schema::{Classification, Entity, FieldDescriptor, SchemaInspector};

fn stored_column_type(field: &FieldDescriptor) -> &'static str {
    let ty = field.semantic_type();
    if ty.is_floating() {
        "REAL"
    } else if ty.is_integral() {
        "INTEGER"
    } else {
        "TEXT NOT NULL"
    }
}

/// Builds the `CREATE TABLE` statement for `schema`.
pub fn create_table_sql(table: &str, schema: &Classification) -> String {
    let mut columns = vec![format!(
        "{} INTEGER PRIMARY KEY AUTOINCREMENT",
        schema.id_column()
    )];
    columns.extend(
        schema
            .stored()
            .iter()
            .map(|f| format!("{} {}", f.column(), stored_column_type(f))),
    );
    columns.extend(
        schema
            .references()
            .iter()
            .map(|f| format!("{} INTEGER", f.column())),
    );

    format!("CREATE TABLE {table} ({});", columns.join(", "))
}

/// Builds the `DROP TABLE` statement for `table`.
pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {table};")
}

/// A table managed by a [`TableSet`].
#[derive(Debug, Clone)]
pub struct ManagedTable {
    name: String,
    schema: Arc<Classification>,
}

impl ManagedTable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Arc<Classification> {
        &self.schema
    }
}

/// The ordered set of entity tables a database owns.
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    tables: Vec<ManagedTable>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `table`, classifying it through `inspector`.
    ///
    /// # Errors
    ///
    /// Returns `StructureError` if `T` is not a valid entity or `table` is
    /// already registered.
    pub fn register<T: Entity>(
        self,
        inspector: &SchemaInspector,
        table: impl Into<String>,
    ) -> Result<Self, StructureError> {
        let schema = inspector.classify::<T>()?;
        self.register_schema(table, schema)
    }

    /// Registers an already classified type under `table`.
    ///
    /// # Errors
    ///
    /// Returns `StructureError::DuplicateTable` if `table` is already
    /// registered.
    pub fn register_schema(
        mut self,
        table: impl Into<String>,
        schema: Arc<Classification>,
    ) -> Result<Self, StructureError> {
        let name = table.into();
        if self.tables.iter().any(|t| t.name == name) {
            return Err(StructureError::DuplicateTable { table: name });
        }
        self.tables.push(ManagedTable { name, schema });
        Ok(self)
    }

    pub fn tables(&self) -> &[ManagedTable] {
        &self.tables
    }

    /// The classification registered for `table`.
    pub fn schema(&self, table: &str) -> Option<&Arc<Classification>> {
        self.tables
            .iter()
            .find(|t| t.name == table)
            .map(|t| &t.schema)
    }
}

impl SchemaHooks for TableSet {
    fn on_create(&self, conn: &Connection) -> Result<(), StoreError> {
        for table in &self.tables {
            let sql = create_table_sql(&table.name, &table.schema);
            tracing::info!(table = table.name.as_str(), sql = %sql, "creating table");
            conn.execute_ddl(&sql)?;
        }
        Ok(())
    }

    fn on_upgrade(
        &self,
        conn: &Connection,
        old_version: u32,
        new_version: u32,
    ) -> Result<(), StoreError> {
        tracing::warn!(
            from = old_version,
            to = new_version,
            tables = self.tables.len(),
            "upgrading database, which will destroy all existing data"
        );
        for table in &self.tables {
            conn.execute_ddl(&drop_table_sql(&table.name))?;
        }
        self.on_create(conn)
    }
}
