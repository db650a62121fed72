//! Wrapee demo binary.
//!
//! Opens the configured database, creating or upgrading the catalog tables
//! as the configured version requires, then stores, reads back, updates and
//! deletes a part.

mod catalog;
mod config;

use std::process::ExitCode;

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use wrapee_db::{Database, StoreError};
use wrapee_orm::{SchemaInspector, StructureError};

use crate::catalog::{Catalog, CatalogError};
use crate::config::ConfigError;

#[derive(Debug, Error)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error("failed to open database: {0}")]
    Open(#[from] StoreError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("WRAPEE_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn run() -> Result<(), DemoError> {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("wrapee.toml"));

    let config = config::load_config(selected_config_path)?;
    init_tracing(&config.logging.level, config.logging.json);

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    let inspector = SchemaInspector::new();
    let tables = catalog::tables(&inspector)?;
    let db = Database::open(
        &config.database.path,
        config.database.version,
        config.database.to_settings(),
        &tables,
    )?;
    tracing::info!(
        path = config.database.path.as_str(),
        version = db.version(),
        tables = tables.tables().len(),
        "database ready"
    );

    let catalog = Catalog::new(&db, &inspector)?;
    let result = catalog::round_trip(&catalog, chrono::Utc::now())?;
    tracing::info!(
        part_id = result.part_id,
        supplier_id = ?result.supplier_id,
        quantity = result.restocked.quantity,
        remaining = result.remaining,
        "round trip complete"
    );

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The subscriber may not be installed if config loading failed.
            tracing::error!(error = %e, "wrapee demo failed");
            eprintln!("wrapee-demo: {e}");
            ExitCode::FAILURE
        }
    }
}
