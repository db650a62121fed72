//! Entities stored by the demo and the round trip it runs over them.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use wrapee_db::{Database, StoreError};
use wrapee_orm::{
    Dao, DaoError, Entity, Identifiable, SchemaInspector, SemanticType, StructureError, TableSet,
    TypeDescriptor, Value, ValueError,
};

pub const SUPPLIERS: &str = "suppliers";
pub const PARTS: &str = "parts";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Dao(#[from] DaoError),

    /// A row written during the round trip could not be read back.
    #[error("row {0} vanished from {1}")]
    Missing(i64, &'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Fastener,
    Bearing,
    Seal,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fastener => "Fastener",
            Self::Bearing => "Bearing",
            Self::Seal => "Seal",
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Fastener" => Ok(Self::Fastener),
            "Bearing" => Ok(Self::Bearing),
            "Seal" => Ok(Self::Seal),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub preferred: bool,
}

impl Identifiable for Supplier {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Entity for Supplier {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::entity("Supplier")
            .id("id", SemanticType::Long)
            .stored("name", SemanticType::Text)
            .stored("preferred", SemanticType::Boolean)
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.as_str().into()),
            "preferred" => Some(self.preferred.into()),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), ValueError> {
        match field {
            "id" => self.id = value.try_into()?,
            "name" => self.name = value.try_into()?,
            "preferred" => self.preferred = value.try_into()?,
            other => return Err(ValueError::UnknownField(other.to_string())),
        }
        Ok(())
    }
}

/// A stocked part. The identifier and timestamp come from the `Tracked`
/// ancestor.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Part {
    pub id: i64,
    pub added_at: DateTime<Utc>,
    pub name: String,
    pub weight: f32,
    pub quantity: i32,
    pub category: Option<Category>,
    pub supplier: Option<Arc<Supplier>>,
}

impl Entity for Part {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::entity("Part")
            .stored("name", SemanticType::Text)
            .stored("weight", SemanticType::Float)
            .stored("quantity", SemanticType::Int)
            .stored("category", SemanticType::Enumeration)
            .reference::<Supplier>("supplier")
            .extends(
                TypeDescriptor::entity("Tracked")
                    .id("id", SemanticType::Long)
                    .stored("added_at", SemanticType::Instant),
            )
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.into()),
            "added_at" => Some(self.added_at.into()),
            "name" => Some(self.name.as_str().into()),
            "weight" => Some(self.weight.into()),
            "quantity" => Some(self.quantity.into()),
            "category" => self.category.map(|c| Value::enumeration(c.as_str())),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), ValueError> {
        match field {
            "id" => self.id = value.try_into()?,
            "added_at" => self.added_at = value.try_into()?,
            "name" => self.name = value.try_into()?,
            "weight" => self.weight = value.try_into()?,
            "quantity" => self.quantity = value.try_into()?,
            "category" => self.category = Some(value.into_enum()?),
            other => return Err(ValueError::UnknownField(other.to_string())),
        }
        Ok(())
    }

    fn reference(&self, field: &str) -> Option<&dyn Identifiable> {
        match field {
            "supplier" => self.supplier.as_deref().map(|s| s as &dyn Identifiable),
            _ => None,
        }
    }
}

/// The tables the demo database manages.
///
/// # Errors
///
/// Returns `StructureError` if an entity declaration is invalid.
pub fn tables(inspector: &SchemaInspector) -> Result<TableSet, StructureError> {
    TableSet::new()
        .register::<Supplier>(inspector, SUPPLIERS)?
        .register::<Part>(inspector, PARTS)
}

/// Data access for every catalog table.
pub struct Catalog {
    pub suppliers: Dao<Supplier>,
    pub parts: Dao<Part>,
}

impl Catalog {
    /// # Errors
    ///
    /// Returns `StructureError` if an entity declaration is invalid.
    pub fn new(db: &Database, inspector: &SchemaInspector) -> Result<Self, StructureError> {
        Ok(Self {
            suppliers: Dao::new(db.clone(), inspector.classify::<Supplier>()?, SUPPLIERS),
            parts: Dao::new(db.clone(), inspector.classify::<Part>()?, PARTS),
        })
    }
}

/// What a round trip left behind.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTrip {
    pub part_id: i64,
    pub supplier_id: Option<i64>,
    pub restocked: Part,
    pub remaining: i64,
}

/// Inserts a supplier and a part, reads the part back, restocks it and
/// removes it again.
///
/// # Errors
///
/// Returns `CatalogError` if any step fails.
pub fn round_trip(catalog: &Catalog, now: DateTime<Utc>) -> Result<RoundTrip, CatalogError> {
    let supplier = Supplier {
        id: 0,
        name: "Acme Bearings".to_string(),
        preferred: true,
    };
    // An in-memory pool has a single connection, so sessions must not overlap.
    let supplier_id = catalog.suppliers.open()?.insert(&supplier, true)?;
    let supplier = Arc::new(Supplier {
        id: supplier_id,
        ..supplier
    });
    tracing::info!(supplier_id, "stored supplier");

    let parts = catalog.parts.open()?;
    let part = Part {
        added_at: now,
        name: "6204 deep groove bearing".to_string(),
        weight: 0.11,
        quantity: 12,
        category: Some(Category::Bearing),
        supplier: Some(Arc::clone(&supplier)),
        ..Part::default()
    };
    let part_id = parts.insert(&part, true)?;
    tracing::info!(part_id, "stored part");

    let mut restocked = parts
        .fetch(part_id)?
        .ok_or(CatalogError::Missing(part_id, PARTS))?;
    restocked.quantity += 30;
    restocked.supplier = Some(supplier);
    parts.update(&restocked, part_id)?;

    let cursor = parts
        .fetch_cursor(part_id)?
        .ok_or(CatalogError::Missing(part_id, PARTS))?;
    let supplier_id = catalog.parts.reference_id(&cursor, "supplier")?;
    tracing::info!(part_id, ?supplier_id, quantity = restocked.quantity, "restocked part");

    let restocked = parts
        .fetch(part_id)?
        .ok_or(CatalogError::Missing(part_id, PARTS))?;
    parts.delete(part_id)?;
    let remaining = parts.count_entries(None)?;

    Ok(RoundTrip {
        part_id,
        supplier_id,
        restocked,
        remaining,
    })
}
