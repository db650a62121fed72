#![allow(dead_code)]

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use wrapee_db::{Database, DbRuntimeSettings, StoreError};
use wrapee_orm::{
    Dao, Entity, Identifiable, SchemaInspector, SemanticType, TableSet, TypeDescriptor, Value,
    ValueError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Fastener,
    Spring,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fastener => "Fastener",
            Self::Spring => "Spring",
        }
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Fastener" => Ok(Self::Fastener),
            "Spring" => Ok(Self::Spring),
            other => Err(format!("unknown kind {other}")),
        }
    }
}

/// Stored entity that other rows point at.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Owner {
    pub id: i64,
    pub name: String,
}

impl Identifiable for Owner {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Entity for Owner {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::entity("Owner")
            .id("id", SemanticType::Long)
            .stored("name", SemanticType::Text)
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.as_str().into()),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), ValueError> {
        match field {
            "id" => self.id = value.try_into()?,
            "name" => self.name = value.try_into()?,
            other => return Err(ValueError::UnknownField(other.to_string())),
        }
        Ok(())
    }
}

/// The identifier lives on the `Record` ancestor.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub weight: f32,
    pub created_at: DateTime<Utc>,
    pub active: bool,
    pub kind: Option<Kind>,
    pub bin: i8,
    pub shelf: i16,
    pub stock: i32,
    pub density: f64,
    pub serial: i64,
    pub owner: Option<Arc<Owner>>,
    pub draft: String,
}

impl Entity for Item {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::entity("Item")
            .stored("name", SemanticType::Text)
            .stored("weight", SemanticType::Float)
            .stored("created_at", SemanticType::Instant)
            .stored("active", SemanticType::Boolean)
            .stored("kind", SemanticType::Enumeration)
            .stored("bin", SemanticType::Byte)
            .stored("shelf", SemanticType::Short)
            .stored("stock", SemanticType::Int)
            .stored("density", SemanticType::Double)
            .stored("serial", SemanticType::Long)
            .reference::<Owner>("owner")
            .unmarked("draft", SemanticType::Text)
            .extends(TypeDescriptor::entity("Record").id("id", SemanticType::Long))
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.as_str().into()),
            "weight" => Some(self.weight.into()),
            "created_at" => Some(self.created_at.into()),
            "active" => Some(self.active.into()),
            "kind" => self.kind.map(|k| Value::enumeration(k.as_str())),
            "bin" => Some(self.bin.into()),
            "shelf" => Some(self.shelf.into()),
            "stock" => Some(self.stock.into()),
            "density" => Some(self.density.into()),
            "serial" => Some(self.serial.into()),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), ValueError> {
        match field {
            "id" => self.id = value.try_into()?,
            "name" => self.name = value.try_into()?,
            "weight" => self.weight = value.try_into()?,
            "created_at" => self.created_at = value.try_into()?,
            "active" => self.active = value.try_into()?,
            "kind" => self.kind = Some(value.into_enum()?),
            "bin" => self.bin = value.try_into()?,
            "shelf" => self.shelf = value.try_into()?,
            "stock" => self.stock = value.try_into()?,
            "density" => self.density = value.try_into()?,
            "serial" => self.serial = value.try_into()?,
            other => return Err(ValueError::UnknownField(other.to_string())),
        }
        Ok(())
    }

    fn reference(&self, field: &str) -> Option<&dyn Identifiable> {
        match field {
            "owner" => self.owner.as_deref().map(|o| o as &dyn Identifiable),
            _ => None,
        }
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 5)
        .single()
        .expect("valid timestamp")
}

pub fn bolt() -> Item {
    Item {
        name: "bolt".to_string(),
        weight: 2.5,
        created_at: t0(),
        active: true,
        kind: Some(Kind::Fastener),
        bin: -3,
        shelf: 1_200,
        stock: 40_000,
        density: 7.85,
        serial: 9_007_199_254_740_993,
        ..Item::default()
    }
}

pub struct Catalog {
    pub db: Database,
    pub inspector: SchemaInspector,
    pub items: Dao<Item>,
    pub owners: Dao<Owner>,
}

pub fn tables(inspector: &SchemaInspector) -> TableSet {
    TableSet::new()
        .register::<Owner>(inspector, "owners")
        .and_then(|set| set.register::<Item>(inspector, "items"))
        .expect("catalog entities should classify")
}

pub fn try_open_catalog(path: &str, version: u32) -> Result<Catalog, StoreError> {
    let inspector = SchemaInspector::new();
    let tables = tables(&inspector);
    let db = Database::open(path, version, DbRuntimeSettings::default(), &tables)?;

    let items = Dao::new(
        db.clone(),
        inspector.classify::<Item>().expect("item should classify"),
        "items",
    );
    let owners = Dao::new(
        db.clone(),
        inspector.classify::<Owner>().expect("owner should classify"),
        "owners",
    );
    Ok(Catalog {
        db,
        inspector,
        items,
        owners,
    })
}

pub fn open_catalog(path: &Path, version: u32) -> Catalog {
    try_open_catalog(path.to_str().expect("utf-8 path"), version)
        .expect("failed to open catalog")
}
