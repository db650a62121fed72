//! Unit tests for classification, table generation and marshalling.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::Value as SqlValue;
use wrapee_db::Cursor;

use crate::error::{DaoError, MarshalError, StructureError};
use crate::marshal::{from_cursor, to_column_values};
use crate::schema::{Entity, Identifiable, SchemaInspector, TypeDescriptor};
use crate::table::{create_table_sql, TableSet};
use crate::{SemanticType, Value, ValueError};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Size {
    Small,
    Large,
}

impl Size {
    fn as_str(self) -> &'static str {
        match self {
            Self::Small => "Small",
            Self::Large => "Large",
        }
    }
}

impl std::str::FromStr for Size {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Small" => Ok(Self::Small),
            "Large" => Ok(Self::Large),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Owner {
    id: i64,
    name: String,
}

impl Identifiable for Owner {
    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Widget {
    id: i64,
    label: String,
    count: i32,
    enabled: bool,
    made_at: DateTime<Utc>,
    size: Option<Size>,
    owner: Option<Arc<Owner>>,
    scratch: String,
}

impl Entity for Widget {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::entity("Widget")
            .stored("label", SemanticType::Text)
            .stored("count", SemanticType::Int)
            .stored("enabled", SemanticType::Boolean)
            .stored("made_at", SemanticType::Instant)
            .stored("size", SemanticType::Enumeration)
            .reference::<Owner>("owner")
            .unmarked("scratch", SemanticType::Text)
            .extends(TypeDescriptor::entity("Record").id("id", SemanticType::Long))
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.into()),
            "label" => Some(self.label.clone().into()),
            "count" => Some(self.count.into()),
            "enabled" => Some(self.enabled.into()),
            "made_at" => Some(self.made_at.into()),
            "size" => self.size.map(|s| Value::enumeration(s.as_str())),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), ValueError> {
        match field {
            "id" => self.id = value.try_into()?,
            "label" => self.label = value.try_into()?,
            "count" => self.count = value.try_into()?,
            "enabled" => self.enabled = value.try_into()?,
            "made_at" => self.made_at = value.try_into()?,
            "size" => self.size = Some(value.into_enum()?),
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

fn widget() -> Widget {
    Widget {
        id: 7,
        label: "gear".to_string(),
        count: 3,
        enabled: true,
        made_at: Utc
            .timestamp_millis_opt(1_700_000_000_123)
            .single()
            .expect("valid instant"),
        size: Some(Size::Large),
        owner: None,
        scratch: "not persisted".to_string(),
    }
}

fn widget_schema() -> Arc<crate::Classification> {
    Arc::new(SchemaInspector::inspect(&Widget::descriptor()).expect("widget should classify"))
}

/// Builds a cursor over one row of widget columns, positioned on it.
fn widget_row(cells: Vec<SqlValue>) -> Cursor {
    let columns = widget_schema().column_names();
    let mut cursor = Cursor::new(columns, vec![cells]);
    cursor.move_to_first();
    cursor
}

fn good_cells() -> Vec<SqlValue> {
    vec![
        SqlValue::Integer(7),
        SqlValue::Text("gear".into()),
        SqlValue::Integer(3),
        SqlValue::Text("#t".into()),
        SqlValue::Text("1700000000123".into()),
        SqlValue::Text("Large".into()),
        SqlValue::Integer(42),
    ]
}

// ── Classification ───────────────────────────────────────────────────

#[test]
fn classification_orders_columns_and_skips_unmarked_fields() {
    let schema = widget_schema();

    assert_eq!(schema.type_name(), "Widget");
    assert_eq!(schema.walked_types(), ["Widget", "Record"]);
    assert_eq!(schema.identifier().name(), "id");
    assert_eq!(schema.id_column(), "_id_id");
    assert_eq!(
        schema.column_names(),
        vec!["_id_id", "label", "count", "enabled", "made_at", "size", "_rid_owner"]
    );
    assert_eq!(schema.reference_column("owner").as_deref(), Some("_rid_owner"));
    assert_eq!(schema.reference_column("scratch"), None);
    assert!(schema.references()[0]
        .target()
        .expect("reference has a target")
        .ends_with("Owner"));
}

#[test]
fn root_without_marker_is_rejected() {
    let descriptor = TypeDescriptor::plain("Loose").id("id", SemanticType::Long);
    assert_eq!(
        SchemaInspector::inspect(&descriptor),
        Err(StructureError::NotAnEntity {
            type_name: "Loose".into()
        })
    );
}

#[test]
fn missing_identifier_is_rejected() {
    let descriptor = TypeDescriptor::entity("NoId").stored("name", SemanticType::Text);
    assert_eq!(
        SchemaInspector::inspect(&descriptor),
        Err(StructureError::MissingIdentifier {
            type_name: "NoId".into()
        })
    );
}

#[test]
fn climb_stops_at_first_unmarked_ancestor() {
    let descriptor = TypeDescriptor::entity("Leaf")
        .stored("leaf", SemanticType::Text)
        .extends(
            TypeDescriptor::entity("Middle")
                .id("id", SemanticType::Long)
                .stored("middle", SemanticType::Int)
                .extends(
                    TypeDescriptor::plain("Gap")
                        .stored("gap", SemanticType::Int)
                        .extends(TypeDescriptor::entity("Top").stored("top", SemanticType::Int)),
                ),
        );

    let schema = SchemaInspector::inspect(&descriptor).expect("leaf should classify");
    assert_eq!(schema.walked_types(), ["Leaf", "Middle"]);
    assert_eq!(schema.column_names(), vec!["_id_id", "leaf", "middle"]);
}

#[test]
fn identifier_beyond_unmarked_ancestor_is_not_found() {
    let descriptor = TypeDescriptor::entity("Child")
        .stored("name", SemanticType::Text)
        .extends(TypeDescriptor::plain("Base").id("id", SemanticType::Long));

    assert!(matches!(
        SchemaInspector::inspect(&descriptor),
        Err(StructureError::MissingIdentifier { .. })
    ));
}

#[test]
fn invalid_identifiers_are_rejected() {
    let twice = TypeDescriptor::entity("Twice")
        .id("a", SemanticType::Long)
        .extends(TypeDescriptor::entity("Base").id("b", SemanticType::Int));
    assert_eq!(
        SchemaInspector::inspect(&twice),
        Err(StructureError::DuplicateIdentifier {
            type_name: "Twice".into(),
            first: "a".into(),
            second: "b".into(),
        })
    );

    let textual = TypeDescriptor::entity("Textual").id("key", SemanticType::Text);
    assert_eq!(
        SchemaInspector::inspect(&textual),
        Err(StructureError::NonIntegralIdentifier {
            type_name: "Textual".into(),
            field: "key".into(),
            found: SemanticType::Text,
        })
    );
}

#[test]
fn shadowed_column_is_rejected() {
    let descriptor = TypeDescriptor::entity("Child")
        .stored("name", SemanticType::Text)
        .extends(
            TypeDescriptor::entity("Base")
                .id("id", SemanticType::Long)
                .stored("name", SemanticType::Text),
        );
    assert_eq!(
        SchemaInspector::inspect(&descriptor),
        Err(StructureError::DuplicateColumn {
            type_name: "Child".into(),
            column: "name".into(),
        })
    );
}

#[test]
fn inspector_caches_per_type() {
    let inspector = SchemaInspector::new();
    let first = inspector.classify::<Widget>().expect("widget should classify");
    let second = inspector.classify::<Widget>().expect("widget should classify");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(inspector.cached_types(), 1);
}

fn shared_inspector() -> &'static SchemaInspector {
    static INSPECTOR: OnceLock<SchemaInspector> = OnceLock::new();
    INSPECTOR.get_or_init(SchemaInspector::new)
}

/// Classifies another type from inside its own descriptor.
#[derive(Debug, Default)]
struct Nested;

impl Entity for Nested {
    fn descriptor() -> TypeDescriptor {
        let inner = shared_inspector()
            .classify::<Widget>()
            .expect("widget should classify");
        TypeDescriptor::entity("Nested")
            .id("id", SemanticType::Long)
            .stored(inner.type_name().to_lowercase(), SemanticType::Text)
    }

    fn get(&self, _field: &str) -> Option<Value> {
        None
    }

    fn set(&mut self, field: &str, _value: Value) -> Result<(), ValueError> {
        Err(ValueError::UnknownField(field.to_string()))
    }
}

#[test]
fn descriptor_runs_without_cache_lock_held() {
    let nested = shared_inspector()
        .classify::<Nested>()
        .expect("nested should classify");
    assert_eq!(nested.column_names(), vec!["_id_id", "widget"]);
    assert!(shared_inspector().cached_types() >= 2);
}

#[test]
fn racing_classifications_share_one_entry() {
    let inspector = SchemaInspector::new();
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| inspector.classify::<Widget>().expect("widget should classify"))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("classifier thread panicked"))
            .collect()
    });

    let cached = inspector.classify::<Widget>().expect("widget should classify");
    assert!(results.iter().all(|r| Arc::ptr_eq(r, &cached)));
    assert_eq!(inspector.cached_types(), 1);
}

// ── Table definitions ────────────────────────────────────────────────

#[test]
fn create_table_types_columns_by_family() {
    let sql = create_table_sql("widgets", &widget_schema());
    assert_eq!(
        sql,
        "CREATE TABLE widgets (_id_id INTEGER PRIMARY KEY AUTOINCREMENT, label TEXT NOT NULL, \
         count INTEGER, enabled TEXT NOT NULL, made_at TEXT NOT NULL, size TEXT NOT NULL, \
         _rid_owner INTEGER);"
    );

    let floats = TypeDescriptor::entity("Reading")
        .id("id", SemanticType::Short)
        .stored("low", SemanticType::Float)
        .stored("high", SemanticType::Double)
        .stored("tiny", SemanticType::Byte);
    let schema = SchemaInspector::inspect(&floats).expect("reading should classify");
    assert_eq!(
        create_table_sql("readings", &schema),
        "CREATE TABLE readings (_id_id INTEGER PRIMARY KEY AUTOINCREMENT, low REAL, high REAL, \
         tiny INTEGER);"
    );
}

#[test]
fn table_set_rejects_duplicate_names() {
    let inspector = SchemaInspector::new();
    let err = TableSet::new()
        .register::<Widget>(&inspector, "widgets")
        .and_then(|set| set.register::<Widget>(&inspector, "widgets"))
        .expect_err("duplicate table should fail");
    assert_eq!(
        err,
        StructureError::DuplicateTable {
            table: "widgets".into()
        }
    );
}

// ── Write marshalling ────────────────────────────────────────────────

#[test]
fn payload_includes_identifier_only_on_request() {
    let schema = widget_schema();
    let item = widget();

    let generated = to_column_values(&schema, &item, false).expect("should marshal");
    assert!(!generated.contains("_id_id"));

    let explicit = to_column_values(&schema, &item, true).expect("should marshal");
    assert_eq!(explicit.get("_id_id"), Some("7"));
}

#[test]
fn payload_encodes_booleans_instants_and_enums() {
    let schema = widget_schema();
    let mut item = widget();

    let values = to_column_values(&schema, &item, true).expect("should marshal");
    assert_eq!(values.get("enabled"), Some("#t"));
    assert_eq!(values.get("made_at"), Some("1700000000123"));
    assert_eq!(values.get("size"), Some("Large"));
    assert_eq!(values.get("count"), Some("3"));
    assert!(!values.contains("scratch"), "unmarked fields are not written");

    item.enabled = false;
    let values = to_column_values(&schema, &item, true).expect("should marshal");
    assert_eq!(values.get("enabled"), Some("#f"));
}

#[test]
fn unset_reference_is_omitted_not_nulled() {
    let schema = widget_schema();
    let mut item = widget();

    let values = to_column_values(&schema, &item, true).expect("should marshal");
    assert!(!values.contains("_rid_owner"));
    assert_eq!(values.len(), 6);

    item.owner = Some(Arc::new(Owner {
        id: 42,
        name: "ada".into(),
    }));
    let values = to_column_values(&schema, &item, true).expect("should marshal");
    assert_eq!(values.get("_rid_owner"), Some("42"));
}

#[test]
fn unset_stored_field_fails_without_payload() {
    let schema = widget_schema();
    let mut item = widget();
    item.size = None;

    let err = to_column_values(&schema, &item, false).expect_err("unset enum should fail");
    match err {
        DaoError::Marshal { field, source, .. } => {
            assert_eq!(field, "size");
            assert_eq!(source, MarshalError::MissingValue);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// ── Read marshalling ─────────────────────────────────────────────────

#[test]
fn row_rebuilds_stored_fields_and_leaves_references_unset() {
    let cursor = widget_row(good_cells());
    let rebuilt: Widget = from_cursor(&widget_schema(), &cursor).expect("row should rebuild");

    let mut expected = widget();
    expected.scratch = String::new();
    assert_eq!(rebuilt, expected);
    assert!(rebuilt.owner.is_none());
}

#[test]
fn boolean_tokens_read_case_insensitively() {
    let mut cells = good_cells();
    cells[3] = SqlValue::Text("#T".into());
    let rebuilt: Widget =
        from_cursor(&widget_schema(), &widget_row(cells.clone())).expect("row should rebuild");
    assert!(rebuilt.enabled);

    cells[3] = SqlValue::Text("#F".into());
    let rebuilt: Widget =
        from_cursor(&widget_schema(), &widget_row(cells)).expect("row should rebuild");
    assert!(!rebuilt.enabled);
}

#[test]
fn null_enumeration_leaves_field_unset() {
    let mut cells = good_cells();
    cells[5] = SqlValue::Null;
    let rebuilt: Widget =
        from_cursor(&widget_schema(), &widget_row(cells)).expect("row should rebuild");
    assert_eq!(rebuilt.size, None);
}

#[test]
fn bad_cells_fail_with_field_context() {
    let mut cells = good_cells();
    cells[1] = SqlValue::Null;
    let err = from_cursor::<Widget>(&widget_schema(), &widget_row(cells))
        .expect_err("null text should fail");
    assert!(matches!(
        err,
        DaoError::Marshal { ref field, source: MarshalError::NullColumn(_), .. } if field == "label"
    ));

    let mut cells = good_cells();
    cells[2] = SqlValue::Integer(i64::from(i32::MAX) + 1);
    let err = from_cursor::<Widget>(&widget_schema(), &widget_row(cells))
        .expect_err("oversized int should fail");
    assert!(matches!(
        err,
        DaoError::Marshal {
            source: MarshalError::Value(ValueError::OutOfRange { .. }),
            ..
        }
    ));

    let mut cells = good_cells();
    cells[5] = SqlValue::Text("Medium".into());
    let err = from_cursor::<Widget>(&widget_schema(), &widget_row(cells))
        .expect_err("unknown variant should fail");
    assert!(matches!(
        err,
        DaoError::Marshal {
            source: MarshalError::Value(ValueError::UnknownVariant(_)),
            ..
        }
    ));
}
