//! Entity declarations and the schema inspector.
//!
//! An entity type describes itself once through a [`TypeDescriptor`]: its
//! name, whether it carries the storable marker, its fields in
//! declaration order (each with at most one [`FieldMarker`]) and its
//! ancestor, if any. [`SchemaInspector`] walks that description and
//! produces a [`Classification`]: the identifier field, the stored fields
//! and the reference fields, in discovery order.
//!
//! Discovery starts at the inspected type and climbs the ancestor chain,
//! stopping at the first ancestor without the storable marker.

use std::any::{type_name, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use wrapee_types::{id_column, reference_column, FieldMarker, SemanticType, Value, ValueError};

use crate::error::StructureError;

/// A type whose instances can be referenced by id from another entity.
pub trait Identifiable {
    /// The identifier persisted in the referencing row.
    fn id(&self) -> i64;
}

/// A type whose instances are persisted as table rows.
///
/// `Default` provides the empty instance that row reconstruction fills in.
/// Field access is keyed by the field names declared in
/// [`Entity::descriptor`], including fields declared by ancestors.
pub trait Entity: Default + 'static {
    /// Describes the type's fields and ancestry.
    fn descriptor() -> TypeDescriptor;

    /// Returns the current value of an identifier or stored field.
    ///
    /// `None` means the field is unset.
    fn get(&self, field: &str) -> Option<Value>;

    /// Assigns an identifier or stored field from a row value.
    ///
    /// # Errors
    ///
    /// Returns `ValueError` if the value does not convert to the field's
    /// type or the field name is unknown.
    fn set(&mut self, field: &str, value: Value) -> Result<(), ValueError>;

    /// Returns the entity held by a reference field, if set.
    fn reference(&self, field: &str) -> Option<&dyn Identifiable> {
        let _ = field;
        None
    }
}

/// One declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    semantic_type: SemanticType,
    marker: Option<FieldMarker>,
    target: Option<&'static str>,
}

impl FieldDescriptor {
    /// The field name as declared.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared semantic type. Reference fields report `Long`, the
    /// type of the persisted foreign id.
    pub fn semantic_type(&self) -> SemanticType {
        self.semantic_type
    }

    /// The role marker, if any.
    pub fn marker(&self) -> Option<FieldMarker> {
        self.marker
    }

    /// The referenced type's name for reference fields.
    pub fn target(&self) -> Option<&'static str> {
        self.target
    }

    /// The column this field is stored under.
    pub fn column(&self) -> String {
        match self.marker {
            Some(FieldMarker::Id) => id_column(&self.name),
            Some(FieldMarker::Reference) => reference_column(&self.name),
            Some(FieldMarker::Stored) | None => self.name.clone(),
        }
    }
}

/// Declarative description of an entity type.
///
/// ```rust,ignore
/// TypeDescriptor::entity("Item")
///     .stored("name", SemanticType::Text)
///     .reference::<Owner>("owner")
///     .extends(TypeDescriptor::entity("Record").id("id", SemanticType::Long))
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    name: String,
    storable: bool,
    fields: Vec<FieldDescriptor>,
    parent: Option<Box<TypeDescriptor>>,
}

impl TypeDescriptor {
    /// Starts a description of a type carrying the storable marker.
    pub fn entity(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storable: true,
            fields: Vec::new(),
            parent: None,
        }
    }

    /// Starts a description of a type without the storable marker.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            storable: false,
            ..Self::entity(name)
        }
    }

    fn field(
        mut self,
        name: impl Into<String>,
        semantic_type: SemanticType,
        marker: Option<FieldMarker>,
        target: Option<&'static str>,
    ) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            semantic_type,
            marker,
            target,
        });
        self
    }

    /// Declares the identifier field.
    pub fn id(self, name: impl Into<String>, semantic_type: SemanticType) -> Self {
        self.field(name, semantic_type, Some(FieldMarker::Id), None)
    }

    /// Declares a stored field.
    pub fn stored(self, name: impl Into<String>, semantic_type: SemanticType) -> Self {
        self.field(name, semantic_type, Some(FieldMarker::Stored), None)
    }

    /// Declares a reference to an [`Identifiable`] type.
    pub fn reference<R: Identifiable + ?Sized>(self, name: impl Into<String>) -> Self {
        self.field(
            name,
            SemanticType::Long,
            Some(FieldMarker::Reference),
            Some(type_name::<R>()),
        )
    }

    /// Declares a field the mapping layer ignores.
    pub fn unmarked(self, name: impl Into<String>, semantic_type: SemanticType) -> Self {
        self.field(name, semantic_type, None, None)
    }

    /// Sets the ancestor type.
    pub fn extends(mut self, parent: TypeDescriptor) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_storable(&self) -> bool {
        self.storable
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn parent(&self) -> Option<&TypeDescriptor> {
        self.parent.as_deref()
    }
}

/// The inspected field layout of an entity type.
///
/// Immutable once built; shared between data access objects and the
/// table generator through `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    type_name: String,
    walked: Vec<String>,
    identifier: FieldDescriptor,
    stored: Vec<FieldDescriptor>,
    references: Vec<FieldDescriptor>,
}

impl Classification {
    /// Name of the inspected type.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Types whose fields were classified, from the inspected type upward.
    pub fn walked_types(&self) -> &[String] {
        &self.walked
    }

    pub fn identifier(&self) -> &FieldDescriptor {
        &self.identifier
    }

    pub fn stored(&self) -> &[FieldDescriptor] {
        &self.stored
    }

    pub fn references(&self) -> &[FieldDescriptor] {
        &self.references
    }

    /// Column holding the identifier.
    pub fn id_column(&self) -> String {
        self.identifier.column()
    }

    /// Column holding the named reference field, if declared.
    pub fn reference_column(&self, field: &str) -> Option<String> {
        self.references
            .iter()
            .find(|f| f.name() == field)
            .map(FieldDescriptor::column)
    }

    /// All columns: identifier, then stored fields, then references.
    pub fn column_names(&self) -> Vec<String> {
        std::iter::once(&self.identifier)
            .chain(&self.stored)
            .chain(&self.references)
            .map(FieldDescriptor::column)
            .collect()
    }
}

/// Classifies entity types and caches the result per type.
#[derive(Debug, Default)]
pub struct SchemaInspector {
    cache: Mutex<HashMap<TypeId, Arc<Classification>>>,
}

impl SchemaInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `T`, inspecting its descriptor only on first use.
    ///
    /// # Errors
    ///
    /// Returns `StructureError` if `T`'s declaration is invalid. Failures
    /// are not cached.
    pub fn classify<T: Entity>(&self) -> Result<Arc<Classification>, StructureError> {
        let key = TypeId::of::<T>();
        if let Some(found) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(found));
        }

        // Inspected without the lock held; a racing caller's entry wins.
        let classification = Arc::new(Self::inspect(&T::descriptor())?);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(key).or_insert(classification)))
    }

    /// Number of types classified so far.
    pub fn cached_types(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Classifies a type description without caching.
    ///
    /// # Errors
    ///
    /// - `NotAnEntity` if the type lacks the storable marker.
    /// - `MissingIdentifier` if no walked level declares an identifier.
    /// - `DuplicateIdentifier` if more than one does.
    /// - `NonIntegralIdentifier` if the identifier is not integral.
    /// - `DuplicateColumn` if two fields share a column name.
    pub fn inspect(descriptor: &TypeDescriptor) -> Result<Classification, StructureError> {
        let type_name = descriptor.name().to_string();
        if !descriptor.is_storable() {
            return Err(StructureError::NotAnEntity { type_name });
        }

        let mut walked = Vec::new();
        let mut identifier: Option<FieldDescriptor> = None;
        let mut stored = Vec::new();
        let mut references = Vec::new();

        let mut level = Some(descriptor);
        while let Some(current) = level.filter(|t| t.is_storable()) {
            walked.push(current.name().to_string());

            for field in current.fields() {
                match field.marker() {
                    Some(FieldMarker::Id) => {
                        if let Some(first) = &identifier {
                            return Err(StructureError::DuplicateIdentifier {
                                type_name,
                                first: first.name().to_string(),
                                second: field.name().to_string(),
                            });
                        }
                        if !field.semantic_type().is_integral() {
                            return Err(StructureError::NonIntegralIdentifier {
                                type_name,
                                field: field.name().to_string(),
                                found: field.semantic_type(),
                            });
                        }
                        identifier = Some(field.clone());
                    }
                    Some(FieldMarker::Stored) => stored.push(field.clone()),
                    Some(FieldMarker::Reference) => references.push(field.clone()),
                    None => {}
                }
            }

            level = current.parent();
        }

        let identifier = identifier.ok_or_else(|| StructureError::MissingIdentifier {
            type_name: type_name.clone(),
        })?;

        let classification = Classification {
            type_name,
            walked,
            identifier,
            stored,
            references,
        };

        let mut seen = HashSet::new();
        for column in classification.column_names() {
            if !seen.insert(column.clone()) {
                return Err(StructureError::DuplicateColumn {
                    type_name: classification.type_name,
                    column,
                });
            }
        }

        tracing::debug!(
            type_name = classification.type_name(),
            columns = classification.column_names().len(),
            "classified entity type"
        );

        Ok(classification)
    }
}
