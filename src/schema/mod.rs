//! Field descriptors and the registry the path and delta code resolve against.
//!
//! Schemas are built once, up front, and passed explicitly as a [`SchemaSource`].

mod convert;
mod external;

pub use convert::{coerce, from_literal};
pub use external::{project, project_document};

use crate::errors::OdmError;
use bson::{Bson, Document};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    ObjectId,
    /// Untyped value, stored as given.
    Generic,
    /// Free-form document, diffed and reconciled wholesale.
    Dict,
    List(Box<FieldKind>),
    /// String-keyed mapping with values of one kind.
    Map(Box<FieldKind>),
    /// Nested document described by the named schema.
    Embedded(String),
    /// Key of a record of the named schema.
    Reference(String),
}

pub(crate) static GENERIC: FieldKind = FieldKind::Generic;

impl FieldKind {
    #[must_use]
    pub fn list(item: Self) -> Self {
        Self::List(Box::new(item))
    }

    #[must_use]
    pub fn map(value: Self) -> Self {
        Self::Map(Box::new(value))
    }

    #[must_use]
    pub fn embedded(schema: impl Into<String>) -> Self {
        Self::Embedded(schema.into())
    }

    #[must_use]
    pub fn reference(schema: impl Into<String>) -> Self {
        Self::Reference(schema.into())
    }

    /// Value an absent field of this kind compares as.
    #[must_use]
    pub fn empty(&self) -> Bson {
        match self {
            Self::List(_) => Bson::Array(Vec::new()),
            Self::Map(_) | Self::Dict | Self::Embedded(_) => Bson::Document(Document::new()),
            _ => Bson::Null,
        }
    }

    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::List(_) | Self::Map(_) | Self::Embedded(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub default: Option<Bson>,
    /// Hidden from the external projection.
    pub internal: bool,
}

impl FieldDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind, default: None, internal: false }
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<Bson>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }
}

/// Ordered field descriptors of one record or embedded document type.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: Vec::new() }
    }

    #[must_use]
    pub fn field(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.with(FieldDescriptor::new(name, kind))
    }

    /// Add a descriptor, replacing any earlier one with the same name.
    #[must_use]
    pub fn with(mut self, desc: FieldDescriptor) -> Self {
        self.fields.retain(|f| f.name != desc.name);
        self.fields.push(desc);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Lookup seam consumed by path resolution, coercion and diffing.
pub trait SchemaSource {
    fn schema(&self, name: &str) -> Option<&Schema>;

    /// # Errors
    /// `UnknownSchema` if `container` is not registered, `UnknownField` if it has no such field.
    fn field_for(&self, container: &str, name: &str) -> Result<&FieldDescriptor, OdmError> {
        self.require(container)?.get(name).ok_or_else(|| OdmError::UnknownField {
            container: container.to_string(),
            field: name.to_string(),
        })
    }

    /// # Errors
    /// `UnknownSchema` if `name` is not registered.
    fn require(&self, name: &str) -> Result<&Schema, OdmError> {
        self.schema(name).ok_or_else(|| OdmError::UnknownSchema(name.to_string()))
    }

    /// Convert a raw value into the field's stored form.
    ///
    /// # Errors
    /// `InvalidLiteral` if the value cannot represent the field's kind.
    fn from_literal(&self, field: &FieldDescriptor, raw: &Bson) -> Result<Bson, OdmError> {
        convert::from_literal(self, field, raw)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Schema>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema`, returning the one it replaced.
    pub fn register(&mut self, schema: Schema) -> Option<Schema> {
        log::debug!("registering schema {} ({} fields)", schema.name, schema.fields.len());
        self.schemas.insert(schema.name.clone(), schema)
    }

    #[must_use]
    pub fn with(mut self, schema: Schema) -> Self {
        self.register(schema);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl SchemaSource for SchemaRegistry {
    fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }
}
