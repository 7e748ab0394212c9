//! A record value bound to its schema, tracking changes against a snapshot.

use bson::{Bson, Document};
use chrono::{DateTime, Utc};

use crate::config::Limits;
use crate::delta::{self, Delta};
use crate::errors::OdmError;
use crate::path::Path;
use crate::schema::{
    FieldKind, SchemaRegistry, SchemaSource, coerce, from_literal, project_document,
};

/// Immutable copy of a record's values at construction, reload or persist time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    values: Document,
    taken_at: DateTime<Utc>,
}

impl Snapshot {
    fn capture(values: &Document) -> Self {
        Self { values: values.clone(), taken_at: Utc::now() }
    }

    #[must_use]
    pub fn values(&self) -> &Document {
        &self.values
    }

    #[must_use]
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }
}

#[derive(Debug, Clone)]
pub struct Record<'r, S: SchemaSource + ?Sized = SchemaRegistry> {
    schemas: &'r S,
    schema: String,
    values: Document,
    snapshot: Snapshot,
    limits: Limits,
}

impl<'r, S: SchemaSource + ?Sized> Record<'r, S> {
    /// Build a record from raw field values, applying declared defaults.
    ///
    /// # Errors
    /// `UnknownSchema`, `UnknownField` for undeclared keys, or `InvalidLiteral`.
    pub fn new(schemas: &'r S, schema: &str, data: &Document) -> Result<Self, OdmError> {
        let values = build(schemas, schema, data)?;
        let snapshot = Snapshot::capture(&values);
        Ok(Self {
            schemas,
            schema: schema.to_string(),
            values,
            snapshot,
            limits: Limits::default(),
        })
    }

    /// Use `limits` when parsing paths for [`Record::get_path`] and [`Record::set_field`].
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    #[must_use]
    pub fn values(&self) -> &Document {
        &self.values
    }

    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Bson> {
        self.values.get(field)
    }

    /// # Errors
    /// `UnknownField` for undeclared names, `InvalidLiteral` on coercion failure.
    pub fn set(&mut self, field: &str, value: impl Into<Bson>) -> Result<(), OdmError> {
        let desc = self.schemas.field_for(&self.schema, field)?;
        let v = from_literal(self.schemas, desc, &value.into())?;
        self.values.insert(desc.name.clone(), v);
        Ok(())
    }

    /// # Errors
    /// As [`delta::resolve`].
    pub fn get_path(&self, path: &str) -> Result<Bson, OdmError> {
        let path = Path::parse_with(path, &self.limits)?;
        delta::resolve(self.schemas, &self.schema, &self.values, &path)
    }

    /// # Errors
    /// As [`delta::apply_path`].
    pub fn set_field(&mut self, path: &str, value: impl Into<Bson>) -> Result<(), OdmError> {
        let limits = self.limits;
        delta::apply_path_with(self.schemas, &self.schema, &mut self.values, path, value, &limits)
    }

    /// Changes since the last snapshot.
    ///
    /// # Errors
    /// `UnknownSchema` if a nested schema is missing.
    pub fn deltas(&self) -> Result<Delta, OdmError> {
        delta::diff(self.schemas, &self.schema, &self.values, self.snapshot.values())
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.values != *self.snapshot.values()
    }

    /// # Errors
    /// As [`delta::absorb`].
    pub fn absorb(&mut self, incoming: &Document, update_mode: bool) -> Result<Delta, OdmError> {
        delta::absorb(self.schemas, &self.schema, &mut self.values, incoming, update_mode)
    }

    /// Take a new snapshot after a successful save.
    pub fn mark_persisted(&mut self) {
        self.snapshot = Snapshot::capture(&self.values);
        log::debug!("{} snapshot refreshed", self.schema);
    }

    /// Replace the values with freshly loaded ones and re-snapshot.
    ///
    /// # Errors
    /// As [`Record::new`]; the record is unchanged on error.
    pub fn reload(&mut self, stored: &Document) -> Result<(), OdmError> {
        self.values = build(self.schemas, &self.schema, stored)?;
        self.snapshot = Snapshot::capture(&self.values);
        Ok(())
    }

    /// JSON-safe form; with `external` set, internal fields are omitted.
    #[must_use]
    pub fn to_external(&self, external: bool) -> Document {
        project_document(self.schemas, &self.schema, &self.values, external)
    }
}

fn build<S: SchemaSource + ?Sized>(
    schemas: &S,
    schema: &str,
    data: &Document,
) -> Result<Document, OdmError> {
    let s = schemas.require(schema)?;
    let kind = FieldKind::embedded(schema);
    let Bson::Document(mut values) = coerce(schemas, schema, &kind, &Bson::Document(data.clone()))?
    else {
        return Err(OdmError::literal(schema, "expected a document"));
    };
    for desc in s.fields() {
        if let Some(default) = &desc.default
            && !values.contains_key(&desc.name)
        {
            values.insert(desc.name.clone(), from_literal(schemas, desc, default)?);
        }
    }
    Ok(values)
}
