use bson::{Bson, Document};

use super::{FieldKind, SchemaSource};

/// JSON-safe rendering of a stored value: datetimes become epoch seconds and
/// object ids hex strings. With `external` set, fields marked internal are
/// dropped from embedded documents.
#[must_use]
pub fn project<S: SchemaSource + ?Sized>(
    schemas: &S,
    kind: &FieldKind,
    value: &Bson,
    external: bool,
) -> Bson {
    match (kind, value) {
        (FieldKind::Embedded(name), Bson::Document(d)) => {
            Bson::Document(project_document(schemas, name, d, external))
        }
        (FieldKind::List(item), Bson::Array(items)) => {
            Bson::Array(items.iter().map(|v| project(schemas, item, v, external)).collect())
        }
        (FieldKind::Map(inner), Bson::Document(d)) => Bson::Document(
            d.iter().map(|(k, v)| (k.clone(), project(schemas, inner, v, external))).collect(),
        ),
        _ => plain(value),
    }
}

/// Project a document of schema `schema`; keys the schema does not declare are
/// rendered untyped.
#[must_use]
pub fn project_document<S: SchemaSource + ?Sized>(
    schemas: &S,
    schema: &str,
    doc: &Document,
    external: bool,
) -> Document {
    let Some(s) = schemas.schema(schema) else {
        return doc.iter().map(|(k, v)| (k.clone(), plain(v))).collect();
    };
    let mut out = Document::new();
    for (k, v) in doc {
        match s.get(k) {
            Some(desc) if desc.internal && external => {}
            Some(desc) => {
                out.insert(k.clone(), project(schemas, &desc.kind, v, external));
            }
            None => {
                out.insert(k.clone(), plain(v));
            }
        }
    }
    out
}

fn plain(value: &Bson) -> Bson {
    match value {
        Bson::DateTime(dt) => Bson::Int64(dt.timestamp_millis().div_euclid(1000)),
        Bson::ObjectId(oid) => Bson::String(oid.to_hex()),
        Bson::Array(items) => Bson::Array(items.iter().map(plain).collect()),
        Bson::Document(d) => Bson::Document(d.iter().map(|(k, v)| (k.clone(), plain(v))).collect()),
        _ => value.clone(),
    }
}
