use bson::{Bson, Document};
use std::collections::BTreeMap;

use super::diff::diff_value;
use super::types::Delta;
use crate::errors::OdmError;
use crate::logger::AUDIT_TARGET;
use crate::schema::{FieldKind, Schema, SchemaSource, coerce};

/// Reconcile `doc` with a full external representation and report what changed.
///
/// Schema fields missing from `incoming` are removed and reported `"deleted"`
/// unless `update_mode` is set (internal fields are never removed this way).
/// Incoming keys without a schema field are reported `"unknown"` and ignored.
/// Both rules apply inside embedded documents too, and their markers appear in
/// the nested delta of the enclosing field.
///
/// # Errors
/// `UnknownSchema`, or a coercion failure; `doc` is left untouched on error.
pub fn absorb<S: SchemaSource + ?Sized>(
    schemas: &S,
    schema: &str,
    doc: &mut Document,
    incoming: &Document,
    update_mode: bool,
) -> Result<Delta, OdmError> {
    let s = schemas.require(schema)?;
    let mut working = doc.clone();
    let mut report = BTreeMap::new();

    for (key, raw) in incoming {
        let Some(desc) = s.get(key) else {
            report.insert(key.clone(), Delta::Unknown);
            continue;
        };
        let empty = desc.kind.empty();
        let old = working.get(key).cloned().unwrap_or(empty);
        let (new, markers) =
            reconcile(schemas, &desc.name, &desc.kind, Some(&old), raw, update_mode)?;
        let d = overlay(diff_value(schemas, &desc.kind, &new, &old)?, markers);
        if !d.is_empty() {
            report.insert(key.clone(), d);
        }
        working.insert(key.clone(), new);
    }
    if !update_mode {
        for f in s.fields().iter().filter(|f| !f.internal && !incoming.contains_key(&f.name)) {
            if working.remove(&f.name).is_some() {
                report.insert(f.name.clone(), Delta::Deleted);
            }
        }
    }

    *doc = working;
    let count = |pred: fn(&Delta) -> bool| report.values().filter(|d| pred(d)).count();
    log::info!(
        target: AUDIT_TARGET,
        "absorb schema={schema} update_mode={update_mode} changed={} deleted={} unknown={}",
        count(|d| !matches!(d, Delta::Deleted | Delta::Unknown)),
        count(|d| matches!(d, Delta::Deleted)),
        count(|d| matches!(d, Delta::Unknown)),
    );
    crate::dev6!("{{\"absorb\":\"{schema}\",\"entries\":{}}}", report.len());
    Ok(Delta::Nested(report))
}

/// `"deleted"` and `"unknown"` markers found below a field, keyed like its delta.
type Markers = BTreeMap<String, Delta>;

/// Merge `raw` into the existing value: embedded documents field by field,
/// lists element by element (taking the incoming length), maps key by key.
/// Everything else is replaced by the coerced incoming value.
fn reconcile<S: SchemaSource + ?Sized>(
    schemas: &S,
    field: &str,
    kind: &FieldKind,
    existing: Option<&Bson>,
    raw: &Bson,
    update_mode: bool,
) -> Result<(Bson, Markers), OdmError> {
    match (kind, raw) {
        (FieldKind::Embedded(name), Bson::Document(incoming)) => {
            let base = match existing {
                Some(Bson::Document(d)) => d.clone(),
                _ => Document::new(),
            };
            let (doc, markers) =
                reconcile_document(schemas, schemas.require(name)?, base, incoming, update_mode)?;
            Ok((Bson::Document(doc), markers))
        }
        (FieldKind::List(item), Bson::Array(incoming)) => {
            let base: &[Bson] = match existing {
                Some(Bson::Array(a)) => a,
                _ => &[],
            };
            let mut out = Vec::with_capacity(incoming.len());
            for (i, r) in incoming.iter().enumerate() {
                let (v, markers) = reconcile(schemas, field, item, base.get(i), r, false)?;
                if !markers.is_empty() {
                    log::debug!("absorb: {field}.{i} dropped {} nested markers", markers.len());
                }
                out.push(v);
            }
            Ok((Bson::Array(out), Markers::new()))
        }
        (FieldKind::Map(inner), Bson::Document(incoming)) => {
            let base = match existing {
                Some(Bson::Document(d)) => Some(d),
                _ => None,
            };
            let mut out = Document::new();
            let mut markers = Markers::new();
            for (k, r) in incoming {
                let prev = base.and_then(|d| d.get(k));
                let (v, inner_markers) = reconcile(schemas, k, inner, prev, r, false)?;
                if !inner_markers.is_empty() {
                    markers.insert(k.clone(), Delta::Nested(inner_markers));
                }
                out.insert(k.clone(), v);
            }
            Ok((Bson::Document(out), markers))
        }
        _ => Ok((coerce(schemas, field, kind, raw)?, Markers::new())),
    }
}

fn reconcile_document<S: SchemaSource + ?Sized>(
    schemas: &S,
    schema: &Schema,
    mut base: Document,
    incoming: &Document,
    update_mode: bool,
) -> Result<(Document, Markers), OdmError> {
    let mut markers = Markers::new();
    for (k, r) in incoming {
        let Some(desc) = schema.get(k) else {
            markers.insert(k.clone(), Delta::Unknown);
            continue;
        };
        let (merged, inner) =
            reconcile(schemas, &desc.name, &desc.kind, base.get(k), r, update_mode)?;
        if !inner.is_empty() {
            markers.insert(k.clone(), Delta::Nested(inner));
        }
        base.insert(k.clone(), merged);
    }
    if !update_mode {
        for f in schema.fields().iter().filter(|f| !f.internal && !incoming.contains_key(&f.name)) {
            if base.remove(&f.name).is_some() {
                markers.insert(f.name.clone(), Delta::Deleted);
            }
        }
    }
    Ok((base, markers))
}

/// Lay markers over a computed delta. A marker replaces whatever diff entry
/// sits at its key. A whole-value change is kept as is.
fn overlay(delta: Delta, markers: Markers) -> Delta {
    if markers.is_empty() {
        return delta;
    }
    let mut entries = match delta {
        Delta::Nested(entries) => entries,
        d if d.is_empty() => BTreeMap::new(),
        d => return d,
    };
    for (k, m) in markers {
        match m {
            Delta::Nested(sub) => {
                let merged = overlay(entries.remove(&k).unwrap_or_default(), sub);
                if !merged.is_empty() {
                    entries.insert(k, merged);
                }
            }
            marker => {
                entries.insert(k, marker);
            }
        }
    }
    Delta::Nested(entries)
}
