use bson::{Bson, Document};

use crate::config::Limits;
use crate::errors::OdmError;
use crate::path::{Path, Segment};
use crate::schema::{FieldKind, GENERIC, SchemaSource, coerce};

/// Read the value at `path` without modifying `root`. Absent embedded
/// documents and map entries read as their kind's empty value.
///
/// # Errors
/// `UnknownField` for names the container does not declare (or addressing into
/// a scalar), `IndexOutOfRange` for list indices past the end.
pub fn resolve<S: SchemaSource + ?Sized>(
    schemas: &S,
    schema: &str,
    root: &Document,
    path: &Path,
) -> Result<Bson, OdmError> {
    let (seg, rest) = split(path)?;
    read_in(schemas, schema, Some(root), seg, rest, path, 0)
}

fn read_in<S: SchemaSource + ?Sized>(
    schemas: &S,
    schema: &str,
    doc: Option<&Document>,
    seg: &Segment,
    rest: &[Segment],
    path: &Path,
    depth: usize,
) -> Result<Bson, OdmError> {
    let desc = schemas.field_for(schema, &seg.key())?;
    read_child(schemas, &desc.kind, doc.and_then(|d| d.get(&desc.name)), rest, path, depth + 1)
}

fn read_child<S: SchemaSource + ?Sized>(
    schemas: &S,
    kind: &FieldKind,
    child: Option<&Bson>,
    segs: &[Segment],
    path: &Path,
    depth: usize,
) -> Result<Bson, OdmError> {
    match child {
        Some(v) => read(schemas, kind, v, segs, path, depth),
        None => read(schemas, kind, &kind.empty(), segs, path, depth),
    }
}

fn read<S: SchemaSource + ?Sized>(
    schemas: &S,
    kind: &FieldKind,
    value: &Bson,
    segs: &[Segment],
    path: &Path,
    depth: usize,
) -> Result<Bson, OdmError> {
    let Some((seg, rest)) = segs.split_first() else {
        return Ok(value.clone());
    };
    match (kind, value) {
        (FieldKind::Embedded(name), Bson::Document(_) | Bson::Null) => {
            read_in(schemas, name, doc_ref(value), seg, rest, path, depth)
        }
        (FieldKind::Map(inner), Bson::Document(_) | Bson::Null) => {
            let child = doc_ref(value).and_then(|d| d.get(seg.key()));
            read_child(schemas, inner, child, rest, path, depth + 1)
        }
        (FieldKind::Dict | FieldKind::Generic, Bson::Document(d)) => {
            read_child(schemas, &GENERIC, d.get(seg.key()), rest, path, depth + 1)
        }
        (FieldKind::List(_) | FieldKind::Generic, Bson::Array(items)) => {
            let item = match kind {
                FieldKind::List(item) => item.as_ref(),
                _ => &GENERIC,
            };
            let i = list_index(seg, path, depth)?;
            let v = items.get(i).ok_or_else(|| out_of_range(path, depth, i, items.len()))?;
            read(schemas, item, v, rest, path, depth + 1)
        }
        (FieldKind::List(_), Bson::Null) => {
            let i = list_index(seg, path, depth)?;
            Err(out_of_range(path, depth, i, 0))
        }
        _ => Err(not_a_container(path, depth, seg)),
    }
}

/// Assign `value` at `path_text` inside `doc`, a document of `schema`.
///
/// Intermediate embedded documents and map entries are created when absent.
/// The value is coerced to the terminal field's kind. A list index terminal
/// replaces an existing element; lists never grow.
///
/// # Errors
/// `MalformedPath`, `UnknownField`, `IndexOutOfRange`, or `InvalidLiteral`
/// from coercion. `doc` is unchanged on error.
pub fn apply_path<S: SchemaSource + ?Sized>(
    schemas: &S,
    schema: &str,
    doc: &mut Document,
    path_text: &str,
    value: impl Into<Bson>,
) -> Result<(), OdmError> {
    apply_path_with(schemas, schema, doc, path_text, value, &Limits::default())
}

/// [`apply_path`] with the path depth bound taken from `limits`.
///
/// # Errors
/// As [`apply_path`].
pub fn apply_path_with<S: SchemaSource + ?Sized>(
    schemas: &S,
    schema: &str,
    doc: &mut Document,
    path_text: &str,
    value: impl Into<Bson>,
    limits: &Limits,
) -> Result<(), OdmError> {
    let path = Path::parse_with(path_text, limits)?;
    apply_parsed(schemas, schema, doc, &path, value.into())
}

/// [`apply_path`] with an already parsed path.
///
/// # Errors
/// As [`apply_path`].
pub fn apply_parsed<S: SchemaSource + ?Sized>(
    schemas: &S,
    schema: &str,
    doc: &mut Document,
    path: &Path,
    value: Bson,
) -> Result<(), OdmError> {
    let (seg, rest) = split(path)?;
    let mut working = doc.clone();
    assign_in(schemas, schema, &mut working, seg, rest, path, 0, value)?;
    *doc = working;
    crate::dev6!("{{\"apply_path\":\"{path}\",\"schema\":\"{schema}\"}}");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn assign_in<S: SchemaSource + ?Sized>(
    schemas: &S,
    schema: &str,
    doc: &mut Document,
    seg: &Segment,
    rest: &[Segment],
    path: &Path,
    depth: usize,
    value: Bson,
) -> Result<(), OdmError> {
    let desc = schemas.field_for(schema, &seg.key())?;
    if rest.is_empty() {
        let v = schemas.from_literal(desc, &value)?;
        doc.insert(desc.name.clone(), v);
        return Ok(());
    }
    let slot = doc.entry(desc.name.clone()).or_insert_with(|| desc.kind.empty());
    assign(schemas, &desc.kind, slot, rest, path, depth + 1, value)
}

fn assign<S: SchemaSource + ?Sized>(
    schemas: &S,
    kind: &FieldKind,
    slot: &mut Bson,
    segs: &[Segment],
    path: &Path,
    depth: usize,
    value: Bson,
) -> Result<(), OdmError> {
    let Some((seg, rest)) = segs.split_first() else {
        *slot = coerce(schemas, &path.to_string(), kind, &value)?;
        return Ok(());
    };
    if matches!(slot, Bson::Null) && !matches!(kind, FieldKind::List(_)) {
        *slot = kind.empty();
    }
    match (kind, slot) {
        (FieldKind::Embedded(name), Bson::Document(d)) => {
            assign_in(schemas, name, d, seg, rest, path, depth, value)
        }
        (FieldKind::Map(inner), Bson::Document(d)) => {
            let child = d.entry(seg.key()).or_insert_with(|| inner.empty());
            assign(schemas, inner, child, rest, path, depth + 1, value)
        }
        (FieldKind::Dict | FieldKind::Generic, Bson::Document(d)) => {
            let child = d.entry(seg.key()).or_insert(Bson::Null);
            assign(schemas, &GENERIC, child, rest, path, depth + 1, value)
        }
        (FieldKind::List(item), Bson::Array(items)) => {
            let i = list_index(seg, path, depth)?;
            let len = items.len();
            let elem = items.get_mut(i).ok_or_else(|| out_of_range(path, depth, i, len))?;
            assign(schemas, item, elem, rest, path, depth + 1, value)
        }
        (FieldKind::Generic, Bson::Array(items)) => {
            let i = list_index(seg, path, depth)?;
            let len = items.len();
            let elem = items.get_mut(i).ok_or_else(|| out_of_range(path, depth, i, len))?;
            assign(schemas, &GENERIC, elem, rest, path, depth + 1, value)
        }
        (FieldKind::List(_), Bson::Null) => {
            let i = list_index(seg, path, depth)?;
            Err(out_of_range(path, depth, i, 0))
        }
        _ => Err(not_a_container(path, depth, seg)),
    }
}

fn split(path: &Path) -> Result<(&Segment, &[Segment]), OdmError> {
    path.segments().split_first().ok_or_else(|| OdmError::MalformedPath {
        path: path.to_string(),
        reason: "empty path".into(),
    })
}

fn doc_ref(v: &Bson) -> Option<&Document> {
    match v {
        Bson::Document(d) => Some(d),
        _ => None,
    }
}

fn list_index(seg: &Segment, path: &Path, depth: usize) -> Result<usize, OdmError> {
    match seg {
        Segment::Index(i) => Ok(*i),
        Segment::Name(_) => Err(not_a_container(path, depth, seg)),
    }
}

fn out_of_range(path: &Path, depth: usize, index: usize, len: usize) -> OdmError {
    OdmError::IndexOutOfRange { path: path.prefix(depth), index, len }
}

fn not_a_container(path: &Path, depth: usize, seg: &Segment) -> OdmError {
    OdmError::UnknownField { container: path.prefix(depth), field: seg.key() }
}
