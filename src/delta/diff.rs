use bson::{Bson, Document};
use std::collections::BTreeMap;

use super::types::Delta;
use crate::errors::OdmError;
use crate::query::compare::values_equal;
use crate::schema::{FieldKind, Schema, SchemaSource, project};

/// Field-level difference of `current` against `base`, both documents of `schema`.
///
/// Absent fields compare as their kind's empty value, so diffing against an
/// empty base reports every populated field.
///
/// # Errors
/// `UnknownSchema` if `schema` or a nested embedded schema is not registered.
pub fn diff<S: SchemaSource + ?Sized>(
    schemas: &S,
    schema: &str,
    current: &Document,
    base: &Document,
) -> Result<Delta, OdmError> {
    let delta = diff_fields(schemas, schemas.require(schema)?, current, base)?;
    crate::dev6!(
        "{{\"diff\":\"{schema}\",\"changed\":{}}}",
        delta.entries().map_or(0, BTreeMap::len)
    );
    Ok(delta)
}

pub(crate) fn diff_fields<S: SchemaSource + ?Sized>(
    schemas: &S,
    schema: &Schema,
    current: &Document,
    base: &Document,
) -> Result<Delta, OdmError> {
    let mut out = BTreeMap::new();
    for f in schema.fields() {
        let d = diff_present(schemas, &f.kind, current.get(&f.name), base.get(&f.name))?;
        if !d.is_empty() {
            out.insert(f.name.clone(), d);
        }
    }
    Ok(Delta::Nested(out))
}

fn diff_present<S: SchemaSource + ?Sized>(
    schemas: &S,
    kind: &FieldKind,
    current: Option<&Bson>,
    base: Option<&Bson>,
) -> Result<Delta, OdmError> {
    let empty = kind.empty();
    diff_value(schemas, kind, current.unwrap_or(&empty), base.unwrap_or(&empty))
}

pub(crate) fn diff_value<S: SchemaSource + ?Sized>(
    schemas: &S,
    kind: &FieldKind,
    current: &Bson,
    base: &Bson,
) -> Result<Delta, OdmError> {
    match kind {
        FieldKind::Embedded(name) => {
            if let (Some(c), Some(b)) = (as_doc(current), as_doc(base)) {
                return diff_fields(schemas, schemas.require(name)?, &c, &b);
            }
        }
        FieldKind::Map(inner) => {
            if let (Some(c), Some(b)) = (as_doc(current), as_doc(base)) {
                return diff_map(schemas, inner, &c, &b);
            }
        }
        FieldKind::List(item) => {
            if let (Some(c), Some(b)) = (as_list(current), as_list(base)) {
                return diff_list(schemas, item, c, b);
            }
        }
        _ => {}
    }
    Ok(diff_scalar(schemas, kind, current, base))
}

fn diff_scalar<S: SchemaSource + ?Sized>(
    schemas: &S,
    kind: &FieldKind,
    current: &Bson,
    base: &Bson,
) -> Delta {
    let new = project(schemas, kind, current, false);
    let old = project(schemas, kind, base, false);
    if values_equal(&new, &old) { Delta::default() } else { Delta::Changed { old, new } }
}

fn diff_map<S: SchemaSource + ?Sized>(
    schemas: &S,
    inner: &FieldKind,
    current: &Document,
    base: &Document,
) -> Result<Delta, OdmError> {
    let mut out = BTreeMap::new();
    let keys = current.keys().chain(base.keys().filter(|k| !current.contains_key(k.as_str())));
    for k in keys {
        let d = diff_present(schemas, inner, current.get(k), base.get(k))?;
        if !d.is_empty() {
            out.insert(k.clone(), d);
        }
    }
    Ok(Delta::Nested(out))
}

/// Members are matched one-to-one by projected equality; whatever is left over
/// is added or removed. Container elements unmatched on both sides at the same
/// index are also diffed in place.
fn diff_list<S: SchemaSource + ?Sized>(
    schemas: &S,
    item: &FieldKind,
    current: &[Bson],
    base: &[Bson],
) -> Result<Delta, OdmError> {
    let cur: Vec<Bson> = current.iter().map(|v| project(schemas, item, v, false)).collect();
    let old: Vec<Bson> = base.iter().map(|v| project(schemas, item, v, false)).collect();
    let mut cur_matched = vec![false; cur.len()];
    let mut old_matched = vec![false; old.len()];
    for (i, c) in cur.iter().enumerate() {
        if let Some(j) = (0..old.len()).find(|&j| !old_matched[j] && values_equal(c, &old[j])) {
            cur_matched[i] = true;
            old_matched[j] = true;
        }
    }
    let added = unmatched(&cur, &cur_matched);
    let removed = unmatched(&old, &old_matched);

    let mut elements = BTreeMap::new();
    if item.is_container() {
        for i in 0..current.len().min(base.len()) {
            if cur_matched[i] || old_matched[i] {
                continue;
            }
            let d = diff_value(schemas, item, &current[i], &base[i])?;
            if !d.is_empty() {
                elements.insert(i, d);
            }
        }
    }
    Ok(Delta::Sequence { added, removed, elements })
}

fn unmatched(values: &[Bson], matched: &[bool]) -> Vec<Bson> {
    values.iter().zip(matched).filter(|(_, m)| !**m).map(|(v, _)| v.clone()).collect()
}

fn as_doc(v: &Bson) -> Option<std::borrow::Cow<'_, Document>> {
    match v {
        Bson::Document(d) => Some(std::borrow::Cow::Borrowed(d)),
        Bson::Null => Some(std::borrow::Cow::Owned(Document::new())),
        _ => None,
    }
}

fn as_list(v: &Bson) -> Option<&[Bson]> {
    match v {
        Bson::Array(items) => Some(items),
        Bson::Null => Some(&[]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;
    use bson::doc;

    fn reg() -> SchemaRegistry {
        SchemaRegistry::new()
            .with(Schema::new("Entry").field("note", FieldKind::String))
            .with(
                Schema::new("User")
                    .field("name", FieldKind::String)
                    .field("age", FieldKind::Integer)
                    .field("seen", FieldKind::DateTime)
                    .field("foods", FieldKind::list(FieldKind::String))
                    .field("history", FieldKind::list(FieldKind::embedded("Entry")))
                    .field("scores", FieldKind::map(FieldKind::Integer)),
            )
    }

    #[test]
    fn numbers_compare_by_value() {
        let d = diff(&reg(), "User", &doc! {"age": 3_i64}, &doc! {"age": 3}).unwrap();
        assert!(d.is_empty());
    }

    #[test]
    fn datetimes_compare_at_second_granularity() {
        let a = doc! {"seen": bson::DateTime::from_millis(10_000)};
        let b = doc! {"seen": bson::DateTime::from_millis(10_900)};
        assert!(diff(&reg(), "User", &a, &b).unwrap().is_empty());
    }

    #[test]
    fn one_add_one_remove_is_reported_exactly() {
        let base = doc! {"foods": ["pizza", "tacos", "sushi"]};
        let cur = doc! {"foods": ["pizza", "sushi", "ramen"]};
        let d = diff(&reg(), "User", &cur, &base).unwrap();
        assert_eq!(d.to_document(), doc! {"foods": {"added": ["ramen"], "removed": ["tacos"]}});
    }

    #[test]
    fn embedded_list_elements_diff_in_place() {
        let base = doc! {"history": [{"note": "a"}, {"note": "b"}]};
        let cur = doc! {"history": [{"note": "a"}, {"note": "c"}]};
        let d = diff(&reg(), "User", &cur, &base).unwrap();
        assert_eq!(
            d.to_document(),
            doc! {"history": {
                "added": [{"note": "c"}],
                "removed": [{"note": "b"}],
                "1": {"note": {"old": "b", "new": "c"}},
            }}
        );
    }

    #[test]
    fn absent_base_reports_everything() {
        let cur = doc! {"name": "stan", "foods": ["pizza"], "scores": {"math": 3}};
        let d = diff(&reg(), "User", &cur, &Document::new()).unwrap();
        assert_eq!(
            d.to_document(),
            doc! {
                "foods": {"added": ["pizza"], "removed": []},
                "name": {"old": null, "new": "stan"},
                "scores": {"math": {"old": null, "new": 3}},
            }
        );
    }
}
