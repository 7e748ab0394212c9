use bson::oid::ObjectId;
use bson::{Bson, Document};
use chrono::{NaiveDate, NaiveDateTime};

use super::{FieldDescriptor, FieldKind, SchemaSource};
use crate::errors::OdmError;
use crate::query::int_bson;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// [`coerce`] against a descriptor's own kind.
///
/// # Errors
/// As [`coerce`].
pub fn from_literal<S: SchemaSource + ?Sized>(
    schemas: &S,
    field: &FieldDescriptor,
    raw: &Bson,
) -> Result<Bson, OdmError> {
    coerce(schemas, &field.name, &field.kind, raw)
}

/// Convert `raw` into the stored form of `kind`. `Null` is accepted for every kind.
///
/// # Errors
/// `InvalidLiteral` when `raw` has no sensible reading for `kind`; `UnknownField`
/// for keys an embedded schema does not declare.
pub fn coerce<S: SchemaSource + ?Sized>(
    schemas: &S,
    field: &str,
    kind: &FieldKind,
    raw: &Bson,
) -> Result<Bson, OdmError> {
    if matches!(raw, Bson::Null) {
        return Ok(Bson::Null);
    }
    let bad = |want: &str| OdmError::literal(field, format!("expected {want}, got {raw}"));
    match kind {
        FieldKind::Generic => Ok(raw.clone()),
        FieldKind::String => match raw {
            Bson::String(_) => Ok(raw.clone()),
            Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Boolean(_) => {
                Ok(Bson::String(raw.to_string()))
            }
            _ => Err(bad("a string")),
        },
        FieldKind::Integer => match raw {
            Bson::Int32(_) | Bson::Int64(_) => Ok(raw.clone()),
            Bson::Double(d) => whole_i64(*d).map(int_bson).ok_or_else(|| bad("an integer")),
            Bson::String(s) => s.trim().parse::<i64>().map(int_bson).map_err(|_| bad("an integer")),
            _ => Err(bad("an integer")),
        },
        FieldKind::Float => match raw {
            Bson::Double(_) => Ok(raw.clone()),
            Bson::Int32(i) => Ok(Bson::Double(f64::from(*i))),
            Bson::Int64(i) => Ok(Bson::Double(*i as f64)),
            Bson::String(s) => s.trim().parse::<f64>().map(Bson::Double).map_err(|_| bad("a number")),
            _ => Err(bad("a number")),
        },
        FieldKind::Boolean => match raw {
            Bson::Boolean(_) => Ok(raw.clone()),
            Bson::Int32(i) => Ok(Bson::Boolean(*i != 0)),
            Bson::Int64(i) => Ok(Bson::Boolean(*i != 0)),
            Bson::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Bson::Boolean(true)),
                "false" | "0" => Ok(Bson::Boolean(false)),
                _ => Err(bad("a boolean")),
            },
            _ => Err(bad("a boolean")),
        },
        FieldKind::DateTime => datetime(raw).ok_or_else(|| bad("a datetime")),
        FieldKind::ObjectId => match raw {
            Bson::ObjectId(_) => Ok(raw.clone()),
            Bson::String(s) => ObjectId::parse_str(s).map(Bson::ObjectId).map_err(|_| bad("an object id")),
            _ => Err(bad("an object id")),
        },
        FieldKind::Dict => match raw {
            Bson::Document(_) => Ok(raw.clone()),
            _ => Err(bad("a document")),
        },
        FieldKind::Reference(_) => match raw {
            Bson::Document(d) => d
                .get("_id")
                .or_else(|| d.get("id"))
                .cloned()
                .ok_or_else(|| bad("a record key")),
            Bson::Array(_) => Err(bad("a record key")),
            _ => Ok(raw.clone()),
        },
        FieldKind::List(item) => match raw {
            Bson::Array(items) => items
                .iter()
                .map(|v| coerce(schemas, field, item, v))
                .collect::<Result<Vec<_>, _>>()
                .map(Bson::Array),
            _ => Err(bad("a list")),
        },
        FieldKind::Map(value) => match raw {
            Bson::Document(d) => {
                let mut out = Document::new();
                for (k, v) in d {
                    out.insert(k.clone(), coerce(schemas, k, value, v)?);
                }
                Ok(Bson::Document(out))
            }
            _ => Err(bad("a mapping")),
        },
        FieldKind::Embedded(name) => match raw {
            Bson::Document(d) => {
                let mut out = Document::new();
                for (k, v) in d {
                    let desc = schemas.field_for(name, k)?;
                    out.insert(k.clone(), from_literal(schemas, desc, v)?);
                }
                Ok(Bson::Document(out))
            }
            _ => Err(bad("a document")),
        },
    }
}

/// Truncate toward zero; `None` when the result does not fit an `i64`.
fn whole_i64(d: f64) -> Option<i64> {
    let t = d.trunc();
    (t.is_finite() && (i64::MIN as f64..i64::MAX as f64).contains(&t)).then(|| t as i64)
}

/// Datetimes accept BSON dates, epoch seconds, `"now"`, RFC 3339 and a few
/// plain date layouts (read as UTC).
fn datetime(raw: &Bson) -> Option<Bson> {
    let millis = match raw {
        Bson::DateTime(_) => return Some(raw.clone()),
        Bson::Int32(s) => i64::from(*s).checked_mul(1000)?,
        Bson::Int64(s) => s.checked_mul(1000)?,
        Bson::Double(s) => whole_i64(s * 1000.0)?,
        Bson::String(s) => parse_datetime_text(s.trim())?,
        _ => return None,
    };
    Some(Bson::DateTime(bson::DateTime::from_millis(millis)))
}

fn parse_datetime_text(s: &str) -> Option<i64> {
    if s.eq_ignore_ascii_case("now") {
        return Some(bson::DateTime::now().timestamp_millis());
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp_millis());
        }
    }
    None
}
