use bson::{Bson, Document};

use super::expr::Expression;
use super::field::check_mod_operand;
use super::ops::Operator;
use crate::config::Limits;
use crate::errors::OdmError;

impl Expression {
    /// Parse a canonical query document back into an expression.
    ///
    /// # Errors
    /// `InvalidOperand` on unknown operators or operands of the wrong shape.
    pub fn from_document(doc: &Document) -> Result<Self, OdmError> {
        Self::from_document_with(doc, &Limits::default())
    }

    /// # Errors
    /// As [`Expression::from_document`].
    pub fn from_document_with(doc: &Document, limits: &Limits) -> Result<Self, OdmError> {
        let mut out = Self::And(Vec::new());
        for (key, value) in doc {
            let term = match key.as_str() {
                "$or" => Self::Or(parse_list("or", value, limits)?),
                "$and" => parse_list("and", value, limits)?
                    .into_iter()
                    .fold(Self::And(Vec::new()), Self::and),
                "$nor" => Self::Not(Box::new(Self::Or(parse_list("nor", value, limits)?))),
                k if k.starts_with('$') => {
                    return Err(OdmError::operand(&k[1..], "unsupported top-level operator"));
                }
                path => parse_field(path, value, limits)?,
            };
            out = out.and(term);
        }
        Ok(out)
    }
}

/// # Errors
/// Returns an error if the JSON is malformed or is not a valid query document.
pub fn parse_query_json(json: &str) -> Result<Expression, OdmError> {
    parse_query_json_with(json, &Limits::default())
}

/// # Errors
/// As [`parse_query_json`].
pub fn parse_query_json_with(json: &str, limits: &Limits) -> Result<Expression, OdmError> {
    let doc: Document = serde_json::from_str(json)?;
    Expression::from_document_with(&doc, limits)
}

fn parse_list(op: &str, value: &Bson, limits: &Limits) -> Result<Vec<Expression>, OdmError> {
    let Bson::Array(items) = value else {
        return Err(OdmError::operand(op, "expected an array of documents"));
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => Expression::from_document_with(d, limits),
            _ => Err(OdmError::operand(op, "expected an array of documents")),
        })
        .collect()
}

fn is_operator_doc(d: &Document) -> bool {
    !d.is_empty() && d.keys().all(|k| k.starts_with('$'))
}

fn parse_field(path: &str, value: &Bson, limits: &Limits) -> Result<Expression, OdmError> {
    match value {
        Bson::Document(ops) if is_operator_doc(ops) => parse_ops(path, ops, limits),
        _ => Ok(Expression::leaf(path, Vec::new(), value.clone())),
    }
}

fn parse_ops(path: &str, ops: &Document, limits: &Limits) -> Result<Expression, OdmError> {
    let mut out = Expression::And(Vec::new());
    for (key, operand) in ops {
        let op = Operator::from_wire(key)
            .ok_or_else(|| OdmError::operand(key.trim_start_matches('$'), "unknown operator"))?;
        let term = if op == Operator::Not {
            let Bson::Document(inner) = operand else {
                return Err(OdmError::operand("not", "expected an operator document"));
            };
            if !is_operator_doc(inner) {
                return Err(OdmError::operand("not", "expected an operator document"));
            }
            // A multi-operator body negates the whole conjunction, not each operator.
            match parse_ops(path, inner, limits)? {
                Expression::Leaf(mut l) => {
                    l.chain.insert(0, Operator::Not);
                    Expression::Leaf(l)
                }
                body => Expression::Not(Box::new(body)),
            }
        } else {
            Expression::leaf(path, vec![op], check_operand(op, operand, limits)?)
        };
        out = out.and(term);
    }
    Ok(out)
}

fn check_operand(op: Operator, operand: &Bson, limits: &Limits) -> Result<Bson, OdmError> {
    match op {
        Operator::In | Operator::Nin | Operator::All => {
            let Bson::Array(items) = operand else {
                return Err(OdmError::operand(op.name(), "expected an array"));
            };
            if items.len() > limits.max_in_set {
                log::warn!(
                    "${} list of {} values exceeds the limit of {}",
                    op.name(),
                    items.len(),
                    limits.max_in_set
                );
                return Err(OdmError::operand(
                    op.name(),
                    format!("more than {} values", limits.max_in_set),
                ));
            }
            Ok(operand.clone())
        }
        Operator::Mod => {
            check_mod_operand(operand)?;
            Ok(operand.clone())
        }
        Operator::Size => match operand {
            Bson::Int32(n) if *n >= 0 => Ok(operand.clone()),
            Bson::Int64(n) if *n >= 0 => Ok(operand.clone()),
            _ => Err(OdmError::operand("size", "expected a non-negative integer")),
        },
        Operator::Exists => match operand {
            Bson::Boolean(_) => Ok(operand.clone()),
            _ => Err(OdmError::operand("exists", "expected a boolean")),
        },
        Operator::Type => match operand {
            Bson::Int32(_) | Bson::Int64(_) | Bson::String(_) => Ok(operand.clone()),
            _ => Err(OdmError::operand("type", "expected a type code or alias")),
        },
        Operator::Where => match operand {
            Bson::String(_) => Ok(operand.clone()),
            _ => Err(OdmError::operand("where", "expected JavaScript source")),
        },
        #[cfg(feature = "regex")]
        Operator::Regex => match operand {
            Bson::String(p) => {
                regex::Regex::new(p).map_err(|e| OdmError::operand("regex", e.to_string()))?;
                Ok(operand.clone())
            }
            _ => Err(OdmError::operand("regex", "expected a pattern string")),
        },
        _ => Ok(operand.clone()),
    }
}
