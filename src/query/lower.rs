use bson::{Bson, Document};

use super::expr::{Expression, Leaf};
use super::ops::Operator;

/// Lower an expression to the store's canonical query document.
///
/// Conjuncts become sibling keys. Conjuncts that would overwrite a key already
/// written are collected under a trailing `$and` list instead.
#[must_use]
pub fn compile(expr: &Expression) -> Document {
    let mut out = Document::new();
    let mut overflow: Vec<Bson> = Vec::new();
    compile_into(expr, &mut out, &mut overflow);
    crate::dev6!(
        "{{\"compile\":\"query\",\"leaves\":{},\"keys\":{},\"overflow\":{}}}",
        expr.leaf_count(),
        out.len(),
        overflow.len()
    );
    if !overflow.is_empty() {
        out.insert("$and", overflow);
    }
    out
}

fn compile_into(expr: &Expression, out: &mut Document, overflow: &mut Vec<Bson>) {
    match expr {
        Expression::Leaf(l) => {
            if !insert_leaf(out, l) {
                overflow.push(Bson::Document(compile_leaf(l)));
            }
        }
        Expression::And(terms) => {
            for t in terms {
                compile_into(t, out, overflow);
            }
        }
        Expression::Or(terms) => {
            let arr: Vec<Bson> = terms.iter().map(|t| Bson::Document(compile(t))).collect();
            if out.contains_key("$or") {
                let mut d = Document::new();
                d.insert("$or", arr);
                overflow.push(Bson::Document(d));
            } else {
                out.insert("$or", arr);
            }
        }
        Expression::Not(inner) => match negated_body(inner) {
            Some(leaf) => compile_into(&Expression::Leaf(leaf), out, overflow),
            None => compile_into(&inner.invert(), out, overflow),
        },
    }
}

/// `NOT (a op1 x AND a op2 y)` as one `{a: {"$not": {op1: x, op2: y}}}` leaf,
/// when every conjunct is an operator leaf on the same path.
fn negated_body(inner: &Expression) -> Option<Leaf> {
    let Expression::And(terms) = inner else { return None };
    let mut path = None;
    for t in terms {
        let Expression::Leaf(l) = t else { return None };
        if l.chain.is_empty() || path.is_some_and(|p: &str| p != l.path) {
            return None;
        }
        path = Some(l.path.as_str());
    }
    let path = path?;
    let mut body = Document::new();
    let mut overflow = Vec::new();
    compile_into(inner, &mut body, &mut overflow);
    if !overflow.is_empty() || body.len() != 1 {
        return None;
    }
    match body.remove(path)? {
        ops @ Bson::Document(_) => Some(Leaf::new(path, vec![Operator::Not], ops)),
        _ => None,
    }
}

/// `{path: operand}` or `{path: {"$op1": {"$op2": operand}}}`.
#[must_use]
pub fn compile_leaf(leaf: &Leaf) -> Document {
    let mut d = Document::new();
    d.insert(leaf.path.clone(), nest(&leaf.chain, leaf.operand.clone()));
    d
}

fn nest(chain: &[Operator], operand: Bson) -> Bson {
    match chain.split_first() {
        None => operand,
        Some((op, rest)) => {
            let mut d = Document::new();
            d.insert(op.wire_key(), nest(rest, operand));
            Bson::Document(d)
        }
    }
}

fn is_operator_doc(d: &Document) -> bool {
    !d.is_empty() && d.keys().all(|k| k.starts_with('$'))
}

fn insert_leaf(out: &mut Document, leaf: &Leaf) -> bool {
    let Some((first, rest)) = leaf.chain.split_first() else {
        if out.contains_key(&leaf.path) {
            return false;
        }
        out.insert(leaf.path.clone(), leaf.operand.clone());
        return true;
    };
    match out.get_mut(&leaf.path) {
        None => {
            out.insert(leaf.path.clone(), nest(&leaf.chain, leaf.operand.clone()));
            true
        }
        Some(Bson::Document(ops)) if is_operator_doc(ops) => {
            let key = first.wire_key();
            if ops.contains_key(&key) {
                return false;
            }
            ops.insert(key, nest(rest, leaf.operand.clone()));
            true
        }
        Some(_) => false,
    }
}
