use bson::Bson;

use super::types::{UpdateExpression, UpdateOp, UpdateTerm};
use crate::errors::OdmError;
use crate::query::compare::as_f64;

impl UpdateExpression {
    /// Combine two updates following the merge table:
    /// `inc` operands add, `pushAll`/`pullAll` operands concatenate, any other
    /// repeat of the same wire key on a path keeps the incoming term, a pending
    /// `unset` is discarded in favour of any later term on the same path, and
    /// different operators on one path are kept side by side.
    ///
    /// # Errors
    /// `ConflictingUpdate` when operands cannot be combined (e.g. summing a string).
    pub fn merge(&self, other: &Self) -> Result<Self, OdmError> {
        let mut out = self.clone();
        for t in &other.terms {
            out.push_term(t.clone())?;
        }
        Ok(out)
    }

    /// By-value form of [`UpdateExpression::merge`].
    ///
    /// # Errors
    /// As [`UpdateExpression::merge`].
    pub fn and(self, other: Self) -> Result<Self, OdmError> {
        let mut out = self;
        for t in other.terms {
            out.push_term(t)?;
        }
        Ok(out)
    }

    pub(crate) fn push_term(&mut self, incoming: UpdateTerm) -> Result<(), OdmError> {
        let key = incoming.op.wire_key();
        if let Some(existing) =
            self.terms.iter_mut().find(|t| t.path == incoming.path && t.op.wire_key() == key)
        {
            match (existing.op, incoming.op) {
                (UpdateOp::Inc, UpdateOp::Inc) => {
                    existing.operand =
                        add_numbers(&incoming.path, &existing.operand, &incoming.operand)?;
                }
                (UpdateOp::PushAll, UpdateOp::PushAll) | (UpdateOp::PullAll, UpdateOp::PullAll) => {
                    let (Bson::Array(acc), Bson::Array(more)) =
                        (&mut existing.operand, &incoming.operand)
                    else {
                        return Err(OdmError::ConflictingUpdate {
                            path: incoming.path,
                            reason: format!("{key} operands must both be arrays"),
                        });
                    };
                    acc.extend(more.iter().cloned());
                }
                _ => {
                    existing.op = incoming.op;
                    existing.operand = incoming.operand;
                }
            }
            return Ok(());
        }
        if incoming.op != UpdateOp::Unset {
            self.terms.retain(|t| !(t.op == UpdateOp::Unset && t.path == incoming.path));
        }
        self.terms.push(incoming);
        Ok(())
    }
}

/// Free-function form of [`UpdateExpression::merge`].
///
/// # Errors
/// As [`UpdateExpression::merge`].
pub fn merge(a: &UpdateExpression, b: &UpdateExpression) -> Result<UpdateExpression, OdmError> {
    a.merge(b)
}

fn add_numbers(path: &str, a: &Bson, b: &Bson) -> Result<Bson, OdmError> {
    let conflict = || OdmError::ConflictingUpdate {
        path: path.to_string(),
        reason: "$inc operands must be numeric".into(),
    };
    Ok(match (a, b) {
        (Bson::Int32(x), Bson::Int32(y)) => x
            .checked_add(*y)
            .map_or_else(|| Bson::Int64(i64::from(*x) + i64::from(*y)), Bson::Int32),
        (Bson::Int32(_) | Bson::Int64(_), Bson::Int32(_) | Bson::Int64(_)) => {
            let x = as_i64(a).ok_or_else(conflict)?;
            let y = as_i64(b).ok_or_else(conflict)?;
            match x.checked_add(y) {
                Some(n) => Bson::Int64(n),
                None => Bson::Double(as_f64(a).ok_or_else(conflict)? + as_f64(b).ok_or_else(conflict)?),
            }
        }
        _ => Bson::Double(as_f64(a).ok_or_else(conflict)? + as_f64(b).ok_or_else(conflict)?),
    })
}

fn as_i64(v: &Bson) -> Option<i64> {
    match v {
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inc(path: &str, by: Bson) -> UpdateExpression {
        UpdateExpression::single(UpdateOp::Inc, path, by)
    }

    #[test]
    fn int32_overflow_widens() {
        let m = inc("n", Bson::Int32(i32::MAX)).merge(&inc("n", Bson::Int32(1))).unwrap();
        assert_eq!(m.terms()[0].operand, Bson::Int64(i64::from(i32::MAX) + 1));
    }

    #[test]
    fn mixed_widths_sum() {
        let m = inc("n", Bson::Int64(4)).merge(&inc("n", Bson::Double(0.5))).unwrap();
        assert_eq!(m.terms()[0].operand, Bson::Double(4.5));
    }

    #[test]
    fn non_numeric_inc_conflicts() {
        let bad = inc("n", Bson::String("x".into()));
        let e = inc("n", Bson::Int32(1)).merge(&bad).unwrap_err();
        assert!(matches!(e, OdmError::ConflictingUpdate { .. }));
    }

    #[test]
    fn pop_directions_share_a_key() {
        let pop = UpdateExpression::single(UpdateOp::Pop, "f", Bson::Int32(1));
        let first = UpdateExpression::single(UpdateOp::PopFirst, "f", Bson::Int32(-1));
        let m = pop.merge(&first).unwrap();
        assert_eq!(m.terms().len(), 1);
        assert_eq!(m.terms()[0].op, UpdateOp::PopFirst);
    }
}
