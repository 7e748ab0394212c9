use bson::Bson;

use super::types::{UpdateExpression, UpdateOp};
use crate::errors::OdmError;
use crate::query::Field;
use crate::query::compare::is_numeric;

impl Field {
    fn term(&self, op: UpdateOp, operand: Bson) -> UpdateExpression {
        UpdateExpression::single(op, self.path(), operand)
    }

    #[must_use]
    pub fn set(&self, v: impl Into<Bson>) -> UpdateExpression {
        self.term(UpdateOp::Set, v.into())
    }

    #[must_use]
    pub fn unset(&self) -> UpdateExpression {
        self.term(UpdateOp::Unset, Bson::Int32(1))
    }

    /// # Errors
    /// `InvalidOperand` if `by` is not numeric.
    pub fn inc(&self, by: impl Into<Bson>) -> Result<UpdateExpression, OdmError> {
        let by = by.into();
        if !is_numeric(&by) {
            return Err(OdmError::operand("inc", "expected a number"));
        }
        Ok(self.term(UpdateOp::Inc, by))
    }

    /// `$inc` by the negation of `by`.
    ///
    /// # Errors
    /// `InvalidOperand` if `by` is not numeric.
    pub fn dec(&self, by: impl Into<Bson>) -> Result<UpdateExpression, OdmError> {
        let negated = match by.into() {
            Bson::Int32(n) => n.checked_neg().map_or(Bson::Int64(-i64::from(n)), Bson::Int32),
            Bson::Int64(n) => n.checked_neg().map_or(Bson::Double(-(n as f64)), Bson::Int64),
            Bson::Double(n) => Bson::Double(-n),
            _ => return Err(OdmError::operand("inc", "expected a number")),
        };
        Ok(self.term(UpdateOp::Inc, negated))
    }

    #[must_use]
    pub fn push(&self, v: impl Into<Bson>) -> UpdateExpression {
        self.term(UpdateOp::Push, v.into())
    }

    #[must_use]
    pub fn push_all<I, V>(&self, values: I) -> UpdateExpression
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.term(UpdateOp::PushAll, Bson::Array(values.into_iter().map(Into::into).collect()))
    }

    #[must_use]
    pub fn pull(&self, v: impl Into<Bson>) -> UpdateExpression {
        self.term(UpdateOp::Pull, v.into())
    }

    #[must_use]
    pub fn pull_all<I, V>(&self, values: I) -> UpdateExpression
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.term(UpdateOp::PullAll, Bson::Array(values.into_iter().map(Into::into).collect()))
    }

    #[must_use]
    pub fn add_to_set(&self, v: impl Into<Bson>) -> UpdateExpression {
        self.term(UpdateOp::AddToSet, v.into())
    }

    /// Remove the last element.
    #[must_use]
    pub fn pop(&self) -> UpdateExpression {
        self.term(UpdateOp::Pop, Bson::Int32(1))
    }

    /// Remove the first element.
    #[must_use]
    pub fn pop_first(&self) -> UpdateExpression {
        self.term(UpdateOp::PopFirst, Bson::Int32(-1))
    }
}
