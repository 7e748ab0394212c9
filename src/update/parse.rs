use bson::{Bson, Document};

use super::types::{UpdateExpression, UpdateOp, UpdateTerm};
use crate::errors::OdmError;
use crate::query::compare::is_numeric;

impl UpdateExpression {
    /// Parse `{"$op": {"path": operand}, ...}` back into terms.
    ///
    /// # Errors
    /// `InvalidOperand` on unknown operators, non-document operator bodies,
    /// or operands of the wrong shape; `ConflictingUpdate` if merging the
    /// parsed terms fails.
    pub fn from_document(doc: &Document) -> Result<Self, OdmError> {
        let mut out = Self::new();
        for (key, body) in doc {
            let Bson::Document(fields) = body else {
                return Err(OdmError::operand(key.trim_start_matches('$'), "expected a document"));
            };
            for (path, operand) in fields {
                let op = parse_op(key, operand)?;
                out.push_term(UpdateTerm { op, path: path.clone(), operand: operand.clone() })?;
            }
        }
        Ok(out)
    }
}

/// # Errors
/// Malformed JSON, or anything [`UpdateExpression::from_document`] rejects.
pub fn parse_update_json(json: &str) -> Result<UpdateExpression, OdmError> {
    let doc: Document = serde_json::from_str(json)?;
    UpdateExpression::from_document(&doc)
}

fn parse_op(key: &str, operand: &Bson) -> Result<UpdateOp, OdmError> {
    let op = match key {
        "$set" => UpdateOp::Set,
        "$unset" => UpdateOp::Unset,
        "$inc" => {
            if !is_numeric(operand) {
                return Err(OdmError::operand("inc", "expected a number"));
            }
            UpdateOp::Inc
        }
        "$push" => UpdateOp::Push,
        "$pushAll" | "$pullAll" => {
            if !matches!(operand, Bson::Array(_)) {
                return Err(OdmError::operand(&key[1..], "expected an array"));
            }
            if key == "$pushAll" { UpdateOp::PushAll } else { UpdateOp::PullAll }
        }
        "$pull" => UpdateOp::Pull,
        "$addToSet" => UpdateOp::AddToSet,
        "$pop" => match operand {
            Bson::Int32(1) | Bson::Int64(1) => UpdateOp::Pop,
            Bson::Int32(-1) | Bson::Int64(-1) => UpdateOp::PopFirst,
            _ => return Err(OdmError::operand("pop", "expected 1 or -1")),
        },
        other => {
            return Err(OdmError::operand(other.trim_start_matches('$'), "unknown update operator"));
        }
    };
    Ok(op)
}
