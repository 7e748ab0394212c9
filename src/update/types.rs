use bson::{Bson, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateOp {
    Set,
    Unset,
    Inc,
    Push,
    PushAll,
    Pull,
    PullAll,
    AddToSet,
    Pop,
    PopFirst,
}

impl UpdateOp {
    /// Top-level wire key. `Pop` and `PopFirst` share `$pop`.
    #[must_use]
    pub const fn wire_key(self) -> &'static str {
        match self {
            Self::Set => "$set",
            Self::Unset => "$unset",
            Self::Inc => "$inc",
            Self::Push => "$push",
            Self::PushAll => "$pushAll",
            Self::Pull => "$pull",
            Self::PullAll => "$pullAll",
            Self::AddToSet => "$addToSet",
            Self::Pop | Self::PopFirst => "$pop",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateTerm {
    pub op: UpdateOp,
    pub path: String,
    pub operand: Bson,
}

/// Ordered set of mutation terms; at most one term per `(wire key, path)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateExpression {
    pub(crate) terms: Vec<UpdateTerm>,
}

impl UpdateExpression {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn single(op: UpdateOp, path: impl Into<String>, operand: Bson) -> Self {
        Self { terms: vec![UpdateTerm { op, path: path.into(), operand }] }
    }

    #[must_use]
    pub fn terms(&self) -> &[UpdateTerm] {
        &self.terms
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// `{"$op": {"path": operand}}` with sibling `$` keys in first-appearance order.
    #[must_use]
    pub fn compile(&self) -> Document {
        let mut out = Document::new();
        for t in &self.terms {
            let key = t.op.wire_key();
            if !out.contains_key(key) {
                out.insert(key, Document::new());
            }
            if let Some(Bson::Document(fields)) = out.get_mut(key) {
                fields.insert(t.path.clone(), t.operand.clone());
            }
        }
        crate::dev6!(
            "{{\"compile\":\"update\",\"terms\":{},\"ops\":{}}}",
            self.terms.len(),
            out.len()
        );
        out
    }
}
