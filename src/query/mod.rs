pub(crate) mod compare;
mod expr;
mod field;
mod lower;
mod ops;
mod parse;

pub use lower::{compile, compile_leaf};
pub use expr::{Expression, Leaf};
pub use field::{BsonType, Field};
pub use ops::{Operator, invert_chain};
pub use parse::{parse_query_json, parse_query_json_with};

pub(crate) use field::int_bson;

/// Negation of `expr` with inversion pushed down to every leaf.
#[must_use]
pub fn invert(expr: &Expression) -> Expression {
    expr.invert()
}

impl Expression {
    #[must_use]
    pub fn compile(&self) -> bson::Document {
        compile(self)
    }
}
