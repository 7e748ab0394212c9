mod combine;
mod field;
mod parse;
mod types;

pub use combine::merge;
pub use parse::parse_update_json;
pub use types::{UpdateExpression, UpdateOp, UpdateTerm};
