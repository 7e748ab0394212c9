use bson::Bson;

use super::compare::is_numeric;
use super::expr::Expression;
use super::ops::Operator;
use crate::errors::OdmError;

/// BSON type codes accepted by `$type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BsonType {
    Double = 1,
    String = 2,
    Object = 3,
    Array = 4,
    Binary = 5,
    ObjectId = 7,
    Boolean = 8,
    Date = 9,
    Null = 10,
    Regex = 11,
    JavaScript = 13,
    Int32 = 16,
    Timestamp = 17,
    Int64 = 18,
}

/// Handle on a (possibly dotted) field path. Builds query leaves and update terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    path: String,
}

pub(crate) fn int_bson(n: i64) -> Bson {
    i32::try_from(n).map_or(Bson::Int64(n), Bson::Int32)
}

impl Field {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Sub-field or mapping key, e.g. `prefs` -> `prefs.theme`.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        Self { path: format!("{}.{name}", self.path) }
    }

    #[must_use]
    pub fn at(&self, index: usize) -> Self {
        Self { path: format!("{}.{index}", self.path) }
    }

    fn leaf(&self, chain: Vec<Operator>, operand: Bson) -> Expression {
        Expression::leaf(self.path.clone(), chain, operand)
    }

    #[must_use]
    pub fn eq(&self, v: impl Into<Bson>) -> Expression {
        self.leaf(Vec::new(), v.into())
    }

    #[must_use]
    pub fn ne(&self, v: impl Into<Bson>) -> Expression {
        self.leaf(vec![Operator::Ne], v.into())
    }

    #[must_use]
    pub fn lt(&self, v: impl Into<Bson>) -> Expression {
        self.leaf(vec![Operator::Lt], v.into())
    }

    #[must_use]
    pub fn lte(&self, v: impl Into<Bson>) -> Expression {
        self.leaf(vec![Operator::Lte], v.into())
    }

    #[must_use]
    pub fn gt(&self, v: impl Into<Bson>) -> Expression {
        self.leaf(vec![Operator::Gt], v.into())
    }

    #[must_use]
    pub fn gte(&self, v: impl Into<Bson>) -> Expression {
        self.leaf(vec![Operator::Gte], v.into())
    }

    #[must_use]
    pub fn in_<I, V>(&self, values: I) -> Expression
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.leaf(vec![Operator::In], collect(values))
    }

    #[must_use]
    pub fn nin<I, V>(&self, values: I) -> Expression
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.leaf(vec![Operator::Nin], collect(values))
    }

    #[must_use]
    pub fn all<I, V>(&self, values: I) -> Expression
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.leaf(vec![Operator::All], collect(values))
    }

    #[must_use]
    pub fn size(&self, n: u32) -> Expression {
        self.leaf(vec![Operator::Size], int_bson(i64::from(n)))
    }

    #[must_use]
    pub fn exists(&self, flag: bool) -> Expression {
        self.leaf(vec![Operator::Exists], Bson::Boolean(flag))
    }

    #[must_use]
    pub fn type_(&self, t: BsonType) -> Expression {
        self.leaf(vec![Operator::Type], Bson::Int32(t as i32))
    }

    #[must_use]
    pub fn where_(&self, js: impl Into<String>) -> Expression {
        self.leaf(vec![Operator::Where], Bson::String(js.into()))
    }

    /// `field % divisor == remainder`.
    ///
    /// # Errors
    /// `InvalidOperand` if either value is not numeric or the divisor is zero.
    pub fn modulo(
        &self,
        divisor: impl Into<Bson>,
        remainder: impl Into<Bson>,
    ) -> Result<Expression, OdmError> {
        let operand = Bson::Array(vec![divisor.into(), remainder.into()]);
        check_mod_operand(&operand)?;
        Ok(self.leaf(vec![Operator::Mod], operand))
    }

    /// Projection of the first `n` (or last, if negative) elements.
    #[must_use]
    pub fn slice(&self, n: i64) -> Expression {
        self.leaf(vec![Operator::Slice], int_bson(n))
    }

    #[must_use]
    pub fn slice_range(&self, skip: i64, limit: i64) -> Expression {
        self.leaf(vec![Operator::Slice], Bson::Array(vec![int_bson(skip), int_bson(limit)]))
    }

    /// # Errors
    /// `InvalidOperand` if the pattern does not compile.
    #[cfg(feature = "regex")]
    pub fn regex(&self, pattern: &str) -> Result<Expression, OdmError> {
        regex::Regex::new(pattern).map_err(|e| OdmError::operand("regex", e.to_string()))?;
        Ok(self.leaf(vec![Operator::Regex], Bson::String(pattern.to_string())))
    }
}

fn collect<I, V>(values: I) -> Bson
where
    I: IntoIterator<Item = V>,
    V: Into<Bson>,
{
    Bson::Array(values.into_iter().map(Into::into).collect())
}

pub(crate) fn check_mod_operand(operand: &Bson) -> Result<(), OdmError> {
    let Bson::Array(parts) = operand else {
        return Err(OdmError::operand("mod", "expected [divisor, remainder]"));
    };
    let [divisor, remainder] = parts.as_slice() else {
        return Err(OdmError::operand("mod", "expected [divisor, remainder]"));
    };
    if !is_numeric(divisor) || !is_numeric(remainder) {
        return Err(OdmError::operand("mod", "divisor and remainder must be numeric"));
    }
    if super::compare::as_f64(divisor) == Some(0.0) {
        return Err(OdmError::operand("mod", "divisor must be non-zero"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::compile;
    use bson::doc;

    #[test]
    fn modulo_rejects_non_numeric() {
        let age = Field::new("age");
        assert!(matches!(age.modulo("ten", 0), Err(OdmError::InvalidOperand { .. })));
        assert!(matches!(age.modulo(0, 0), Err(OdmError::InvalidOperand { .. })));
        assert_eq!(compile(&age.modulo(10, 0).unwrap()), doc! {"age": {"$mod": [10, 0]}});
    }

    #[test]
    fn child_and_index_extend_path() {
        let f = Field::new("history").at(0).child("tags");
        assert_eq!(f.path(), "history.0.tags");
    }

    #[test]
    fn slice_forms() {
        let f = Field::new("followers");
        assert_eq!(compile(&f.slice(5)), doc! {"followers": {"$slice": 5}});
        assert_eq!(compile(&f.slice_range(5, -1)), doc! {"followers": {"$slice": [5, -1]}});
    }

    #[cfg(feature = "regex")]
    #[test]
    fn regex_pattern_is_validated() {
        let f = Field::new("name");
        assert!(matches!(f.regex("(unclosed"), Err(OdmError::InvalidOperand { .. })));
        assert_eq!(compile(&f.regex("^st").unwrap()), doc! {"name": {"$regex": "^st"}});
    }
}
