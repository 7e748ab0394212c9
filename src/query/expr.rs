use bson::Bson;
use std::cmp::Ordering;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use super::compare::{compare_bson, values_equal};
use super::ops::{Operator, invert_chain};

/// A single `path / operator chain / operand` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub path: String,
    /// Outermost operator first; empty for plain equality.
    pub chain: Vec<Operator>,
    pub operand: Bson,
}

impl Leaf {
    #[must_use]
    pub fn new(path: impl Into<String>, chain: Vec<Operator>, operand: Bson) -> Self {
        Self { path: path.into(), chain, operand }
    }

    #[must_use]
    pub fn invert(&self) -> Self {
        let (chain, operand) = invert_chain(&self.chain, &self.operand);
        Self { path: self.path.clone(), chain, operand }
    }

    fn same_target(&self, other: &Self) -> bool {
        self.path == other.path && self.chain == other.chain
    }
}

/// Query expression tree.
///
/// `And` children are never `And` themselves and `Or` children are never `Or`;
/// the combinators below keep both flat.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Leaf(Leaf),
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Not(Box<Expression>),
}

impl Expression {
    #[must_use]
    pub fn leaf(path: impl Into<String>, chain: Vec<Operator>, operand: impl Into<Bson>) -> Self {
        Self::Leaf(Leaf::new(path, chain, operand.into()))
    }

    /// Conjunction. Leaves with the same path and chain merge their operands
    /// where the operator allows it.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        let mut terms = self.into_conjuncts();
        for t in other.into_conjuncts() {
            push_conjunct(&mut terms, t);
        }
        if terms.len() == 1 {
            terms.remove(0)
        } else {
            Self::And(terms)
        }
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        let mut terms = self.into_disjuncts();
        terms.extend(other.into_disjuncts());
        Self::Or(terms)
    }

    /// Logical negation pushed down to the leaves.
    #[must_use]
    pub fn invert(&self) -> Self {
        match self {
            Self::Leaf(l) => Self::Leaf(l.invert()),
            Self::And(terms) => {
                let mut out = Vec::with_capacity(terms.len());
                for t in terms {
                    out.extend(t.invert().into_disjuncts());
                }
                Self::Or(out)
            }
            Self::Or(terms) => {
                let mut iter = terms.iter().map(Self::invert);
                match iter.next() {
                    Some(first) => iter.fold(first, Self::and),
                    None => Self::And(Vec::new()),
                }
            }
            Self::Not(inner) => (**inner).clone(),
        }
    }

    /// Number of leaves reachable in the tree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::And(t) | Self::Or(t) => t.iter().map(Self::leaf_count).sum(),
            Self::Not(inner) => inner.leaf_count(),
        }
    }

    fn into_conjuncts(self) -> Vec<Self> {
        match self {
            Self::And(terms) => terms,
            other => vec![other],
        }
    }

    fn into_disjuncts(self) -> Vec<Self> {
        match self {
            Self::Or(terms) => terms,
            other => vec![other],
        }
    }
}

fn push_conjunct(terms: &mut Vec<Expression>, term: Expression) {
    if let Expression::Leaf(incoming) = &term {
        for existing in terms.iter_mut() {
            if let Expression::Leaf(e) = existing
                && e.same_target(incoming)
                && let Some(merged) = merge_operand(&e.chain, &e.operand, &incoming.operand)
            {
                e.operand = merged;
                return;
            }
        }
    }
    terms.push(term);
}

/// Per-operator rule for `a AND b` on the same path and chain.
fn merge_operand(chain: &[Operator], a: &Bson, b: &Bson) -> Option<Bson> {
    match chain {
        [Operator::Gt | Operator::Gte] => match compare_bson(a, b)? {
            Ordering::Less => Some(b.clone()),
            _ => Some(a.clone()),
        },
        [Operator::Lt | Operator::Lte] => match compare_bson(a, b)? {
            Ordering::Greater => Some(b.clone()),
            _ => Some(a.clone()),
        },
        [Operator::In] => {
            let (Bson::Array(x), Bson::Array(y)) = (a, b) else { return None };
            let kept = x.iter().filter(|v| y.iter().any(|w| values_equal(v, w))).cloned();
            Some(Bson::Array(kept.collect()))
        }
        [Operator::Nin | Operator::All] => {
            let (Bson::Array(x), Bson::Array(y)) = (a, b) else { return None };
            let mut out = x.clone();
            for v in y {
                if !out.iter().any(|w| values_equal(v, w)) {
                    out.push(v.clone());
                }
            }
            Some(Bson::Array(out))
        }
        _ => values_equal(a, b).then(|| a.clone()),
    }
}

impl From<Leaf> for Expression {
    fn from(l: Leaf) -> Self {
        Self::Leaf(l)
    }
}

impl BitAnd for Expression {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        self.and(rhs)
    }
}

impl BitOr for Expression {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.or(rhs)
    }
}

impl Not for Expression {
    type Output = Self;
    fn not(self) -> Self {
        self.invert()
    }
}

impl BitAndAssign for Expression {
    fn bitand_assign(&mut self, rhs: Self) {
        let lhs = std::mem::replace(self, Self::And(Vec::new()));
        *self = lhs.and(rhs);
    }
}

impl BitOrAssign for Expression {
    fn bitor_assign(&mut self, rhs: Self) {
        let lhs = std::mem::replace(self, Self::Or(Vec::new()));
        *self = lhs.or(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gt(path: &str, v: i32) -> Expression {
        Expression::leaf(path, vec![Operator::Gt], v)
    }

    #[test]
    fn and_tightens_lower_bounds() {
        let e = gt("age", 5) & gt("age", 9) & gt("age", 7);
        assert_eq!(e, gt("age", 9));
    }

    #[test]
    fn and_keeps_distinct_equalities() {
        let e = Expression::leaf("a", vec![], 1) & Expression::leaf("a", vec![], 2);
        assert!(matches!(e, Expression::And(ref t) if t.len() == 2));
    }

    #[test]
    fn in_sets_intersect() {
        let a = Expression::leaf("x", vec![Operator::In], vec![1, 2, 3]);
        let b = Expression::leaf("x", vec![Operator::In], vec![3, 2, 9]);
        assert_eq!(a & b, Expression::leaf("x", vec![Operator::In], vec![2, 3]));
    }

    #[test]
    fn or_flattens() {
        let e = gt("a", 1) | gt("b", 2) | gt("c", 3);
        assert!(matches!(e, Expression::Or(ref t) if t.len() == 3));
    }

    #[test]
    fn de_morgan_over_and() {
        let e = !(gt("a", 1) & Expression::leaf("b", vec![], "x"));
        assert_eq!(
            e,
            Expression::Or(vec![
                Expression::leaf("a", vec![Operator::Lte], 1),
                Expression::leaf("b", vec![Operator::Ne], "x"),
            ])
        );
    }

    #[test]
    fn not_node_inverts_to_child() {
        let inner = gt("a", 1);
        assert_eq!(Expression::Not(Box::new(inner.clone())).invert(), inner);
    }
}
