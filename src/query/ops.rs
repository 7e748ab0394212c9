use bson::Bson;

/// Query operator tags. Plain equality is the empty chain and has no tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Nin,
    Exists,
    Mod,
    All,
    Size,
    Type,
    Where,
    Slice,
    Not,
    #[cfg(feature = "regex")]
    Regex,
}

impl Operator {
    /// Wire key without the leading `$`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::In => "in",
            Self::Nin => "nin",
            Self::Exists => "exists",
            Self::Mod => "mod",
            Self::All => "all",
            Self::Size => "size",
            Self::Type => "type",
            Self::Where => "where",
            Self::Slice => "slice",
            Self::Not => "not",
            #[cfg(feature = "regex")]
            Self::Regex => "regex",
        }
    }

    #[must_use]
    pub fn wire_key(self) -> String {
        format!("${}", self.name())
    }

    /// Parse a wire key such as `$gte`.
    #[must_use]
    pub fn from_wire(key: &str) -> Option<Self> {
        Some(match key.strip_prefix('$')? {
            "ne" => Self::Ne,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "in" => Self::In,
            "nin" => Self::Nin,
            "exists" => Self::Exists,
            "mod" => Self::Mod,
            "all" => Self::All,
            "size" => Self::Size,
            "type" => Self::Type,
            "where" => Self::Where,
            "slice" => Self::Slice,
            "not" => Self::Not,
            #[cfg(feature = "regex")]
            "regex" => Self::Regex,
            _ => return None,
        })
    }

    /// Direct logical complement, if the operator has one.
    #[must_use]
    pub const fn complement(self) -> Option<Self> {
        match self {
            Self::Lt => Some(Self::Gte),
            Self::Gte => Some(Self::Lt),
            Self::Gt => Some(Self::Lte),
            Self::Lte => Some(Self::Gt),
            Self::In => Some(Self::Nin),
            Self::Nin => Some(Self::In),
            _ => None,
        }
    }
}

/// Invert an operator chain and its operand.
///
/// Always yields a minimal chain: a leading `not` is stripped rather than doubled.
///
/// Inverting twice returns the original for every chain the `Field` builders
/// produce. A parsed `not` over a complemented operator, such as `[Not, Lt]`,
/// inverts to `[Lt]` and then to `[Gte]`.
#[must_use]
pub fn invert_chain(chain: &[Operator], operand: &Bson) -> (Vec<Operator>, Bson) {
    match chain {
        [] => (vec![Operator::Ne], operand.clone()),
        [Operator::Ne] => (Vec::new(), operand.clone()),
        [Operator::Not, rest @ ..] => (rest.to_vec(), operand.clone()),
        [Operator::Exists] if matches!(operand, Bson::Boolean(_)) => {
            let flipped = !matches!(operand, Bson::Boolean(true));
            (vec![Operator::Exists], Bson::Boolean(flipped))
        }
        [op] if op.complement().is_some() => {
            (op.complement().into_iter().collect(), operand.clone())
        }
        _ => {
            let mut out = Vec::with_capacity(chain.len() + 1);
            out.push(Operator::Not);
            out.extend_from_slice(chain);
            (out, operand.clone())
        }
    }
}
