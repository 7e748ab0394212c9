//! Dotted field paths such as `contacts.address.street` or `history.0.tags.1`.

use crate::config::{DEFAULT_MAX_PATH_DEPTH, Limits};
use crate::errors::OdmError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Name(String),
    Index(usize),
}

impl Segment {
    /// Canonical decimal text (`0`, `7`, `12`) is an index. Anything else,
    /// including `007`, stays a name so the text round-trips.
    fn parse(raw: &str) -> Self {
        if raw.bytes().all(|b| b.is_ascii_digit())
            && (raw.len() == 1 || !raw.starts_with('0'))
            && let Ok(i) = raw.parse::<usize>()
        {
            return Self::Index(i);
        }
        Self::Name(raw.to_string())
    }

    /// The segment as a mapping key. Index segments become their decimal text.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::Name(n) => n.clone(),
            Self::Index(i) => i.to_string(),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(n) => f.write_str(n),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Immutable parsed path. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// # Errors
    /// `MalformedPath` on empty text, an empty segment, or more than 32 segments.
    pub fn parse(text: &str) -> Result<Self, OdmError> {
        Self::parse_with_depth(text, DEFAULT_MAX_PATH_DEPTH)
    }

    /// # Errors
    /// As [`Path::parse`], with the depth bound taken from `limits`.
    pub fn parse_with(text: &str, limits: &Limits) -> Result<Self, OdmError> {
        Self::parse_with_depth(text, limits.max_path_depth)
    }

    fn parse_with_depth(text: &str, max_depth: usize) -> Result<Self, OdmError> {
        let malformed = |reason: &str| OdmError::MalformedPath {
            path: text.to_string(),
            reason: reason.to_string(),
        };
        if text.is_empty() {
            return Err(malformed("empty path"));
        }
        let mut segments = Vec::new();
        for raw in text.split('.') {
            if raw.is_empty() {
                return Err(malformed("empty segment"));
            }
            if segments.len() == max_depth {
                return Err(malformed("too many segments"));
            }
            segments.push(Segment::parse(raw));
        }
        Ok(Self { segments })
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Text of the first `n` segments, used for error context.
    #[must_use]
    pub fn prefix(&self, n: usize) -> String {
        self.segments.iter().take(n).map(Segment::key).collect::<Vec<_>>().join(".")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix(self.segments.len()))
    }
}

impl FromStr for Path {
    type Err = OdmError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_become_indices() {
        let p = Path::parse("history.0.tags.12").unwrap();
        assert_eq!(
            p.segments(),
            &[
                Segment::Name("history".into()),
                Segment::Index(0),
                Segment::Name("tags".into()),
                Segment::Index(12),
            ]
        );
        assert_eq!(p.to_string(), "history.0.tags.12");
    }

    #[test]
    fn signed_and_mixed_segments_stay_names() {
        let p = Path::parse("a.-1.+2.3x").unwrap();
        assert!(p.segments().iter().all(|s| matches!(s, Segment::Name(_))));
    }

    #[test]
    fn leading_zero_segments_stay_names() {
        let p = Path::parse("scores.007.0").unwrap();
        assert_eq!(
            p.segments(),
            &[Segment::Name("scores".into()), Segment::Name("007".into()), Segment::Index(0)]
        );
        assert_eq!(p.to_string(), "scores.007.0");
    }

    #[test]
    fn empty_segments_are_rejected() {
        for bad in ["", ".", "a..b", "a.", ".a"] {
            assert!(matches!(Path::parse(bad), Err(OdmError::MalformedPath { .. })), "{bad}");
        }
    }

    #[test]
    fn depth_is_bounded() {
        let limits = Limits { max_path_depth: 2, ..Limits::default() };
        assert!(Path::parse_with("a.b", &limits).is_ok());
        assert!(matches!(
            Path::parse_with("a.b.c", &limits),
            Err(OdmError::MalformedPath { .. })
        ));
    }
}
