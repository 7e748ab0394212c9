use bson::{Bson, Document};
use std::collections::BTreeMap;

/// Structured difference between two values of one field kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    /// Scalar change, values in projected form.
    Changed { old: Bson, new: Bson },
    /// List change: members gained and lost, plus in-place element edits by index.
    Sequence { added: Vec<Bson>, removed: Vec<Bson>, elements: BTreeMap<usize, Delta> },
    /// Per-field (or per-key) deltas of a document; empty entries are never stored.
    Nested(BTreeMap<String, Delta>),
    Deleted,
    Unknown,
}

impl Default for Delta {
    fn default() -> Self {
        Self::Nested(BTreeMap::new())
    }
}

impl Delta {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Changed { .. } | Self::Deleted | Self::Unknown => false,
            Self::Sequence { added, removed, elements } => {
                added.is_empty() && removed.is_empty() && elements.is_empty()
            }
            Self::Nested(entries) => entries.is_empty(),
        }
    }

    /// Entry for `key` in a nested delta.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Nested(entries) => entries.get(key),
            Self::Sequence { elements, .. } => key.parse().ok().and_then(|i| elements.get(&i)),
            _ => None,
        }
    }

    #[must_use]
    pub fn entries(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Nested(entries) => Some(entries),
            _ => None,
        }
    }

    /// Wire form: `{"old","new"}`, `{"added","removed","<index>":...}`, nested
    /// mappings, or the markers `"deleted"` / `"unknown"`.
    #[must_use]
    pub fn to_bson(&self) -> Bson {
        match self {
            Self::Changed { old, new } => {
                let mut d = Document::new();
                d.insert("old", old.clone());
                d.insert("new", new.clone());
                Bson::Document(d)
            }
            Self::Sequence { added, removed, elements } => {
                let mut d = Document::new();
                if !added.is_empty() || !removed.is_empty() {
                    d.insert("added", Bson::Array(added.clone()));
                    d.insert("removed", Bson::Array(removed.clone()));
                }
                for (i, e) in elements {
                    d.insert(i.to_string(), e.to_bson());
                }
                Bson::Document(d)
            }
            Self::Nested(entries) => Bson::Document(
                entries.iter().map(|(k, v)| (k.clone(), v.to_bson())).collect(),
            ),
            Self::Deleted => Bson::String("deleted".into()),
            Self::Unknown => Bson::String("unknown".into()),
        }
    }

    /// [`Delta::to_bson`] as a document; the bare markers yield an empty one.
    #[must_use]
    pub fn to_document(&self) -> Document {
        match self.to_bson() {
            Bson::Document(d) => d,
            _ => Document::new(),
        }
    }
}
