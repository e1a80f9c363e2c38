//! Template identifiers and template-id sets.
//!
//! A template identifier is an opaque OID-like key asserting which structural
//! contract a node claims to satisfy. Nodes carry an unordered, duplicate-free
//! set of them; dispatch compares those sets exactly.

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single template identifier (e.g. `1.3.6.1.4.1.19376.1.5.3.1.4.13`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let trimmed = root.trim();
        if trimmed.len() == root.len() {
            Self(root)
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TemplateId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TemplateId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TemplateId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Unordered, duplicate-free set of template identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateIdSet(BTreeSet<TemplateId>);

impl TemplateIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TemplateId>,
    {
        Self(ids.into_iter().map(Into::into).collect())
    }

    /// Inserts an identifier. Returns false when it was already present.
    pub fn insert(&mut self, id: impl Into<TemplateId>) -> bool {
        self.0.insert(id.into())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TemplateId> {
        self.0.iter()
    }

    /// Exact match against a declared set: equal size and every declared id
    /// present. A strict superset or subset never matches.
    pub fn matches_exactly(&self, declared: &TemplateIdSet) -> bool {
        self.len() == declared.len() && declared.iter().all(|id| self.0.contains(id))
    }

    /// True when every identifier of `other` is declared here as well.
    pub fn satisfies(&self, other: &TemplateIdSet) -> bool {
        other.0.is_subset(&self.0)
    }
}

impl fmt::Display for TemplateIdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (idx, id) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            f.write_str(id.as_str())?;
        }
        f.write_str("]")
    }
}

impl<T: Into<TemplateId>> FromIterator<T> for TemplateIdSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_ids(iter)
    }
}

impl<'a> IntoIterator for &'a TemplateIdSet {
    type Item = &'a TemplateId;
    type IntoIter = std::collections::btree_set::Iter<'a, TemplateId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_requires_equal_sets() {
        let declared = TemplateIdSet::from_ids(["1.2", "1.2.3"]);
        assert!(TemplateIdSet::from_ids(["1.2.3", "1.2"]).matches_exactly(&declared));
        assert!(!TemplateIdSet::from_ids(["1.2"]).matches_exactly(&declared));
        assert!(!TemplateIdSet::from_ids(["1.2", "1.2.3", "1.2.3.4"]).matches_exactly(&declared));
    }

    #[test]
    fn duplicates_collapse() {
        let set = TemplateIdSet::from_ids(["1.2", " 1.2 ", "1.2"]);
        assert_eq!(set.len(), 1);
        assert!(set.contains("1.2"));
    }

    #[test]
    fn display_is_sorted() {
        let set = TemplateIdSet::from_ids(["2.1", "1.9"]);
        assert_eq!(set.to_string(), "[1.9, 2.1]");
    }
}
