//! Internal concept references produced by vocabulary resolution.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{CodedValue, TypedValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(pub u64);

impl fmt::Display for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "concept:{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConceptDatatype {
    Numeric,
    Coded,
    Text,
    Datetime,
    Complex,
    /// Grouping concepts (sections, organizers) that never carry a value.
    NotApplicable,
}

impl ConceptDatatype {
    /// Datatype a newly created concept gets for a value shape. Ratios are
    /// stored as rendered text.
    pub fn for_value_kind(kind: TypedValueKind) -> Self {
        match kind {
            TypedValueKind::Numeric => ConceptDatatype::Numeric,
            TypedValueKind::Coded => ConceptDatatype::Coded,
            TypedValueKind::Text | TypedValueKind::Ratio => ConceptDatatype::Text,
            TypedValueKind::Timestamp => ConceptDatatype::Datetime,
            TypedValueKind::Complex => ConceptDatatype::Complex,
            TypedValueKind::None => ConceptDatatype::NotApplicable,
        }
    }
}

/// Deterministic `(code, code system)` key a concept is registered under.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConceptMapping {
    pub code: String,
    pub code_system: String,
}

impl ConceptMapping {
    pub fn new(code: impl Into<String>, code_system: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            code_system: code_system.into(),
        }
    }
}

impl From<&CodedValue> for ConceptMapping {
    fn from(value: &CodedValue) -> Self {
        Self::new(value.code.trim(), value.code_system.trim())
    }
}

impl fmt::Display for ConceptMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.code_system, self.code)
    }
}

/// A resolved internal concept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConceptRef {
    pub id: ConceptId,
    pub datatype: ConceptDatatype,
    pub name: String,
}

/// Everything a concept store needs to create a concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptSpec {
    pub mapping: ConceptMapping,
    pub name: String,
    pub datatype: ConceptDatatype,
}
