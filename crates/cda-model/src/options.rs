//! Configuration options for document import.

use serde::{Deserialize, Serialize};

/// Accession-number template used when none is configured.
pub const DEFAULT_IDENTIFIER_FORMAT: &str = "{root}^{extension}";

/// Options controlling how documents are validated and turned into records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportPolicy {
    /// Run each processor's rule chain before processing a node.
    pub validation_enabled: bool,

    /// Reject coded values that are not already members of their
    /// container's vocabulary instead of adding them.
    pub strict_vocabulary: bool,

    /// Synthesize concepts for unknown `(code, code system)` pairs.
    pub auto_create_concepts: bool,

    /// Treat an id collision without a replace reference as an implicit
    /// replace.
    pub update_existing: bool,

    /// Template with `{root}` and `{extension}` placeholders used to render
    /// external ids into accession numbers.
    pub identifier_format: String,
}

impl Default for ImportPolicy {
    fn default() -> Self {
        Self {
            validation_enabled: true,
            strict_vocabulary: false,
            auto_create_concepts: true,
            update_existing: false,
            identifier_format: DEFAULT_IDENTIFIER_FORMAT.to_string(),
        }
    }
}

impl ImportPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closed-vocabulary import: nothing is created or added on the fly.
    pub fn strict() -> Self {
        Self {
            strict_vocabulary: true,
            auto_create_concepts: false,
            ..Self::default()
        }
    }

    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validation_enabled = enabled;
        self
    }

    pub fn with_update_existing(mut self, enabled: bool) -> Self {
        self.update_existing = enabled;
        self
    }

    pub fn with_auto_create(mut self, enabled: bool) -> Self {
        self.auto_create_concepts = enabled;
        self
    }

    pub fn with_identifier_format(mut self, format: impl Into<String>) -> Self {
        self.identifier_format = format.into();
        self
    }
}
