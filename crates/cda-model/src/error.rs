use thiserror::Error;

use crate::issue::{ParseIssue, ValidationIssues};

/// Fatal problems reading a document before the tree walk starts.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed XML at byte {position}: {message}")]
    Malformed { message: String, position: u64 },
    #[error("expected a ClinicalDocument root element, found `{found}`")]
    UnexpectedRoot { found: String },
    #[error("document is empty")]
    Empty,
    #[error("document rejected with {} parse error(s)", issues.len())]
    Rejected { issues: Vec<ParseIssue> },
}

#[derive(Debug, Clone, Error)]
pub enum ImportError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("validation failed for {node}: {issues}")]
    ValidationFailed {
        node: String,
        issues: ValidationIssues,
    },
    #[error("template set {templates} is declared by both `{first}` and `{second}`")]
    DispatchAmbiguous {
        templates: String,
        first: String,
        second: String,
    },
    #[error("duplicate entry: accession `{accession}` already exists for patient {patient}")]
    DuplicateEntry { accession: String, patient: String },
    #[error("vocabulary not understood: {code_system}:{code}")]
    VocabularyUnresolved { code: String, code_system: String },
    #[error("persistence conflict: {0}")]
    PersistenceConflict(String),
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl ImportError {
    /// Only store conflicts are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ImportError::PersistenceConflict(_))
    }

    pub fn issues(&self) -> Option<&ValidationIssues> {
        match self {
            ImportError::ValidationFailed { issues, .. } => Some(issues),
            _ => None,
        }
    }
}

pub type ImportResult<T> = std::result::Result<T, ImportError>;
