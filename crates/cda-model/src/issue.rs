//! Validation and parse issues.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Warning,
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueSeverity::Error => f.write_str("error"),
            IssueSeverity::Warning => f.write_str("warning"),
        }
    }
}

/// An issue found while validating a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    /// Stable rule code (e.g. `has-code`).
    pub code: String,
    pub message: String,
    /// Short description of the node the issue was raised for.
    pub node: Option<String>,
}

impl ValidationIssue {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Error,
            code: code.into(),
            message: message.into(),
            node: None,
        }
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            code: code.into(),
            message: message.into(),
            node: None,
        }
    }

    pub fn at(mut self, node: impl fmt::Display) -> Self {
        self.node = Some(node.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == IssueSeverity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)?;
        if let Some(node) = &self.node {
            write!(f, " ({node})")?;
        }
        Ok(())
    }
}

/// Ordered issue collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationIssues(Vec<ValidationIssue>);

impl ValidationIssues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.0.push(issue);
    }

    pub fn extend(&mut self, other: ValidationIssues) {
        self.0.extend(other.0);
    }

    pub fn error_count(&self) -> usize {
        self.0.iter().filter(|issue| issue.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.0
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(ValidationIssue::is_error)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drop everything recorded after `len`; used when a subtree is skipped.
    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationIssue> {
        self.0.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.0.iter().filter(|issue| issue.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.0.iter().filter(|issue| !issue.is_error())
    }

    pub fn into_vec(self) -> Vec<ValidationIssue> {
        self.0
    }
}

impl From<Vec<ValidationIssue>> for ValidationIssues {
    fn from(issues: Vec<ValidationIssue>) -> Self {
        Self(issues)
    }
}

impl FromIterator<ValidationIssue> for ValidationIssues {
    fn from_iter<T: IntoIterator<Item = ValidationIssue>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ValidationIssues {
    type Item = ValidationIssue;
    type IntoIter = std::vec::IntoIter<ValidationIssue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationIssues {
    type Item = &'a ValidationIssue;
    type IntoIter = std::slice::Iter<'a, ValidationIssue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ValidationIssues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, issue) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

/// Issue reported by the document parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseIssue {
    pub severity: IssueSeverity,
    pub message: String,
    /// Element path, e.g. `ClinicalDocument/component/structuredBody`.
    pub path: Option<String>,
}

impl ParseIssue {
    pub fn warning(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            message: message.into(),
            path: Some(path.into()),
        }
    }

    pub fn error(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Error,
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

impl From<ParseIssue> for ValidationIssue {
    fn from(issue: ParseIssue) -> Self {
        ValidationIssue {
            severity: issue.severity,
            code: "parse".to_string(),
            message: issue.message,
            node: issue.path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_severity() {
        let issues: ValidationIssues = vec![
            ValidationIssue::error("has-code", "missing code"),
            ValidationIssue::warning("has-title", "missing title"),
            ValidationIssue::warning("has-text", "missing narrative"),
        ]
        .into();
        assert_eq!(issues.error_count(), 1);
        assert_eq!(issues.warning_count(), 2);
        assert!(issues.has_errors());
    }

    #[test]
    fn truncate_discards_trailing_issues() {
        let mut issues = ValidationIssues::new();
        issues.push(ValidationIssue::warning("a", "first"));
        let mark = issues.len();
        issues.push(ValidationIssue::error("b", "second"));
        issues.truncate(mark);
        assert!(!issues.has_errors());
        assert_eq!(issues.len(), 1);
    }
}
