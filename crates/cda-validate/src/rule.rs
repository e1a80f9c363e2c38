use std::fmt;
use std::sync::Arc;

use cda_model::{IssueSeverity, Node, ValidationIssue};

pub type RuleCheck = Arc<dyn Fn(&Node) -> Option<ValidationIssue> + Send + Sync>;

/// A single named check against one node.
#[derive(Clone)]
pub struct Rule {
    code: String,
    /// Skip when an earlier layer already reported an error.
    depends_on_prior: bool,
    severity: Option<IssueSeverity>,
    check: RuleCheck,
}

impl Rule {
    /// A structural rule that assumes the invariants of earlier layers.
    pub fn new<F>(code: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Node) -> Option<ValidationIssue> + Send + Sync + 'static,
    {
        Self {
            code: code.into(),
            depends_on_prior: true,
            severity: None,
            check: Arc::new(check),
        }
    }

    /// Run even when earlier layers failed.
    pub fn independent(mut self) -> Self {
        self.depends_on_prior = false;
        self
    }

    /// Report findings as warnings.
    pub fn as_warning(mut self) -> Self {
        self.severity = Some(IssueSeverity::Warning);
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn depends_on_prior(&self) -> bool {
        self.depends_on_prior
    }

    pub fn check(&self, node: &Node) -> Option<ValidationIssue> {
        let mut issue = (self.check)(node)?;
        if let Some(severity) = self.severity {
            issue.severity = severity;
        }
        if issue.node.is_none() {
            issue.node = Some(node.to_string());
        }
        Some(issue)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("code", &self.code)
            .field("depends_on_prior", &self.depends_on_prior)
            .field("severity", &self.severity)
            .finish_non_exhaustive()
    }
}
