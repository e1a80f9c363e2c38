//! Ordered rule layers, general before specific.

use cda_model::{Node, ValidationIssues};
use tracing::trace;

use crate::rule::Rule;

#[derive(Debug, Clone)]
pub struct RuleLayer {
    name: String,
    rules: Vec<Rule>,
}

impl RuleLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleChain {
    layers: Vec<RuleLayer>,
}

impl RuleChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a more general chain; its layers always run first.
    pub fn extending(parent: &RuleChain) -> Self {
        parent.clone()
    }

    pub fn layer(mut self, layer: RuleLayer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn layers(&self) -> &[RuleLayer] {
        &self.layers
    }

    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(|layer| layer.rules.is_empty())
    }

    /// Run every layer in order. Once a layer reports an error, later rules
    /// that depend on earlier invariants are skipped; independent rules
    /// still run.
    pub fn validate(&self, node: &Node) -> ValidationIssues {
        let mut issues = ValidationIssues::new();
        let mut prior_failed = false;
        for layer in &self.layers {
            for rule in &layer.rules {
                if prior_failed && rule.depends_on_prior() {
                    trace!(layer = %layer.name, rule = rule.code(), "skipped after earlier error");
                    continue;
                }
                if let Some(issue) = rule.check(node) {
                    issues.push(issue);
                }
            }
            if issues.has_errors() {
                prior_failed = true;
            }
        }
        issues
    }
}
