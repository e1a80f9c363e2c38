//! Generic structural rules shared by processors.

use std::collections::BTreeSet;

use cda_model::{NodeKind, Status, TypedValueKind, ValidationIssue};

use crate::rule::Rule;

pub fn is_kind(kind: NodeKind) -> Rule {
    Rule::new("node-kind", move |node| {
        (node.kind != kind).then(|| {
            ValidationIssue::error("node-kind", format!("expected {kind}, found {}", node.kind))
        })
    })
    .independent()
}

pub fn has_template() -> Rule {
    Rule::new("has-template", |node| {
        node.template_ids
            .is_empty()
            .then(|| ValidationIssue::error("has-template", "no template id declared"))
    })
    .independent()
}

pub fn has_code() -> Rule {
    Rule::new("has-code", |node| {
        let missing = node
            .code
            .as_ref()
            .is_none_or(|code| code.code.trim().is_empty() || code.code_system.trim().is_empty());
        missing.then(|| ValidationIssue::error("has-code", "no code with a code system"))
    })
}

/// Code must come from one of the listed code system OIDs.
pub fn code_system_in(systems: &[&str]) -> Rule {
    let allowed: BTreeSet<String> = systems.iter().map(|system| (*system).to_string()).collect();
    Rule::new("code-system", move |node| {
        let code = node.code.as_ref()?;
        (!allowed.contains(code.code_system.trim())).then(|| {
            ValidationIssue::error(
                "code-system",
                format!("code system {} is not permitted here", code.code_system),
            )
        })
    })
}

/// Code must be one of a fixed set.
pub fn code_in(codes: &[&str]) -> Rule {
    let allowed: BTreeSet<String> = codes.iter().map(|code| (*code).to_string()).collect();
    Rule::new("code-value", move |node| {
        let code = node.code.as_ref()?;
        (!allowed.contains(code.code.trim())).then(|| {
            ValidationIssue::error(
                "code-value",
                format!("code {} is not permitted here", code.code),
            )
        })
    })
}

pub fn has_id() -> Rule {
    Rule::new("has-id", |node| {
        node.id
            .as_ref()
            .is_none_or(|id| id.root.trim().is_empty())
            .then(|| ValidationIssue::error("has-id", "no instance identifier"))
    })
}

pub fn has_value() -> Rule {
    Rule::new("has-value", |node| {
        node.value
            .is_none()
            .then(|| ValidationIssue::error("has-value", "no value"))
    })
}

/// Value, when present, must have one of the listed shapes.
pub fn value_shape(kinds: &[TypedValueKind]) -> Rule {
    let allowed = kinds.to_vec();
    Rule::new("value-shape", move |node| {
        let kind = node.value.as_ref()?.kind();
        (!allowed.contains(&kind)).then(|| {
            ValidationIssue::error("value-shape", format!("{kind} value is not permitted here"))
        })
    })
}

pub fn has_effective_time() -> Rule {
    Rule::new("has-effective-time", |node| {
        node.effective_time
            .as_ref()
            .is_none_or(cda_model::TimeInterval::is_empty)
            .then(|| ValidationIssue::error("has-effective-time", "no effective time"))
    })
}

pub fn status_in(statuses: &[Status]) -> Rule {
    let allowed = statuses.to_vec();
    Rule::new("status-code", move |node| match &node.status {
        None => Some(ValidationIssue::error("status-code", "no status code")),
        Some(status) if !allowed.contains(status) => Some(ValidationIssue::error(
            "status-code",
            format!("status {} is not permitted here", status.code()),
        )),
        Some(_) => None,
    })
}

pub fn min_children(kind: NodeKind, minimum: usize) -> Rule {
    Rule::new("child-count", move |node| {
        let count = node.children_of_kind(kind).count();
        (count < minimum).then(|| {
            ValidationIssue::error(
                "child-count",
                format!("expected at least {minimum} {kind} children, found {count}"),
            )
        })
    })
}

pub fn has_title() -> Rule {
    Rule::new("has-title", |node| {
        node.title
            .as_deref()
            .is_none_or(|title| title.trim().is_empty())
            .then(|| ValidationIssue::error("has-title", "no title"))
    })
}

pub fn has_narrative() -> Rule {
    Rule::new("has-narrative", |node| {
        node.text
            .as_deref()
            .is_none_or(|text| text.trim().is_empty())
            .then(|| ValidationIssue::error("has-narrative", "no narrative text"))
    })
}
