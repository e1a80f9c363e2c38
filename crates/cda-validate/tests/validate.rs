use cda_model::{CodedValue, Node, NodeKind, Status, TypedValue, TypedValueKind};
use cda_validate::{RuleChain, RuleLayer, rules};

const LOINC: &str = "2.16.840.1.113883.6.1";

fn entry_chain() -> RuleChain {
    RuleChain::new().layer(
        RuleLayer::new("entry")
            .rule(rules::is_kind(NodeKind::Observation))
            .rule(rules::has_template()),
    )
}

fn vital_sign_chain() -> RuleChain {
    RuleChain::extending(&entry_chain())
        .layer(
            RuleLayer::new("coded-entry")
                .rule(rules::has_code())
                .rule(rules::has_id()),
        )
        .layer(
            RuleLayer::new("vital-sign")
                .rule(rules::code_system_in(&[LOINC]))
                .rule(rules::value_shape(&[TypedValueKind::Numeric]))
                .rule(rules::status_in(&[Status::Completed]).independent()),
        )
}

#[test]
fn conforming_vital_sign_passes() {
    let node = Node::new(NodeKind::Observation)
        .with_template("1.3.6.1.4.1.19376.1.5.3.1.4.13")
        .with_id(cda_model::ExternalId::new("1.2.3").with_extension("obs-1"))
        .with_code(CodedValue::new("8480-6", LOINC))
        .with_status(Status::Completed)
        .with_value(TypedValue::quantity(120.0, "mm[Hg]"));
    let issues = vital_sign_chain().validate(&node);
    assert!(issues.is_empty(), "unexpected issues: {issues}");
}

#[test]
fn general_failure_suppresses_cascading_errors() {
    // Wrong kind and no template: dependent code/id/system checks are skipped,
    // the independent status check still runs.
    let node = Node::new(NodeKind::Act);
    let issues = vital_sign_chain().validate(&node);
    let codes: Vec<&str> = issues.iter().map(|issue| issue.code.as_str()).collect();
    assert_eq!(codes, vec!["node-kind", "has-template", "status-code"]);
}

#[test]
fn specific_layer_reports_after_general_layers_pass() {
    let node = Node::new(NodeKind::Observation)
        .with_template("1.3.6.1.4.1.19376.1.5.3.1.4.13")
        .with_id(cda_model::ExternalId::new("1.2.3"))
        .with_code(CodedValue::new("8480-6", "2.16.840.1.113883.6.96"))
        .with_status(Status::Completed)
        .with_value(TypedValue::Text("high".to_string()));
    let issues = vital_sign_chain().validate(&node);
    insta::assert_snapshot!(
        issues.to_string(),
        @"[error] code-system: code system 2.16.840.1.113883.6.96 is not permitted here (Observation [1.3.6.1.4.1.19376.1.5.3.1.4.13] id=1.2.3); [error] value-shape: text value is not permitted here (Observation [1.3.6.1.4.1.19376.1.5.3.1.4.13] id=1.2.3)"
    );
}

#[test]
fn warning_rules_never_block() {
    let chain = RuleChain::new().layer(
        RuleLayer::new("section")
            .rule(rules::has_title().as_warning())
            .rule(rules::has_narrative().as_warning()),
    );
    let issues = chain.validate(&Node::new(NodeKind::Section));
    assert_eq!(issues.warning_count(), 2);
    assert!(!issues.has_errors());
}

#[test]
fn min_children_counts_matching_kind_only() {
    let organizer = Node::new(NodeKind::Organizer)
        .with_child(Node::new(NodeKind::Observation))
        .with_child(Node::new(NodeKind::ExternalReference));
    let rule = rules::min_children(NodeKind::Observation, 1);
    assert!(rule.check(&organizer).is_none());
    let rule = rules::min_children(NodeKind::Observation, 2);
    assert!(rule.check(&organizer).is_some());
}
