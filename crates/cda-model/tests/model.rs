use cda_model::{
    ConceptDatatype, ConceptId, ConceptRef, ExternalId, ExternalReference, Fragment, FragmentBody,
    FragmentKind, Node, NodeKind, Obs, TemplateIdSet, TypedValue, TypedValueKind, ValidationIssue,
    ValidationIssues,
};

fn concept(id: u64) -> ConceptRef {
    ConceptRef {
        id: ConceptId(id),
        datatype: ConceptDatatype::Numeric,
        name: "Systolic BP".to_string(),
    }
}

#[test]
fn exact_match_requires_set_equality() {
    let declared = TemplateIdSet::from_ids(["1.1", "1.2"]);
    assert!(TemplateIdSet::from_ids(["1.2", "1.1"]).matches_exactly(&declared));
    assert!(!TemplateIdSet::from_ids(["1.1"]).matches_exactly(&declared));
    assert!(!TemplateIdSet::from_ids(["1.1", "1.2", "1.3"]).matches_exactly(&declared));
}

#[test]
fn duplicate_template_ids_collapse() {
    let node = Node::new(NodeKind::Section)
        .with_template("2.16.840.1.113883.10.20.1.16")
        .with_template("2.16.840.1.113883.10.20.1.16 ");
    assert_eq!(node.template_ids.len(), 1);
}

#[test]
fn replacement_references_keep_document_order() {
    let node = Node::new(NodeKind::Observation)
        .with_reference(ExternalReference::replaces(ExternalId::new("1.2").with_extension("a")))
        .with_reference(ExternalReference::replaces(ExternalId::new("1.2").with_extension("b")));
    let first = node.replacement_references().next().expect("replace reference");
    assert_eq!(first.id.extension.as_deref(), Some("a"));
}

#[test]
fn value_kinds_map_to_concept_datatypes() {
    assert_eq!(
        ConceptDatatype::for_value_kind(TypedValue::quantity(120.0, "mm[Hg]").kind()),
        ConceptDatatype::Numeric
    );
    assert_eq!(
        ConceptDatatype::for_value_kind(TypedValueKind::Ratio),
        ConceptDatatype::Text
    );
    assert_eq!(
        ConceptDatatype::for_value_kind(TypedValueKind::None),
        ConceptDatatype::NotApplicable
    );
}

#[test]
fn voiding_marks_obs_with_reason() {
    let mut fragment = Fragment::new(FragmentBody::Obs(Obs::new(concept(1))));
    assert!(!fragment.is_voided());
    fragment.void("Replaced");
    assert!(fragment.is_voided());
    let obs = fragment.as_obs().expect("obs fragment");
    assert_eq!(obs.void_reason.as_deref(), Some("Replaced"));
}

#[test]
fn fragment_iteration_is_preorder() {
    let mut root = Fragment::new(FragmentBody::Obs(Obs::new(concept(1))));
    let mut group = Fragment::new(FragmentBody::Obs(Obs::new(concept(2))));
    group
        .children
        .push(Fragment::new(FragmentBody::Obs(Obs::new(concept(3)))));
    root.children.push(group);
    root.children
        .push(Fragment::new(FragmentBody::Obs(Obs::new(concept(4)))));

    let order: Vec<u64> = root
        .iter()
        .filter_map(Fragment::as_obs)
        .map(|obs| obs.concept.id.0)
        .collect();
    assert_eq!(order, vec![1, 2, 3, 4]);
    assert_eq!(root.count(FragmentKind::Obs), 4);
}

#[test]
fn issue_rendering() {
    let node = Node::new(NodeKind::Observation).with_template("1.3.6.1.4.1.19376.1.5.3.1.4.13");
    let issues: ValidationIssues = vec![
        ValidationIssue::error("has-code", "observation has no code").at(&node),
        ValidationIssue::warning("has-effective-time", "no effective time"),
    ]
    .into();
    insta::assert_snapshot!(
        issues.to_string(),
        @"[error] has-code: observation has no code (Observation [1.3.6.1.4.1.19376.1.5.3.1.4.13]); [warning] has-effective-time: no effective time"
    );
}
