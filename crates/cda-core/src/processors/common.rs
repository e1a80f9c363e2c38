use cda_model::{
    ConceptRef, Fragment, FragmentBody, ImportResult, Node, NodeKind, Obs, ObsValue,
    SectionRecord, TypedValue, TypedValueKind, ValidationIssue,
};
use cda_validate::{Rule, RuleChain, RuleLayer, rules};
use tracing::trace;

use crate::context::ProcessingContext;
use crate::redact::redact_value;
use crate::session::ImportSession;
use crate::versioning::Version;

/// Shape of a node's value, `None` for grouping statements.
pub(super) fn value_kind(node: &Node) -> TypedValueKind {
    node.value
        .as_ref()
        .map_or(TypedValueKind::None, TypedValue::kind)
}

pub(super) fn clinical_statement() -> Rule {
    Rule::new("clinical-statement", |node| {
        (!node.kind.is_clinical_statement()).then(|| {
            ValidationIssue::error(
                "clinical-statement",
                format!("{} is not a clinical statement", node.kind),
            )
        })
    })
    .independent()
}

/// Entry layer shared by every statement processor.
pub(super) fn statement_chain() -> RuleChain {
    RuleChain::new().layer(RuleLayer::new("clinical-statement").rule(clinical_statement()))
}

/// Statements that become versioned facts need an identity and a code.
pub(super) fn coded_entry_layer() -> RuleLayer {
    RuleLayer::new("coded-entry")
        .rule(rules::has_code())
        .rule(rules::has_id())
}

pub(super) fn section_chain() -> RuleChain {
    RuleChain::new().layer(
        RuleLayer::new("section")
            .rule(rules::is_kind(NodeKind::Section))
            .rule(rules::has_title().as_warning())
            .rule(rules::has_narrative().as_warning()),
    )
}

pub(super) fn section_fragment(node: &Node) -> Fragment {
    Fragment::new(FragmentBody::Section(SectionRecord {
        code: node.code.clone(),
        title: node.title.clone(),
        narrative: node.text.clone(),
        template_ids: node.template_ids.clone(),
    }))
}

/// Versioned Obs for an observation-like node. `version` is resolved by
/// the caller before any vocabulary is written.
pub(super) fn build_obs(
    node: &Node,
    context: &ProcessingContext<'_>,
    session: &mut ImportSession<'_>,
    concept: ConceptRef,
    version: Version,
) -> ImportResult<Fragment> {
    let value = match &node.value {
        Some(value) => Some(obs_value(node, value, &concept, session)?),
        None => None,
    };

    let mut obs = Obs::new(concept);
    obs.value = value;
    obs.obs_datetime = context
        .effective_time()
        .or(session.header().effective_time);
    obs.accession_number = version.accession;
    obs.previous_version = version.previous_version;
    obs.group_parent = context.group_parent();
    obs.encounter = context.enclosing_encounter();
    obs.status = node.status.clone();
    obs.comment = node.text.clone();

    if let Some(value) = &node.value {
        trace!(
            concept = %obs.concept.id,
            value = redact_value(&render(value)),
            "built obs"
        );
    }
    Ok(Fragment::new(FragmentBody::Obs(obs)))
}

/// Unversioned Obs grouping the facts below it.
pub(super) fn build_obs_group(
    node: &Node,
    context: &ProcessingContext<'_>,
    session: &ImportSession<'_>,
    concept: ConceptRef,
) -> Fragment {
    let mut obs = Obs::new(concept);
    obs.obs_datetime = context
        .effective_time()
        .or(session.header().effective_time);
    obs.group_parent = context.group_parent();
    obs.encounter = context.enclosing_encounter();
    obs.status = node.status.clone();
    obs.comment = node.text.clone();
    Fragment::new(FragmentBody::Obs(obs))
}

/// Register `member` under the vocabulary of the enclosing organizer or
/// section, when there is one.
pub(super) fn register_membership(
    node: &Node,
    context: &ProcessingContext<'_>,
    session: &mut ImportSession<'_>,
    member: &ConceptRef,
) -> ImportResult<()> {
    let Some(container) = context.expected_code() else {
        return Ok(());
    };
    let set = session.resolve_concept(container, TypedValueKind::None)?;
    session.ensure_member(&set, member, node)
}

fn obs_value(
    node: &Node,
    value: &TypedValue,
    question: &ConceptRef,
    session: &mut ImportSession<'_>,
) -> ImportResult<ObsValue> {
    Ok(match value {
        TypedValue::Numeric { value, unit } => ObsValue::Numeric {
            value: *value,
            unit: unit.clone(),
        },
        TypedValue::Coded(coded) => {
            let answer = session.resolve_concept(coded, TypedValueKind::None)?;
            session.ensure_member(question, &answer, node)?;
            ObsValue::Coded { answer }
        }
        TypedValue::Text(text) => ObsValue::Text {
            value: text.clone(),
        },
        TypedValue::Timestamp(at) => ObsValue::Datetime { value: *at },
        TypedValue::Complex { media_type, data } => ObsValue::Complex {
            media_type: media_type.clone(),
            data: data.clone(),
        },
        TypedValue::Ratio {
            numerator,
            denominator,
        } => ObsValue::Text {
            value: format!("{numerator}:{denominator}"),
        },
    })
}

fn render(value: &TypedValue) -> String {
    match value {
        TypedValue::Numeric { value, unit } => match unit {
            Some(unit) => format!("{value} {unit}"),
            None => value.to_string(),
        },
        TypedValue::Coded(coded) => coded.to_string(),
        TypedValue::Text(text) => text.clone(),
        TypedValue::Timestamp(at) => at.to_rfc3339(),
        TypedValue::Complex { data, .. } => format!("{} bytes", data.len()),
        TypedValue::Ratio {
            numerator,
            denominator,
        } => format!("{numerator}:{denominator}"),
    }
}
