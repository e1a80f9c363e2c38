//! Clinical statement processors: observations become versioned Obs,
//! problem observations become active-list items.

use std::sync::Arc;

use cda_model::{
    ActiveList, ActiveListItem, Fragment, FragmentBody, ImportResult, Node, NodeKind, Status,
    TypedValue, TypedValueKind, ValidationIssue,
};
use cda_standards::ids::LOINC;
use cda_validate::{RuleChain, RuleLayer, rules};
use tracing::{debug, info};

use super::common::{build_obs, coded_entry_layer, register_membership, statement_chain, value_kind};
use crate::context::ProcessingContext;
use crate::processor::{Processed, Processor};
use crate::session::ImportSession;

pub const GENERIC: &str = "generic-entry";
pub const VITAL_SIGN_OBSERVATION: &str = "vital-sign-observation";
pub const PROBLEM_CONCERN: &str = "problem-concern";
pub const PROBLEM_OBSERVATION: &str = "problem-observation";

/// Coded statement to Obs. Optionally registers the concept as a member of
/// the enclosing container's vocabulary.
struct ObservationProcessor {
    name: &'static str,
    description: &'static str,
    rules: RuleChain,
    membership: bool,
}

pub(crate) fn generic() -> Arc<dyn Processor> {
    Arc::new(ObservationProcessor {
        name: GENERIC,
        description: "Any clinical statement; Obs when coded",
        rules: statement_chain(),
        membership: false,
    })
}

pub(crate) fn vital_sign() -> Arc<dyn Processor> {
    Arc::new(ObservationProcessor {
        name: VITAL_SIGN_OBSERVATION,
        description: "IHE Vital Signs observation",
        rules: RuleChain::extending(&statement_chain())
            .layer(coded_entry_layer())
            .layer(
                RuleLayer::new("vital-sign")
                    .rule(rules::is_kind(NodeKind::Observation))
                    .rule(rules::code_system_in(&[LOINC]))
                    .rule(rules::has_value())
                    .rule(rules::value_shape(&[TypedValueKind::Numeric]))
                    .rule(rules::status_in(&[Status::Completed])),
            ),
        membership: true,
    })
}

impl Processor for ObservationProcessor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn rules(&self) -> &RuleChain {
        &self.rules
    }

    fn process(
        &self,
        node: &Node,
        context: &ProcessingContext<'_>,
        session: &mut ImportSession<'_>,
    ) -> ImportResult<Processed> {
        let Some(code) = &node.code else {
            debug!(processor = self.name, node = %node, "uncoded statement, walking its children");
            return Ok(Processed::PassThrough);
        };
        let version = session.resolve_version(node)?;
        let concept = session.resolve_concept(code, value_kind(node))?;
        if self.membership {
            register_membership(node, context, session, &concept)?;
        }
        Ok(Processed::Fragment(build_obs(node, context, session, concept, version)?))
    }
}

/// The concern act only wraps the problems it tracks.
struct ProblemConcernProcessor {
    rules: RuleChain,
}

pub(crate) fn problem_concern() -> Arc<dyn Processor> {
    Arc::new(ProblemConcernProcessor {
        rules: RuleChain::extending(&statement_chain()).layer(
            RuleLayer::new("problem-concern")
                .rule(rules::is_kind(NodeKind::Act))
                .rule(rules::min_children(NodeKind::Observation, 1))
                .rule(rules::status_in(&[
                    Status::Active,
                    Status::Suspended,
                    Status::Aborted,
                    Status::Completed,
                ])),
        ),
    })
}

impl Processor for ProblemConcernProcessor {
    fn name(&self) -> &'static str {
        PROBLEM_CONCERN
    }

    fn description(&self) -> &'static str {
        "IHE Problem Concern entry"
    }

    fn rules(&self) -> &RuleChain {
        &self.rules
    }

    fn process(
        &self,
        _node: &Node,
        _context: &ProcessingContext<'_>,
        _session: &mut ImportSession<'_>,
    ) -> ImportResult<Processed> {
        Ok(Processed::PassThrough)
    }
}

struct ProblemObservationProcessor {
    rules: RuleChain,
}

pub(crate) fn problem_observation() -> Arc<dyn Processor> {
    Arc::new(ProblemObservationProcessor {
        rules: RuleChain::extending(&statement_chain())
            .layer(coded_entry_layer())
            .layer(
                RuleLayer::new("problem")
                    .rule(rules::is_kind(NodeKind::Observation))
                    .rule(rules::has_value())
                    .rule(rules::value_shape(&[TypedValueKind::Coded])),
            ),
    })
}

impl Processor for ProblemObservationProcessor {
    fn name(&self) -> &'static str {
        PROBLEM_OBSERVATION
    }

    fn description(&self) -> &'static str {
        "IHE Problem observation"
    }

    fn rules(&self) -> &RuleChain {
        &self.rules
    }

    fn process(
        &self,
        node: &Node,
        context: &ProcessingContext<'_>,
        session: &mut ImportSession<'_>,
    ) -> ImportResult<Processed> {
        if node.negated {
            info!(node = %node, "negated problem, nothing to record");
            return Ok(Processed::Skip);
        }
        let problem = match &node.value {
            Some(TypedValue::Coded(coded)) => coded,
            _ => match &node.code {
                Some(code) => code,
                None => {
                    session.warn(
                        ValidationIssue::warning("problem-uncoded", "problem has no coded value")
                            .at(node),
                    );
                    return Ok(Processed::Skip);
                }
            },
        };
        let version = session.resolve_version(node)?;
        let concept = session.resolve_concept(problem, TypedValueKind::None)?;
        register_membership(node, context, session, &concept)?;

        // Concern status wins over the observation's own.
        let concern = context
            .parent
            .map(|parent| parent.node)
            .filter(|parent| parent.kind == NodeKind::Act);
        let status = concern
            .and_then(|concern| concern.status.clone())
            .or_else(|| node.status.clone());
        let interval = node
            .effective_time
            .as_ref()
            .or_else(|| concern.and_then(|concern| concern.effective_time.as_ref()));

        let item = ActiveListItem {
            list: ActiveList::Problems,
            concept,
            start: interval.and_then(cda_model::TimeInterval::start),
            end: interval.and_then(|interval| interval.high),
            status,
            accession_number: version.accession,
            previous_version: version.previous_version,
            voided: false,
            void_reason: None,
        };
        Ok(Processed::Fragment(Fragment::new(FragmentBody::ActiveListItem(item))))
    }
}
