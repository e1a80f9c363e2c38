use std::sync::Arc;

use cda_model::{ImportResult, Node, NodeKind, Status, TypedValueKind};
use cda_validate::{RuleChain, RuleLayer, rules};
use tracing::debug;

use super::common::build_obs_group;
use crate::context::ProcessingContext;
use crate::processor::{Processed, Processor};
use crate::session::ImportSession;

pub const GENERIC: &str = "generic-organizer";
pub const VITAL_SIGNS_ORGANIZER: &str = "vital-signs-organizer";

/// Organizers become obs groups; their components link to the group.
struct OrganizerProcessor {
    name: &'static str,
    description: &'static str,
    rules: RuleChain,
}

fn base_chain() -> RuleChain {
    RuleChain::new().layer(RuleLayer::new("organizer").rule(rules::is_kind(NodeKind::Organizer)))
}

pub(crate) fn generic() -> Arc<dyn Processor> {
    Arc::new(OrganizerProcessor {
        name: GENERIC,
        description: "Any organizer; grouped when coded",
        rules: base_chain(),
    })
}

pub(crate) fn vital_signs() -> Arc<dyn Processor> {
    Arc::new(OrganizerProcessor {
        name: VITAL_SIGNS_ORGANIZER,
        description: "IHE Vital Signs organizer",
        rules: RuleChain::extending(&base_chain()).layer(
            RuleLayer::new("vital-signs-organizer")
                .rule(rules::has_code())
                .rule(rules::has_effective_time())
                .rule(rules::status_in(&[Status::Completed]))
                .rule(rules::min_children(NodeKind::Observation, 1)),
        ),
    })
}

impl Processor for OrganizerProcessor {
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
            debug!(processor = self.name, node = %node, "uncoded organizer, components attach to the parent");
            return Ok(Processed::PassThrough);
        };
        let concept = session.resolve_concept(code, TypedValueKind::None)?;
        Ok(Processed::Fragment(build_obs_group(
            node, context, session, concept,
        )))
    }
}
