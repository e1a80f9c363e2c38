use std::sync::Arc;

use cda_model::{Encounter, Fragment, FragmentBody, ImportResult, Node, NodeKind, TypedValueKind};
use cda_validate::{RuleChain, RuleLayer, rules};

use crate::context::ProcessingContext;
use crate::processor::{Processed, Processor};
use crate::session::ImportSession;

pub const GENERIC: &str = "generic-encounter";
pub const ENCOUNTER_ENTRY: &str = "encounter-entry";

/// Encounter activities become Encounter fragments; statements nested in
/// them are attributed to the encounter instead of the visit.
struct EncounterProcessor {
    name: &'static str,
    description: &'static str,
    rules: RuleChain,
}

fn base_chain() -> RuleChain {
    RuleChain::new().layer(RuleLayer::new("encounter").rule(rules::is_kind(NodeKind::Encounter)))
}

pub(crate) fn generic() -> Arc<dyn Processor> {
    Arc::new(EncounterProcessor {
        name: GENERIC,
        description: "Any encounter",
        rules: base_chain(),
    })
}

pub(crate) fn encounter_entry() -> Arc<dyn Processor> {
    Arc::new(EncounterProcessor {
        name: ENCOUNTER_ENTRY,
        description: "IHE Encounter entry",
        rules: RuleChain::extending(&base_chain()).layer(
            RuleLayer::new("encounter-entry")
                .rule(rules::has_id())
                .rule(rules::has_effective_time().as_warning()),
        ),
    })
}

impl Processor for EncounterProcessor {
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
        let version = session.resolve_version(node)?;
        let encounter_type = match &node.code {
            Some(code) => Some(session.resolve_concept(code, TypedValueKind::None)?),
            None => None,
        };
        let interval = node.effective_time.as_ref();
        let encounter = Encounter {
            encounter_type,
            start: interval
                .and_then(cda_model::TimeInterval::start)
                .or_else(|| context.effective_time()),
            stop: interval.and_then(cda_model::TimeInterval::end),
            accession_number: version.accession,
            previous_version: version.previous_version,
            voided: false,
            void_reason: None,
        };
        Ok(Processed::Fragment(Fragment::new(FragmentBody::Encounter(encounter))))
    }
}
