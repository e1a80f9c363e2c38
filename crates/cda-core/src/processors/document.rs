//! Document root processors: the header becomes the Visit every other
//! fragment hangs from.

use std::sync::Arc;

use cda_model::{
    DEFAULT_IDENTIFIER_FORMAT, Fragment, FragmentBody, ImportResult, Node, NodeKind, Visit,
};
use cda_standards::ids::LOINC;
use cda_validate::{RuleChain, RuleLayer, rules};
use tracing::debug;

use crate::context::ProcessingContext;
use crate::processor::{Processed, Processor};
use crate::session::ImportSession;

pub const GENERIC: &str = "generic-document";
pub const MEDICAL_SUMMARY: &str = "medical-summary";
pub const CONTINUITY_OF_CARE: &str = "continuity-of-care-document";

/// LOINC "Summarization of episode note".
const SUMMARY_NOTE_CODE: &str = "34133-9";

struct DocumentProcessor {
    name: &'static str,
    description: &'static str,
    rules: RuleChain,
}

fn base_chain() -> RuleChain {
    RuleChain::new().layer(
        RuleLayer::new("document")
            .rule(rules::is_kind(NodeKind::Document))
            .rule(rules::has_id().as_warning()),
    )
}

pub(crate) fn generic() -> Arc<dyn Processor> {
    Arc::new(DocumentProcessor {
        name: GENERIC,
        description: "Any clinical document; header only",
        // Without a template there is no contract, so every section is required.
        rules: RuleChain::extending(&base_chain()).layer(
            RuleLayer::new("untemplated-document").rule(rules::has_template().as_warning()),
        ),
    })
}

pub(crate) fn medical_summary() -> Arc<dyn Processor> {
    Arc::new(DocumentProcessor {
        name: MEDICAL_SUMMARY,
        description: "IHE Medical Summary",
        rules: RuleChain::extending(&base_chain()).layer(
            RuleLayer::new("medical-summary")
                .rule(rules::has_id())
                .rule(rules::has_code())
                .rule(rules::code_system_in(&[LOINC])),
        ),
    })
}

pub(crate) fn continuity_of_care() -> Arc<dyn Processor> {
    Arc::new(DocumentProcessor {
        name: CONTINUITY_OF_CARE,
        description: "HL7 Continuity of Care Document",
        rules: RuleChain::extending(&base_chain()).layer(
            RuleLayer::new("continuity-of-care")
                .rule(rules::has_id())
                .rule(rules::has_code())
                .rule(rules::code_in(&[SUMMARY_NOTE_CODE]).as_warning()),
        ),
    })
}

impl Processor for DocumentProcessor {
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
        _context: &ProcessingContext<'_>,
        session: &mut ImportSession<'_>,
    ) -> ImportResult<Processed> {
        let header = session.header();
        let document_id = header
            .id
            .as_ref()
            .or(node.id.as_ref())
            .map(|id| id.format(DEFAULT_IDENTIFIER_FORMAT));
        let window = header.service_event.as_ref();
        let visit = Visit {
            patient: session.scope().clone(),
            document_id,
            document_type: header.code.clone().or_else(|| node.code.clone()),
            title: header.title.clone().or_else(|| node.title.clone()),
            start: window
                .and_then(cda_model::TimeInterval::start)
                .or(header.effective_time),
            stop: window.and_then(cda_model::TimeInterval::end),
            location: header
                .custodian
                .as_ref()
                .and_then(|custodian| custodian.name.clone()),
            providers: header.participants.clone(),
            confidentiality: header.confidentiality.clone(),
        };
        debug!(
            processor = self.name,
            providers = visit.providers.len(),
            "built visit"
        );
        Ok(Processed::Fragment(Fragment::new(FragmentBody::Visit(visit))))
    }
}
