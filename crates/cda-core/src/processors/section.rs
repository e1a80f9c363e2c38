//! Section processors. Section-level expectations are mostly warnings: a
//! section that deviates from its template is still recorded.

use std::sync::Arc;

use cda_model::{ImportResult, Node, NodeKind};
use cda_standards::ids::{ENCOUNTERS_CODE, LOINC, PROBLEM_LIST_CODE, VITAL_SIGNS_CODE};
use cda_validate::{RuleChain, RuleLayer, rules};

use super::common::{section_chain, section_fragment};
use crate::context::ProcessingContext;
use crate::processor::{Processed, Processor};
use crate::session::ImportSession;

pub const GENERIC: &str = "generic-section";
pub const VITAL_SIGNS: &str = "vital-signs-section";
pub const CODED_VITAL_SIGNS: &str = "coded-vital-signs-section";
pub const ACTIVE_PROBLEMS: &str = "active-problems-section";
pub const ENCOUNTERS: &str = "encounters-section";

struct SectionProcessor {
    name: &'static str,
    description: &'static str,
    rules: RuleChain,
}

fn coded_section(name: &str, code: &str) -> RuleLayer {
    RuleLayer::new(name)
        .rule(rules::has_code().as_warning())
        .rule(rules::code_system_in(&[LOINC]).as_warning())
        .rule(rules::code_in(&[code]).as_warning())
}

fn vital_signs_chain() -> RuleChain {
    RuleChain::extending(&section_chain()).layer(coded_section("vital-signs", VITAL_SIGNS_CODE))
}

pub(crate) fn generic() -> Arc<dyn Processor> {
    Arc::new(SectionProcessor {
        name: GENERIC,
        description: "Any section; records code, title and narrative",
        rules: section_chain(),
    })
}

pub(crate) fn vital_signs() -> Arc<dyn Processor> {
    Arc::new(SectionProcessor {
        name: VITAL_SIGNS,
        description: "IHE Vital Signs section",
        rules: vital_signs_chain(),
    })
}

pub(crate) fn coded_vital_signs() -> Arc<dyn Processor> {
    Arc::new(SectionProcessor {
        name: CODED_VITAL_SIGNS,
        description: "IHE Coded Vital Signs section",
        rules: RuleChain::extending(&vital_signs_chain()).layer(
            RuleLayer::new("coded-vital-signs")
                .rule(rules::min_children(NodeKind::Organizer, 1)),
        ),
    })
}

pub(crate) fn active_problems() -> Arc<dyn Processor> {
    Arc::new(SectionProcessor {
        name: ACTIVE_PROBLEMS,
        description: "IHE Active Problems section",
        rules: RuleChain::extending(&section_chain())
            .layer(coded_section("active-problems", PROBLEM_LIST_CODE)),
    })
}

pub(crate) fn encounters() -> Arc<dyn Processor> {
    Arc::new(SectionProcessor {
        name: ENCOUNTERS,
        description: "IHE Encounters section",
        rules: RuleChain::extending(&section_chain())
            .layer(coded_section("encounters", ENCOUNTERS_CODE)),
    })
}

impl Processor for SectionProcessor {
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
        _session: &mut ImportSession<'_>,
    ) -> ImportResult<Processed> {
        Ok(Processed::Fragment(section_fragment(node)))
    }
}
