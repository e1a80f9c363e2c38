use std::sync::Arc;

use cda_model::{ImportResult, Node, NodeKind};
use cda_validate::{RuleChain, RuleLayer, rules};
use tracing::debug;

use crate::context::ProcessingContext;
use crate::processor::{Processed, Processor};
use crate::session::ImportSession;

pub const GENERIC: &str = "external-reference";

/// External references are consumed by versioning on their parent node;
/// the reference node itself produces nothing.
struct ExternalReferenceProcessor {
    rules: RuleChain,
}

pub(crate) fn generic() -> Arc<dyn Processor> {
    Arc::new(ExternalReferenceProcessor {
        rules: RuleChain::new().layer(
            RuleLayer::new("reference").rule(rules::is_kind(NodeKind::ExternalReference)),
        ),
    })
}

impl Processor for ExternalReferenceProcessor {
    fn name(&self) -> &'static str {
        GENERIC
    }

    fn description(&self) -> &'static str {
        "External reference; recorded through its parent"
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
        debug!(
            reference = node.relationship.as_deref().unwrap_or("-"),
            node = %node,
            "ignoring external reference node"
        );
        Ok(Processed::Skip)
    }
}
