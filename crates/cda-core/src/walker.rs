//! Depth-first, document-order walk of a node tree.
//!
//! For every node the walker dispatches a processor, builds a child
//! context, validates (failing fast before any side effect), processes,
//! then descends. Fragments produced by children attach to the nearest
//! fragment produced above them, in source order.

use std::sync::Arc;

use cda_model::{
    Fragment, FragmentKind, ImportError, ImportResult, Node, NodeKind, ValidationIssue,
    ValidationIssues,
};
use cda_standards::{DocumentContract, SectionRequirement};
use tracing::{debug, info};

use crate::context::ProcessingContext;
use crate::processor::{Processed, Processor};
use crate::registry::ProcessorRegistry;
use crate::session::ImportSession;

pub struct Walker<'w> {
    registry: &'w ProcessorRegistry,
    contract: Option<&'w DocumentContract>,
}

impl<'w> Walker<'w> {
    pub fn new(registry: &'w ProcessorRegistry, contract: Option<&'w DocumentContract>) -> Self {
        Self { registry, contract }
    }

    /// Walk a document tree and return its Visit fragment.
    pub fn walk_document(
        &self,
        root: &Node,
        session: &mut ImportSession<'_>,
    ) -> ImportResult<Fragment> {
        if session.policy().validation_enabled {
            self.check_required_sections(root, session)?;
        }
        let dispatch = self.registry.dispatch(root);
        self.report_dispatch(root, &dispatch.processor, dispatch.fallback, session);
        let context = ProcessingContext::root(root, dispatch.processor.name());

        let mut produced = Vec::with_capacity(1);
        self.apply(root, dispatch.processor.as_ref(), &context, session, &mut produced)?;
        match produced.pop() {
            Some(fragment) if produced.is_empty() && fragment.kind() == FragmentKind::Visit => {
                Ok(fragment)
            }
            _ => Err(ImportError::ValidationFailed {
                node: root.to_string(),
                issues: vec![
                    ValidationIssue::error(
                        "document-output",
                        format!("{} did not produce a visit", dispatch.processor.name()),
                    )
                    .at(root),
                ]
                .into(),
            }),
        }
    }

    fn check_required_sections(
        &self,
        root: &Node,
        session: &ImportSession<'_>,
    ) -> ImportResult<()> {
        let Some(contract) = self.contract else {
            debug!(document = %root, "no document contract, every section required");
            return Ok(());
        };
        let present = root
            .children_of_kind(NodeKind::Section)
            .map(|section| &section.template_ids);
        let missing = session.catalog().missing_required_sections(contract, present);
        if missing.is_empty() {
            return Ok(());
        }
        let issues: ValidationIssues = missing
            .iter()
            .map(|section| {
                ValidationIssue::error(
                    "required-section",
                    format!("{} requires a {} section", contract.name, section.name),
                )
                .at(root)
            })
            .collect();
        Err(ImportError::ValidationFailed {
            node: root.to_string(),
            issues,
        })
    }

    fn walk_node(
        &self,
        node: &Node,
        parent: &ProcessingContext<'_>,
        session: &mut ImportSession<'_>,
        out: &mut Vec<Fragment>,
    ) -> ImportResult<()> {
        let dispatch = self.registry.dispatch(node);
        self.report_dispatch(node, &dispatch.processor, dispatch.fallback, session);
        let context = parent.child(node, dispatch.processor.name());
        self.apply(node, dispatch.processor.as_ref(), &context, session, out)
    }

    fn apply(
        &self,
        node: &Node,
        processor: &dyn Processor,
        context: &ProcessingContext<'_>,
        session: &mut ImportSession<'_>,
        out: &mut Vec<Fragment>,
    ) -> ImportResult<()> {
        if session.policy().validation_enabled {
            let issues = processor.rules().validate(node);
            if issues.has_errors() {
                debug!(
                    processor = processor.name(),
                    node = %node,
                    errors = issues.error_count(),
                    "validation failed"
                );
                return Err(ImportError::ValidationFailed {
                    node: node.to_string(),
                    issues,
                });
            }
            for issue in issues {
                session.warn(issue);
            }
        }

        match processor.process(node, context, session)? {
            Processed::Fragment(mut fragment) => {
                let mut children = Vec::new();
                {
                    let scoped = context.with_output(fragment.id, &fragment.body);
                    self.walk_children(node, &scoped, session, &mut children)?;
                }
                fragment.children.extend(children);
                out.push(fragment);
            }
            Processed::PassThrough => self.walk_children(node, context, session, out)?,
            Processed::Skip => {
                debug!(processor = processor.name(), node = %node, "skipped subtree");
            }
        }
        Ok(())
    }

    fn walk_children(
        &self,
        node: &Node,
        context: &ProcessingContext<'_>,
        session: &mut ImportSession<'_>,
        out: &mut Vec<Fragment>,
    ) -> ImportResult<()> {
        for child in &node.children {
            if node.kind == NodeKind::Document && child.kind == NodeKind::Section {
                self.walk_top_section(child, context, session, out)?;
            } else {
                self.walk_node(child, context, session, out)?;
            }
        }
        Ok(())
    }

    /// A top-level section that fails validation is skipped, with everything
    /// it recorded undone, when the document contract lets it be absent.
    fn walk_top_section(
        &self,
        section: &Node,
        context: &ProcessingContext<'_>,
        session: &mut ImportSession<'_>,
        out: &mut Vec<Fragment>,
    ) -> ImportResult<()> {
        let requirement = session
            .catalog()
            .section_requirement(self.contract, &section.template_ids);
        let mark = session.mark();
        let mut produced = Vec::new();
        match self.walk_node(section, context, session, &mut produced) {
            Ok(()) => {
                out.extend(produced);
                Ok(())
            }
            Err(ImportError::ValidationFailed { node, issues })
                if requirement == SectionRequirement::Optional =>
            {
                session.rollback(mark);
                info!(section = %section, failed = %node, "skipping optional section");
                session.warn(
                    ValidationIssue::warning(
                        "optional-section-skipped",
                        format!("optional section skipped: {node}: {issues}"),
                    )
                    .at(section),
                );
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    fn report_dispatch(
        &self,
        node: &Node,
        processor: &Arc<dyn Processor>,
        fallback: bool,
        session: &mut ImportSession<'_>,
    ) {
        if !fallback {
            debug!(processor = processor.name(), node = %node, "dispatched");
            return;
        }
        if node.template_ids.is_empty() || node.kind == NodeKind::ExternalReference {
            debug!(processor = processor.name(), node = %node, "no template ids, using fallback");
            return;
        }
        session.warn(
            ValidationIssue::warning(
                "unrecognized-template",
                format!(
                    "no processor declares {}; handled by {}",
                    node.template_ids,
                    processor.name()
                ),
            )
            .at(node),
        );
    }
}
