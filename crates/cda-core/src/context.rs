//! Parent-linked processing contexts.
//!
//! A context records which node is being interpreted, by which processor,
//! and which output fragment it produced. Each recursive step borrows its
//! parent and builds a new context; nothing is mutated after construction,
//! so every branch of the walk owns an independent chain tail.

use cda_model::{CodedValue, FragmentBody, FragmentId, FragmentKind, Node, NodeKind};
use chrono::{DateTime, Utc};

/// Output fragment a context produced, borrowed while its children walk.
#[derive(Debug, Clone, Copy)]
pub struct ContextOutput<'a> {
    pub id: FragmentId,
    pub body: &'a FragmentBody,
}

impl ContextOutput<'_> {
    pub fn kind(&self) -> FragmentKind {
        self.body.kind()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProcessingContext<'a> {
    pub node: &'a Node,
    /// Name of the processor interpreting `node`.
    pub processor: &'static str,
    pub output: Option<ContextOutput<'a>>,
    pub parent: Option<&'a ProcessingContext<'a>>,
}

impl<'a> ProcessingContext<'a> {
    pub fn root(node: &'a Node, processor: &'static str) -> Self {
        Self {
            node,
            processor,
            output: None,
            parent: None,
        }
    }

    /// Context for a child node, with `self` as parent.
    pub fn child<'b>(&'b self, node: &'b Node, processor: &'static str) -> ProcessingContext<'b> {
        ProcessingContext {
            node,
            processor,
            output: None,
            parent: Some(self),
        }
    }

    /// The same node and processor, now carrying the fragment it produced.
    pub fn with_output<'b>(&self, id: FragmentId, body: &'b FragmentBody) -> ProcessingContext<'b>
    where
        'a: 'b,
    {
        ProcessingContext {
            node: self.node,
            processor: self.processor,
            output: Some(ContextOutput { id, body }),
            parent: self.parent,
        }
    }

    /// This context followed by every ancestor up to the root.
    pub fn ancestors(&self) -> Ancestors<'_, 'a> {
        Ancestors {
            next: Some(self),
        }
    }

    pub fn nearest_ancestor_where<P>(&self, predicate: P) -> Option<&ProcessingContext<'a>>
    where
        P: Fn(&ProcessingContext<'a>) -> bool,
    {
        self.ancestors().find(|context| predicate(context))
    }

    pub fn depth(&self) -> usize {
        self.ancestors().count() - 1
    }

    /// Nearest output of the given kind, this context included.
    pub fn enclosing_output(&self, kind: FragmentKind) -> Option<ContextOutput<'a>> {
        self.ancestors()
            .filter_map(|context| context.output)
            .find(|output| output.kind() == kind)
    }

    /// Nearest Encounter fragment, falling back to the document's Visit.
    pub fn enclosing_encounter(&self) -> Option<FragmentId> {
        self.enclosing_output(FragmentKind::Encounter)
            .or_else(|| self.enclosing_output(FragmentKind::Visit))
            .map(|output| output.id)
    }

    /// Nearest Obs output above this node; children of an obs group link to it.
    pub fn group_parent(&self) -> Option<FragmentId> {
        self.parent?
            .ancestors()
            .filter_map(|context| context.output)
            .take_while(|output| output.kind() != FragmentKind::Section)
            .find(|output| output.kind() == FragmentKind::Obs)
            .map(|output| output.id)
    }

    /// Code of the nearest enclosing organizer or section: the container
    /// whose vocabulary a coded value here belongs to.
    pub fn expected_code(&self) -> Option<&'a CodedValue> {
        self.parent?
            .ancestors()
            .find(|context| matches!(context.node.kind, NodeKind::Organizer | NodeKind::Section))
            .and_then(|context| context.node.code.as_ref())
    }

    /// Effective time of this node, else the nearest ancestor that has one.
    pub fn effective_time(&self) -> Option<DateTime<Utc>> {
        self.ancestors().find_map(|context| {
            context
                .node
                .effective_time
                .as_ref()
                .and_then(cda_model::TimeInterval::start)
        })
    }
}

pub struct Ancestors<'c, 'a> {
    next: Option<&'c ProcessingContext<'a>>,
}

impl<'c, 'a> Iterator for Ancestors<'c, 'a> {
    type Item = &'c ProcessingContext<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent;
        Some(current)
    }
}
