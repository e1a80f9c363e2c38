//! Typed document tree produced by the document parser.
//!
//! Nodes are immutable once produced; the import owns the tree for the
//! duration of one document walk.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::template::{TemplateId, TemplateIdSet};
use crate::value::{CodedValue, ExternalId, ExternalReference, Status, TimeInterval, TypedValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Document,
    Section,
    Organizer,
    Act,
    Observation,
    Procedure,
    SubstanceAdministration,
    Encounter,
    ExternalReference,
}

impl NodeKind {
    /// Clinical statements that may appear as section entries.
    pub fn is_clinical_statement(self) -> bool {
        matches!(
            self,
            NodeKind::Act
                | NodeKind::Observation
                | NodeKind::Procedure
                | NodeKind::SubstanceAdministration
                | NodeKind::Encounter
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Document => "Document",
            NodeKind::Section => "Section",
            NodeKind::Organizer => "Organizer",
            NodeKind::Act => "Act",
            NodeKind::Observation => "Observation",
            NodeKind::Procedure => "Procedure",
            NodeKind::SubstanceAdministration => "SubstanceAdministration",
            NodeKind::Encounter => "Encounter",
            NodeKind::ExternalReference => "ExternalReference",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub template_ids: TemplateIdSet,
    pub id: Option<ExternalId>,
    pub code: Option<CodedValue>,
    pub value: Option<TypedValue>,
    pub status: Option<Status>,
    pub effective_time: Option<TimeInterval>,
    /// Section title.
    pub title: Option<String>,
    /// Narrative text (sections) or free-text comment (entries).
    pub text: Option<String>,
    /// Type code of the relationship attaching this node to its parent
    /// (e.g. `COMP`, `RSON`, `SUBJ`).
    pub relationship: Option<String>,
    pub negated: bool,
    pub references: Vec<ExternalReference>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            template_ids: TemplateIdSet::new(),
            id: None,
            code: None,
            value: None,
            status: None,
            effective_time: None,
            title: None,
            text: None,
            relationship: None,
            negated: false,
            references: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_template(mut self, id: impl Into<TemplateId>) -> Self {
        self.template_ids.insert(id);
        self
    }

    pub fn with_templates<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TemplateId>,
    {
        for id in ids {
            self.template_ids.insert(id);
        }
        self
    }

    pub fn with_id(mut self, id: ExternalId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_code(mut self, code: CodedValue) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_value(mut self, value: TypedValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_effective_time(mut self, effective_time: TimeInterval) -> Self {
        self.effective_time = Some(effective_time);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_relationship(mut self, type_code: impl Into<String>) -> Self {
        self.relationship = Some(type_code.into());
        self
    }

    pub fn with_reference(mut self, reference: ExternalReference) -> Self {
        self.references.push(reference);
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn children_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(move |child| child.kind == kind)
    }

    /// Pre-order traversal of this node and all descendants.
    pub fn iter(&self) -> NodeIter<'_> {
        NodeIter { stack: vec![self] }
    }

    /// Replace (`RPLC`) references in document order.
    pub fn replacement_references(&self) -> impl Iterator<Item = &ExternalReference> {
        self.references.iter().filter(|reference| reference.is_replacement())
    }
}

pub struct NodeIter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.template_ids.is_empty() {
            write!(f, " {}", self.template_ids)?;
        }
        if let Some(id) = &self.id {
            write!(f, " id={id}")?;
        }
        Ok(())
    }
}
