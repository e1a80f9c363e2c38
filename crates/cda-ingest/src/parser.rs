use cda_model::{DocumentHeader, IssueSeverity, Node, ParseError, ParseIssue};
use tracing::{debug, warn};

use crate::mapping::Mapper;
use crate::xml::read_tree;

/// Output of a document parser: the header, the typed node tree rooted at
/// the document node, and any non-fatal issues.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub header: DocumentHeader,
    pub root: Node,
    pub issues: Vec<ParseIssue>,
}

impl ParsedDocument {
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == IssueSeverity::Error)
    }
}

/// Turns raw document bytes into a typed node tree.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedDocument, ParseError>;
}

/// CDA R2 reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlDocumentParser;

impl XmlDocumentParser {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentParser for XmlDocumentParser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedDocument, ParseError> {
        let tree = read_tree(bytes)?;
        if tree.name != "ClinicalDocument" {
            return Err(ParseError::UnexpectedRoot { found: tree.name });
        }

        let mut mapper = Mapper::new();
        let header = mapper.header(&tree);
        let root = mapper.document(&tree);
        let issues = mapper.into_issues();

        for issue in &issues {
            warn!(
                severity = %issue.severity,
                path = issue.path.as_deref().unwrap_or(""),
                "{}",
                issue.message
            );
        }
        debug!(
            sections = root.children.len(),
            templates = %root.template_ids,
            "parsed clinical document"
        );
        Ok(ParsedDocument {
            header,
            root,
            issues,
        })
    }
}
