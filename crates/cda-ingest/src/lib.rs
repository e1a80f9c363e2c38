//! Document parser collaborator: CDA R2 XML in, typed node tree out.

mod mapping;
pub mod parser;
pub mod timestamp;
mod xml;

pub use parser::{DocumentParser, ParsedDocument, XmlDocumentParser};
pub use timestamp::parse_hl7_timestamp;
