pub mod concept;
pub mod error;
pub mod fragment;
pub mod header;
pub mod issue;
pub mod node;
pub mod options;
pub mod template;
pub mod value;

pub use concept::{ConceptDatatype, ConceptId, ConceptMapping, ConceptRef, ConceptSpec};
pub use error::{ImportError, ImportResult, ParseError};
pub use fragment::{
    ActiveList, ActiveListItem, Encounter, Fragment, FragmentBody, FragmentId, FragmentKind, Obs,
    ObsValue, SectionRecord, Visit,
};
pub use header::{Custodian, DocumentHeader, Participant, PatientScope, ProviderRole};
pub use issue::{IssueSeverity, ParseIssue, ValidationIssue, ValidationIssues};
pub use node::{Node, NodeKind};
pub use options::{DEFAULT_IDENTIFIER_FORMAT, ImportPolicy};
pub use template::{TemplateId, TemplateIdSet};
pub use value::{
    CodedValue, ExternalId, ExternalReference, ReferenceType, Status, TimeInterval, TypedValue,
    TypedValueKind,
};
