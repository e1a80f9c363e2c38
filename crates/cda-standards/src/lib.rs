#![deny(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod ids;

pub use crate::catalog::{
    CodeSystem, DocumentContract, SectionDefinition, SectionRequirement, TemplateCatalog,
};
pub use crate::error::StandardsError;
