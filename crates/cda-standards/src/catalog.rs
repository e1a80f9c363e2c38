use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use cda_model::TemplateIdSet;
use serde::{Deserialize, Serialize};

use crate::error::StandardsError;

const CATALOG_SCHEMA: &str = "cda-import.template-catalog";
const BUNDLED_CATALOG: &str = include_str!("../data/catalog.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogFile {
    catalog: CatalogHeader,
    #[serde(default)]
    sections: Vec<SectionDefinition>,
    #[serde(default)]
    documents: Vec<DocumentContract>,
    #[serde(default)]
    code_systems: Vec<CodeSystem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogHeader {
    schema: String,
    schema_version: u32,
}

/// A section kind a document contract can require.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDefinition {
    pub key: String,
    pub name: String,
    pub template_ids: TemplateIdSet,
    /// Expected LOINC section code.
    #[serde(default)]
    pub code: Option<String>,
}

/// Which sections a document type must and may contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentContract {
    pub name: String,
    pub template_ids: TemplateIdSet,
    #[serde(default)]
    pub required_sections: Vec<String>,
    #[serde(default)]
    pub optional_sections: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSystem {
    pub oid: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionRequirement {
    Required,
    Optional,
}

#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    sections: BTreeMap<String, SectionDefinition>,
    documents: Vec<DocumentContract>,
    code_systems: BTreeMap<String, String>,
}

impl TemplateCatalog {
    /// Catalog compiled into the binary.
    pub fn bundled() -> Result<Self, StandardsError> {
        Self::from_toml_str(BUNDLED_CATALOG, Path::new("<bundled>/catalog.toml"))
    }

    pub fn load(path: &Path) -> Result<Self, StandardsError> {
        let contents = std::fs::read_to_string(path).map_err(|e| StandardsError::io(path, e))?;
        Self::from_toml_str(&contents, path)
    }

    pub fn from_toml_str(contents: &str, origin: &Path) -> Result<Self, StandardsError> {
        let file: CatalogFile = toml::from_str(contents).map_err(|e| StandardsError::Toml {
            path: origin.to_path_buf(),
            source: e,
        })?;
        validate_catalog(&file)?;

        let sections = file
            .sections
            .into_iter()
            .map(|section| (section.key.clone(), section))
            .collect();
        let code_systems = file
            .code_systems
            .into_iter()
            .map(|system| (system.oid, system.name))
            .collect();
        Ok(Self {
            sections,
            documents: file.documents,
            code_systems,
        })
    }

    /// Contract whose template set equals the document's exactly.
    pub fn contract_for(&self, document_templates: &TemplateIdSet) -> Option<&DocumentContract> {
        self.documents
            .iter()
            .find(|contract| document_templates.matches_exactly(&contract.template_ids))
    }

    pub fn contracts(&self) -> &[DocumentContract] {
        &self.documents
    }

    pub fn section(&self, key: &str) -> Option<&SectionDefinition> {
        self.sections.get(key)
    }

    /// Without a contract nothing is marked optional, so every section is
    /// required. Under a contract a section is required when it satisfies a
    /// definition the contract lists as required; sections the contract does
    /// not mention are optional.
    pub fn section_requirement(
        &self,
        contract: Option<&DocumentContract>,
        section_templates: &TemplateIdSet,
    ) -> SectionRequirement {
        let Some(contract) = contract else {
            return SectionRequirement::Required;
        };
        let required = contract
            .required_sections
            .iter()
            .filter_map(|key| self.sections.get(key))
            .any(|section| section_templates.satisfies(&section.template_ids));
        if required {
            SectionRequirement::Required
        } else {
            SectionRequirement::Optional
        }
    }

    /// Required section definitions not satisfied by any present section.
    pub fn missing_required_sections<'a, I>(
        &self,
        contract: &DocumentContract,
        present: I,
    ) -> Vec<&SectionDefinition>
    where
        I: IntoIterator<Item = &'a TemplateIdSet>,
    {
        let present: Vec<&TemplateIdSet> = present.into_iter().collect();
        contract
            .required_sections
            .iter()
            .filter_map(|key| self.sections.get(key))
            .filter(|section| {
                !present
                    .iter()
                    .any(|templates| templates.satisfies(&section.template_ids))
            })
            .collect()
    }

    /// Short human name for a code system OID.
    pub fn code_system_name(&self, oid: &str) -> Option<&str> {
        self.code_systems.get(oid.trim()).map(String::as_str)
    }
}

fn validate_catalog(file: &CatalogFile) -> Result<(), StandardsError> {
    if file.catalog.schema != CATALOG_SCHEMA {
        return Err(StandardsError::invalid(format!(
            "unsupported schema: {}",
            file.catalog.schema
        )));
    }
    if file.catalog.schema_version != 1 {
        return Err(StandardsError::invalid(format!(
            "unsupported schema_version: {}",
            file.catalog.schema_version
        )));
    }

    let mut keys = BTreeSet::new();
    for section in &file.sections {
        if !keys.insert(section.key.as_str()) {
            return Err(StandardsError::invalid(format!(
                "duplicate section key: {}",
                section.key
            )));
        }
        if section.template_ids.is_empty() {
            return Err(StandardsError::invalid(format!(
                "section {} declares no template ids",
                section.key
            )));
        }
    }

    for contract in &file.documents {
        if contract.template_ids.is_empty() {
            return Err(StandardsError::invalid(format!(
                "document {} declares no template ids",
                contract.name
            )));
        }
        for key in contract
            .required_sections
            .iter()
            .chain(&contract.optional_sections)
        {
            if !keys.contains(key.as_str()) {
                return Err(StandardsError::invalid(format!(
                    "document {} references unknown section: {key}",
                    contract.name
                )));
            }
        }
        if let Some(key) = contract
            .required_sections
            .iter()
            .find(|key| contract.optional_sections.contains(key))
        {
            return Err(StandardsError::invalid(format!(
                "document {} lists section {key} as both required and optional",
                contract.name
            )));
        }
    }

    for (index, contract) in file.documents.iter().enumerate() {
        if let Some(other) = file.documents[index + 1..]
            .iter()
            .find(|other| other.template_ids == contract.template_ids)
        {
            return Err(StandardsError::invalid(format!(
                "documents {} and {} declare the same template set",
                contract.name, other.name
            )));
        }
    }
    Ok(())
}
