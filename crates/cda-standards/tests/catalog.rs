use std::io::Write;

use cda_model::TemplateIdSet;
use cda_standards::{SectionRequirement, StandardsError, TemplateCatalog, ids};

fn bundled() -> TemplateCatalog {
    TemplateCatalog::bundled().expect("bundled catalog")
}

#[test]
fn medical_summary_contract_matches_exact_set() {
    let catalog = bundled();
    let declared = TemplateIdSet::from_ids(ids::MEDICAL_SUMMARY_DOCUMENT.iter().copied());
    let contract = catalog.contract_for(&declared).expect("medical summary");
    assert_eq!(contract.name, "Medical Summary");

    let mut superset = declared.clone();
    superset.insert("9.9.9");
    assert!(catalog.contract_for(&superset).is_none());
}

#[test]
fn specialized_section_satisfies_required_parent() {
    let catalog = bundled();
    let document = TemplateIdSet::from_ids(ids::MEDICAL_SUMMARY_DOCUMENT.iter().copied());
    let contract = catalog.contract_for(&document);

    let problems = TemplateIdSet::from_ids(ids::ACTIVE_PROBLEMS_SECTION.iter().copied());
    assert_eq!(
        catalog.section_requirement(contract, &problems),
        SectionRequirement::Required
    );

    let coded_vitals = TemplateIdSet::from_ids(ids::CODED_VITAL_SIGNS_SECTION.iter().copied());
    assert_eq!(
        catalog.section_requirement(contract, &coded_vitals),
        SectionRequirement::Optional
    );
}

#[test]
fn unlisted_sections_are_optional_only_under_a_contract() {
    let catalog = bundled();
    let unknown = TemplateIdSet::from_ids(["1.2.3.4"]);
    assert_eq!(
        catalog.section_requirement(None, &unknown),
        SectionRequirement::Required
    );
    let document = TemplateIdSet::from_ids(ids::MEDICAL_SUMMARY_DOCUMENT.iter().copied());
    assert_eq!(
        catalog.section_requirement(catalog.contract_for(&document), &unknown),
        SectionRequirement::Optional
    );
}

#[test]
fn reports_missing_required_sections() {
    let catalog = bundled();
    let document = TemplateIdSet::from_ids(ids::MEDICAL_SUMMARY_DOCUMENT.iter().copied());
    let contract = catalog.contract_for(&document).expect("contract");
    let vitals = TemplateIdSet::from_ids(ids::VITAL_SIGNS_SECTION.iter().copied());

    let missing = catalog.missing_required_sections(contract, [&vitals]);
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].key, "active_problems");

    let problems = TemplateIdSet::from_ids(ids::ACTIVE_PROBLEMS_SECTION.iter().copied());
    assert!(catalog.missing_required_sections(contract, [&vitals, &problems]).is_empty());
}

#[test]
fn loads_catalog_from_disk() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"
[catalog]
schema = "cda-import.template-catalog"
schema_version = 1

[[sections]]
key = "notes"
name = "Notes"
template_ids = ["1.2.3.4.5"]

[[documents]]
name = "Note"
template_ids = ["1.2.3"]
required_sections = ["notes"]

[[code_systems]]
oid = "1.2.3.99"
name = "Local"
"#
    )
    .expect("write catalog");

    let catalog = TemplateCatalog::load(file.path()).expect("load catalog");
    assert_eq!(catalog.code_system_name("1.2.3.99"), Some("Local"));
    assert!(catalog.code_system_name(ids::LOINC).is_none());
}

#[test]
fn rejects_wrong_schema() {
    let error = TemplateCatalog::from_toml_str(
        "[catalog]\nschema = \"other\"\nschema_version = 1\n",
        std::path::Path::new("other.toml"),
    )
    .expect_err("wrong schema");
    assert!(matches!(error, StandardsError::InvalidCatalog { .. }));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let error = TemplateCatalog::load(&dir.path().join("absent.toml")).expect_err("missing");
    assert!(matches!(error, StandardsError::Io { .. }));
}
