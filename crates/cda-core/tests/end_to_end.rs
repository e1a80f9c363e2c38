//! Full pipeline over the shared XML fixtures.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use cda_core::{
    ConceptStore, Importer, InMemoryConceptStore, InMemoryRecordRepository, RecordRepository,
    Subscription, VocabularyResolver, default_registry,
};
use cda_ingest::XmlDocumentParser;
use cda_model::{
    ActiveList, FragmentBody, FragmentKind, ImportError, ImportPolicy, ObsValue, PatientScope,
    ProviderRole, Status,
};
use cda_standards::{TemplateCatalog, ids};
use chrono::{TimeZone, Utc};

fn fixture(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(name);
    std::fs::read(&path).unwrap_or_else(|error| panic!("read {}: {error}", path.display()))
}

fn importer() -> (Importer, Arc<InMemoryRecordRepository>, Arc<InMemoryConceptStore>) {
    let repository = Arc::new(InMemoryRecordRepository::new());
    let concepts = Arc::new(InMemoryConceptStore::new());
    let importer = Importer::new(
        default_registry().expect("registry"),
        Arc::new(TemplateCatalog::bundled().expect("catalog")),
        ImportPolicy::default(),
        Arc::new(XmlDocumentParser::new()),
        Arc::clone(&repository) as Arc<dyn RecordRepository>,
        Arc::new(VocabularyResolver::new(
            Arc::clone(&concepts) as Arc<dyn ConceptStore>
        )),
    );
    (importer, repository, concepts)
}

fn scope() -> PatientScope {
    PatientScope::new("MRN-77")
}

#[test]
fn medical_summary_imports_cleanly() {
    let (importer, repository, _) = importer();
    let imported = importer
        .import_document(&fixture("medical_summary.xml"), &scope())
        .expect("import");
    assert!(imported.warnings.is_empty(), "{}", imported.warnings);
    assert_eq!(repository.len(), 1);

    let root = imported.root();
    let FragmentBody::Visit(visit) = &root.body else {
        panic!("root is not a visit: {:?}", root.kind());
    };
    assert_eq!(
        visit.document_id.as_deref(),
        Some("2.16.840.1.113883.19.4^doc-2024-0042")
    );
    assert_eq!(visit.location.as_deref(), Some("Good Health Clinic"));
    assert_eq!(visit.start, Utc.with_ymd_and_hms(2024, 3, 14, 0, 0, 0).single());
    assert_eq!(visit.stop, Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).single());
    assert_eq!(visit.confidentiality.as_deref(), Some("N"));
    let author = visit
        .providers
        .iter()
        .find(|provider| provider.role == ProviderRole::Author)
        .expect("author");
    assert_eq!(author.name.as_deref(), Some("Grace Hopper"));

    let titles: Vec<Option<&str>> = root
        .children
        .iter()
        .map(|section| match &section.body {
            FragmentBody::Section(record) => record.title.as_deref(),
            _ => None,
        })
        .collect();
    assert_eq!(
        titles,
        vec![Some("Active Problems"), Some("Vital Signs"), Some("Encounters")]
    );

    // Problem list: the concern act adds nothing of its own.
    let problems = &root.children[0];
    assert_eq!(problems.children.len(), 1);
    let FragmentBody::ActiveListItem(problem) = &problems.children[0].body else {
        panic!("expected an active list item");
    };
    assert_eq!(problem.list, ActiveList::Problems);
    assert_eq!(problem.concept.name, "Essential hypertension");
    assert_eq!(problem.status, Some(Status::Active));
    assert_eq!(problem.start, Utc.with_ymd_and_hms(2019, 6, 10, 0, 0, 0).single());

    // Vital signs: one unversioned group holding both readings in order.
    let vitals = &root.children[1];
    assert_eq!(vitals.children.len(), 1);
    let group = &vitals.children[0];
    assert_eq!(group.kind(), FragmentKind::Obs);
    assert!(group.accession_number().is_none());
    let readings: Vec<(&str, Option<&ObsValue>)> = group
        .children
        .iter()
        .filter_map(|child| child.as_obs())
        .map(|obs| (obs.concept.name.as_str(), obs.value.as_ref()))
        .collect();
    assert_eq!(
        readings,
        vec![
            (
                "Systolic blood pressure",
                Some(&ObsValue::Numeric {
                    value: 120.0,
                    unit: Some("mm[Hg]".to_string()),
                })
            ),
            (
                "Diastolic blood pressure",
                Some(&ObsValue::Numeric {
                    value: 80.0,
                    unit: Some("mm[Hg]".to_string()),
                })
            ),
        ]
    );
    let systolic = group.children[0].as_obs().expect("systolic");
    assert_eq!(
        systolic.obs_datetime,
        Utc.with_ymd_and_hms(2024, 3, 14, 7, 30, 0).single()
    );
    assert_eq!(systolic.encounter, Some(root.id));

    let encounters = &root.children[2];
    let FragmentBody::Encounter(encounter) = &encounters.children[0].body else {
        panic!("expected an encounter");
    };
    assert_eq!(
        encounter.encounter_type.as_ref().map(|concept| concept.name.as_str()),
        Some("Ambulatory")
    );
    assert_eq!(
        encounter.accession_number.as_deref(),
        Some("2.16.840.1.113883.19.10^enc-1")
    );
}

#[test]
fn amended_document_supersedes_the_original_reading() {
    let (importer, repository, _) = importer();
    let original = importer
        .import_document(&fixture("medical_summary.xml"), &scope())
        .expect("original");
    let systolic_id = original
        .root()
        .iter()
        .find(|fragment| {
            fragment.accession_number() == Some("2.16.840.1.113883.19.9^bp-systolic-1")
        })
        .map(|fragment| fragment.id)
        .expect("systolic");

    let amended = importer
        .import_document(&fixture("medical_summary_amended.xml"), &scope())
        .expect("amended");
    assert!(amended.warnings.is_empty(), "{}", amended.warnings);
    assert_eq!(amended.record.voided, vec![systolic_id]);

    let replacement = amended
        .root()
        .iter()
        .find(|fragment| {
            fragment.accession_number() == Some("2.16.840.1.113883.19.9^bp-systolic-2")
        })
        .expect("replacement");
    assert_eq!(replacement.previous_version(), Some(systolic_id));
    assert_eq!(
        replacement.as_obs().and_then(|obs| obs.value.clone()),
        Some(ObsValue::Numeric {
            value: 118.0,
            unit: Some("mm[Hg]".to_string()),
        })
    );

    assert!(repository.fragment(systolic_id).expect("kept").is_voided());
    assert!(
        repository
            .find_by_accession("2.16.840.1.113883.19.9^bp-systolic-1", &scope())
            .expect("lookup")
            .is_none()
    );

    // Replaying the amendment finds its target already voided and collides
    // with its own earlier import.
    let error = importer
        .import_document(&fixture("medical_summary_amended.xml"), &scope())
        .expect_err("replay");
    assert!(matches!(error, ImportError::DuplicateEntry { .. }));
}

#[test]
fn unknown_templates_fall_back_with_warnings() {
    let (importer, _, concepts) = importer();
    let imported = importer
        .import_document(&fixture("unknown_templates.xml"), &PatientScope::new("P-9"))
        .expect("import");
    let codes: Vec<&str> = imported
        .warnings
        .iter()
        .map(|issue| issue.code.as_str())
        .collect();
    assert_eq!(
        codes,
        vec![
            "unrecognized-template",
            "unrecognized-template",
            "unrecognized-template"
        ]
    );
    let obs = imported
        .root()
        .iter()
        .find_map(|fragment| fragment.as_obs())
        .expect("obs");
    assert_eq!(obs.concept.name, "Body temperature");
    assert_eq!(concepts.len(), 1);
}

#[test]
fn template_subscribers_see_matching_documents_only() {
    let (importer, _, _) = importer();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    importer
        .subscribe(
            Subscription::template(ids::PROBLEM_OBSERVATION[0]),
            move |document, _| {
                let title = document.header.title.clone().unwrap_or_default();
                log.lock().expect("log").push(title);
            },
        )
        .expect("subscribe");

    importer
        .import_document(&fixture("medical_summary.xml"), &scope())
        .expect("summary");
    importer
        .import_document(&fixture("medical_summary_amended.xml"), &scope())
        .expect("amended");

    assert_eq!(*seen.lock().expect("seen"), vec!["Medical Summary".to_string()]);
}

#[test]
fn unstructured_body_is_rejected() {
    let (importer, repository, _) = importer();
    let xml = br#"<ClinicalDocument xmlns="urn:hl7-org:v3">
  <id root="2.16.840.1.999.4"/>
  <recordTarget><patientRole><id root="2.16.840.1.999.5" extension="P-1"/></patientRole></recordTarget>
  <component><nonXMLBody><text mediaType="application/pdf">JVBERi0=</text></nonXMLBody></component>
</ClinicalDocument>"#;
    let error = importer
        .import_document(xml, &PatientScope::new("P-1"))
        .expect_err("nonXMLBody");
    assert!(matches!(error, ImportError::Parse(_)));
    assert!(repository.is_empty());
}
