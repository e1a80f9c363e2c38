use std::path::PathBuf;

use cda_ingest::{DocumentParser, ParsedDocument, XmlDocumentParser};
use cda_model::{
    CodedValue, ExternalId, IssueSeverity, NodeKind, ParseError, ReferenceType, Status,
    TypedValue,
};
use chrono::{TimeZone, Utc};

fn fixture(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(name);
    std::fs::read(&path).unwrap_or_else(|error| panic!("read {}: {error}", path.display()))
}

fn parse(xml: &str) -> ParsedDocument {
    XmlDocumentParser::new()
        .parse(xml.as_bytes())
        .expect("parse")
}

/// Wrap a single entry statement in a minimal document.
fn with_entry(statement: &str) -> String {
    format!(
        r#"<ClinicalDocument xmlns="urn:hl7-org:v3" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <id root="2.16.840.1.999.4"/>
  <recordTarget><patientRole><id root="2.16.840.1.999.5" extension="P-1"/></patientRole></recordTarget>
  <component><structuredBody><component><section>
    <title>Results</title>
    <entry>{statement}</entry>
  </section></component></structuredBody></component>
</ClinicalDocument>"#
    )
}

fn first_value(xml: &str) -> (Option<TypedValue>, ParsedDocument) {
    let parsed = parse(&with_entry(xml));
    let value = parsed.root.children[0].children[0].value.clone();
    (value, parsed)
}

#[test]
fn header_is_mapped_from_the_fixture() {
    let parsed = XmlDocumentParser::new()
        .parse(&fixture("medical_summary.xml"))
        .expect("parse");
    assert!(parsed.issues.is_empty(), "{:?}", parsed.issues);

    let header = &parsed.header;
    assert_eq!(
        header.id,
        Some(ExternalId::new("2.16.840.1.113883.19.4").with_extension("doc-2024-0042"))
    );
    assert_eq!(header.title.as_deref(), Some("Medical Summary"));
    assert_eq!(
        header.effective_time,
        Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).single()
    );
    assert_eq!(
        header.patient_id,
        Some(ExternalId::new("2.16.840.1.113883.19.5").with_extension("MRN-77"))
    );
    assert_eq!(header.confidentiality.as_deref(), Some("N"));
    assert_eq!(
        header.custodian.as_ref().and_then(|custodian| custodian.name.as_deref()),
        Some("Good Health Clinic")
    );
    let authors: Vec<_> = header.authors().collect();
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].name.as_deref(), Some("Grace Hopper"));
    let service = header.service_event.as_ref().expect("service event");
    assert_eq!(service.low, Utc.with_ymd_and_hms(2024, 3, 14, 0, 0, 0).single());
    assert_eq!(service.high, Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).single());
}

#[test]
fn body_becomes_a_typed_tree() {
    let parsed = XmlDocumentParser::new()
        .parse(&fixture("medical_summary.xml"))
        .expect("parse");
    let root = &parsed.root;
    assert_eq!(root.kind, NodeKind::Document);
    assert_eq!(root.template_ids.len(), 3);
    assert_eq!(root.children.len(), 3);
    assert!(
        root.children
            .iter()
            .all(|section| section.kind == NodeKind::Section)
    );

    let problems = &root.children[0];
    assert_eq!(problems.title.as_deref(), Some("Active Problems"));
    assert_eq!(
        problems.text.as_deref(),
        Some("Essential hypertension, since 2019")
    );
    let concern = &problems.children[0];
    assert_eq!(concern.kind, NodeKind::Act);
    assert_eq!(concern.relationship.as_deref(), Some("DRIV"));
    assert_eq!(concern.status, Some(Status::Active));
    assert!(concern.code.is_none(), "nullFlavor code carries nothing");
    let problem = &concern.children[0];
    assert_eq!(problem.relationship.as_deref(), Some("SUBJ"));
    assert_eq!(
        problem.value,
        Some(TypedValue::Coded(
            CodedValue::new("59621000", "2.16.840.1.113883.6.96")
                .with_display_name("Essential hypertension")
        ))
    );

    let organizer = &root.children[1].children[0];
    assert_eq!(organizer.kind, NodeKind::Organizer);
    let codes: Vec<&str> = organizer
        .children
        .iter()
        .filter_map(|child| child.code.as_ref())
        .map(|code| code.code.as_str())
        .collect();
    assert_eq!(codes, vec!["8480-6", "8462-4"]);
    assert_eq!(
        organizer.children[0].value,
        Some(TypedValue::quantity(120.0, "mm[Hg]"))
    );

    let encounter = &root.children[2].children[0];
    assert_eq!(encounter.kind, NodeKind::Encounter);
    let interval = encounter.effective_time.as_ref().expect("interval");
    assert_eq!(interval.low, Utc.with_ymd_and_hms(2024, 3, 14, 7, 30, 0).single());
    assert_eq!(interval.high, Utc.with_ymd_and_hms(2024, 3, 14, 8, 15, 0).single());

    // Document order is preserved by the depth-first iterator.
    let kinds: Vec<NodeKind> = root.iter().map(|node| node.kind).collect();
    assert_eq!(
        kinds,
        vec![
            NodeKind::Document,
            NodeKind::Section,
            NodeKind::Act,
            NodeKind::Observation,
            NodeKind::Section,
            NodeKind::Organizer,
            NodeKind::Observation,
            NodeKind::Observation,
            NodeKind::Section,
            NodeKind::Encounter,
        ]
    );
}

#[test]
fn replacement_reference_becomes_a_child_node() {
    let parsed = XmlDocumentParser::new()
        .parse(&fixture("medical_summary_amended.xml"))
        .expect("parse");
    let systolic = &parsed.root.children[0].children[0].children[0];
    assert_eq!(systolic.references.len(), 1);
    let reference = &systolic.references[0];
    assert_eq!(reference.type_code, ReferenceType::Replaces);
    assert_eq!(
        reference.id,
        ExternalId::new("2.16.840.1.113883.19.9").with_extension("bp-systolic-1")
    );
    assert_eq!(systolic.replacement_references().count(), 1);

    let child = systolic
        .children
        .iter()
        .find(|child| child.kind == NodeKind::ExternalReference)
        .expect("reference node");
    assert_eq!(child.id.as_ref(), Some(&reference.id));
    assert_eq!(child.relationship.as_deref(), Some("RPLC"));
}

#[test]
fn value_types_are_read() {
    let (value, _) = first_value(
        r#"<observation><code code="x" codeSystem="1.2"/><value xsi:type="INT" value="3"/></observation>"#,
    );
    assert_eq!(
        value,
        Some(TypedValue::Numeric {
            value: 3.0,
            unit: None,
        })
    );

    let (value, _) = first_value(
        r#"<observation><value xsi:type="PQ" value="2" unit="1"/></observation>"#,
    );
    assert_eq!(
        value,
        Some(TypedValue::Numeric {
            value: 2.0,
            unit: None,
        })
    );

    let (value, _) = first_value(
        r#"<observation><value xsi:type="TS" value="20240101120000"/></observation>"#,
    );
    assert_eq!(
        value,
        Some(TypedValue::Timestamp(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
                .single()
                .expect("time")
        ))
    );

    let (value, _) = first_value(
        r#"<observation><value xsi:type="RTO_PQ_PQ"><numerator value="1"/><denominator value="40"/></value></observation>"#,
    );
    assert_eq!(
        value,
        Some(TypedValue::Ratio {
            numerator: 1.0,
            denominator: 40.0,
        })
    );

    let (value, _) = first_value(
        r#"<observation><value xsi:type="ED" mediaType="text/plain">free &amp; easy</value></observation>"#,
    );
    assert_eq!(
        value,
        Some(TypedValue::Complex {
            media_type: Some("text/plain".to_string()),
            data: "free & easy".to_string(),
        })
    );

    let (value, _) = first_value(
        r#"<observation><value xsi:type="CD" nullFlavor="OTH"><originalText>Lower back pain</originalText></value></observation>"#,
    );
    assert_eq!(value, Some(TypedValue::Text("Lower back pain".to_string())));

    let (value, _) = first_value(r#"<observation><value xsi:type="BL" value="true"/></observation>"#);
    assert_eq!(value, Some(TypedValue::Text("true".to_string())));
}

#[test]
fn unreadable_values_become_warnings() {
    let (value, parsed) = first_value(
        r#"<observation><value xsi:type="PQ" value="high" unit="mm[Hg]"/></observation>"#,
    );
    assert!(value.is_none());
    assert_eq!(parsed.issues.len(), 1);
    assert_eq!(parsed.issues[0].severity, IssueSeverity::Warning);
    assert!(parsed.issues[0].message.contains("high"));
    assert!(!parsed.has_errors());

    let (value, parsed) = first_value(
        r#"<observation><value xsi:type="IVL_PQ">5</value></observation>"#,
    );
    assert_eq!(value, Some(TypedValue::Text("5".to_string())));
    assert!(parsed.issues[0].message.contains("IVL_PQ"));
}

#[test]
fn non_finite_numbers_are_not_values() {
    for raw in ["NaN", "inf", "-Infinity"] {
        let (value, parsed) = first_value(&format!(
            r#"<observation><value xsi:type="PQ" value="{raw}" unit="mm[Hg]"/></observation>"#
        ));
        assert!(value.is_none(), "{raw}");
        assert_eq!(parsed.issues.len(), 1, "{raw}");
        assert!(parsed.issues[0].message.contains("non-numeric"), "{raw}");
    }

    let (value, parsed) = first_value(
        r#"<observation><value xsi:type="RTO"><numerator value="1"/><denominator value="inf"/></value></observation>"#,
    );
    assert!(value.is_none());
    assert!(parsed.issues[0].message.contains("ratio"));
}

#[test]
fn negation_and_unknown_statements() {
    let parsed = parse(&with_entry(
        r#"<observation negationInd="true"><code code="x" codeSystem="1.2"/></observation>"#,
    ));
    assert!(parsed.root.children[0].children[0].negated);

    let parsed = parse(&with_entry(r#"<supply><id root="1.2"/></supply>"#));
    assert!(parsed.root.children[0].children.is_empty());
    assert!(
        parsed
            .issues
            .iter()
            .any(|issue| issue.message.contains("no supported clinical statement"))
    );
}

#[test]
fn missing_patient_is_a_warning() {
    let parsed = parse(
        r#"<ClinicalDocument><id root="1.2"/><component><structuredBody/></component></ClinicalDocument>"#,
    );
    assert!(parsed.header.patient_id.is_none());
    assert!(
        parsed
            .issues
            .iter()
            .any(|issue| issue.message.contains("patient id"))
    );
    assert!(!parsed.has_errors());
}

#[test]
fn nonxml_body_is_an_error_issue() {
    let parsed = parse(
        r#"<ClinicalDocument><recordTarget><patientRole><id root="1.2"/></patientRole></recordTarget><component><nonXMLBody><text>x</text></nonXMLBody></component></ClinicalDocument>"#,
    );
    assert!(parsed.has_errors());
    assert!(parsed.root.children.is_empty());
}

#[test]
fn structural_failures_are_parse_errors() {
    let parser = XmlDocumentParser::new();
    assert!(matches!(
        parser.parse(b"<Other/>"),
        Err(ParseError::UnexpectedRoot { found }) if found == "Other"
    ));
    assert!(matches!(
        parser.parse(b"<ClinicalDocument><id></ClinicalDocument>"),
        Err(ParseError::Malformed { .. })
    ));
    assert!(matches!(parser.parse(b""), Err(ParseError::Empty)));
}
