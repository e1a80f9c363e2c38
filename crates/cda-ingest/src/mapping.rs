//! CDA R2 element tree to typed nodes.

use cda_model::{
    CodedValue, Custodian, DocumentHeader, ExternalId, ExternalReference, Node, NodeKind,
    ParseIssue, Participant, ProviderRole, ReferenceType, Status, TimeInterval, TypedValue,
};
use tracing::debug;

use crate::timestamp::parse_hl7_timestamp;
use crate::xml::Element;

/// Participations mapped into the header, in the order they are scanned.
const PARTICIPATIONS: &[(&str, &str)] = &[
    ("author", "assignedAuthor"),
    ("dataEnterer", "assignedEntity"),
    ("informant", "assignedEntity"),
    ("legalAuthenticator", "assignedEntity"),
    ("authenticator", "assignedEntity"),
];

/// External act flavours a `reference` can point at.
const EXTERNAL_TARGETS: &[&str] = &[
    "externalDocument",
    "externalAct",
    "externalObservation",
    "externalProcedure",
];

pub(crate) struct Mapper {
    issues: Vec<ParseIssue>,
}

impl Mapper {
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    pub fn into_issues(self) -> Vec<ParseIssue> {
        self.issues
    }

    fn warn(&mut self, message: impl Into<String>, path: &str) {
        self.issues.push(ParseIssue::warning(message, path));
    }

    pub fn header(&mut self, document: &Element) -> DocumentHeader {
        let path = "ClinicalDocument";
        let mut header = DocumentHeader {
            id: document.child("id").and_then(external_id),
            code: document.child("code").and_then(coded_value),
            title: document.child("title").and_then(Element::non_empty_text),
            effective_time: self.timestamp_attr(document.child("effectiveTime"), path),
            confidentiality: document
                .child("confidentialityCode")
                .and_then(|code| code.attr("code"))
                .map(str::to_string),
            ..DocumentHeader::default()
        };

        header.patient_id = document
            .path("recordTarget/patientRole/id")
            .and_then(external_id);
        if header.patient_id.is_none() {
            self.warn("document has no recordTarget patient id", path);
        }

        for (element, assigned) in PARTICIPATIONS {
            for participation in document.children_named(element) {
                let entity = participation.child(assigned);
                header.participants.push(Participant {
                    role: ProviderRole::from_element(element),
                    id: entity.and_then(|entity| entity.child("id")).and_then(external_id),
                    name: entity.and_then(person_name),
                    time: self.timestamp_attr(participation.child("time"), element),
                });
            }
        }

        header.custodian = document
            .path("custodian/assignedCustodian/representedCustodianOrganization")
            .map(|organization| Custodian {
                id: organization.child("id").and_then(external_id),
                name: organization.child("name").and_then(Element::non_empty_text),
            });

        header.service_event = document
            .path("documentationOf/serviceEvent/effectiveTime")
            .map(|time| self.interval(time, "documentationOf/serviceEvent"))
            .filter(|interval| !interval.is_empty());
        header
    }

    pub fn document(&mut self, document: &Element) -> Node {
        let mut node = self.common(NodeKind::Document, document, "ClinicalDocument");
        node.title = document.child("title").and_then(Element::non_empty_text);

        match document.path("component/structuredBody") {
            Some(body) => {
                for component in body.children_named("component") {
                    for section in component.children_named("section") {
                        let child = self.section(section, "structuredBody/component/section");
                        node.children.push(child);
                    }
                }
            }
            None if document.path("component/nonXMLBody").is_some() => {
                self.issues.push(ParseIssue::error(
                    "unstructured (nonXMLBody) documents are not supported",
                    "ClinicalDocument/component/nonXMLBody",
                ));
            }
            None => self.warn("document has no structuredBody", "ClinicalDocument"),
        }
        node
    }

    fn section(&mut self, element: &Element, path: &str) -> Node {
        let mut node = self.common(NodeKind::Section, element, path);
        node.title = element.child("title").and_then(Element::non_empty_text);
        node.text = element.child("text").and_then(Element::non_empty_text);

        for child in element.children() {
            match child.name.as_str() {
                "entry" => self.entry(child, &mut node, path),
                "component" => {
                    for section in child.children_named("section") {
                        let sub = self.section(section, &format!("{path}/component/section"));
                        node.children.push(sub);
                    }
                }
                _ => {}
            }
        }
        node
    }

    fn entry(&mut self, entry: &Element, parent: &mut Node, path: &str) {
        let relationship = entry.attr("typeCode").unwrap_or("COMP");
        let mut found = false;
        for statement in entry.children() {
            if let Some(node) = self.statement(statement, relationship, &format!("{path}/entry")) {
                parent.children.push(node);
                found = true;
            }
        }
        if !found {
            self.warn("entry carries no supported clinical statement", path);
        }
    }

    fn statement(&mut self, element: &Element, relationship: &str, path: &str) -> Option<Node> {
        let kind = match element.name.as_str() {
            "act" => NodeKind::Act,
            "observation" => NodeKind::Observation,
            "organizer" => NodeKind::Organizer,
            "procedure" => NodeKind::Procedure,
            "substanceAdministration" => NodeKind::SubstanceAdministration,
            "encounter" => NodeKind::Encounter,
            _ => return None,
        };
        let path = format!("{path}/{}", element.name);
        let mut node = self.common(kind, element, &path);
        node.relationship = Some(relationship.to_string());
        node.negated = element
            .attr("negationInd")
            .is_some_and(|flag| flag.eq_ignore_ascii_case("true"));
        node.text = element.child("text").and_then(Element::non_empty_text);
        if let Some(value) = element.child("value") {
            node.value = self.value(value, &path);
        }

        for child in element.children() {
            match child.name.as_str() {
                "component" if kind == NodeKind::Organizer => {
                    let type_code = child.attr("typeCode").unwrap_or("COMP");
                    for nested in child.children() {
                        if let Some(nested) = self.statement(nested, type_code, &path) {
                            node.children.push(nested);
                        }
                    }
                }
                "entryRelationship" => {
                    let type_code = child.attr("typeCode").unwrap_or("COMP");
                    for nested in child.children() {
                        if let Some(nested) = self.statement(nested, type_code, &path) {
                            node.children.push(nested);
                        }
                    }
                }
                "reference" => {
                    if let Some((reference, child_node)) = self.reference(child, &path) {
                        node.references.push(reference);
                        node.children.push(child_node);
                    }
                }
                _ => {}
            }
        }
        Some(node)
    }

    fn reference(&mut self, element: &Element, path: &str) -> Option<(ExternalReference, Node)> {
        let type_code = ReferenceType::from_code(element.attr("typeCode").unwrap_or(""));
        let target = element
            .children()
            .find(|child| EXTERNAL_TARGETS.contains(&child.name.as_str()));
        let Some(id) = target.and_then(|target| target.child("id")).and_then(external_id) else {
            self.warn(
                format!("{} reference without an external id", type_code.code()),
                &format!("{path}/reference"),
            );
            return None;
        };
        let mut node = Node::new(NodeKind::ExternalReference)
            .with_id(id.clone())
            .with_relationship(type_code.code());
        if let Some(target) = target {
            node.template_ids = target
                .children_named("templateId")
                .filter_map(|template| template.attr("root"))
                .collect();
            node.code = target.child("code").and_then(coded_value);
        }
        Some((ExternalReference { type_code, id }, node))
    }

    fn common(&mut self, kind: NodeKind, element: &Element, path: &str) -> Node {
        let mut node = Node::new(kind);
        node.template_ids = element
            .children_named("templateId")
            .filter_map(|template| template.attr("root"))
            .collect();
        node.id = element.child("id").and_then(external_id);
        node.code = element.child("code").and_then(coded_value);
        node.status = element
            .child("statusCode")
            .and_then(|status| status.attr("code"))
            .map(Status::from_code);
        node.effective_time = element
            .child("effectiveTime")
            .map(|time| self.interval(time, path))
            .filter(|interval| !interval.is_empty());
        node
    }

    fn value(&mut self, element: &Element, path: &str) -> Option<TypedValue> {
        let value_type = element.attr("type").unwrap_or("ST").to_ascii_uppercase();
        let path = format!("{path}/value");
        match value_type.as_str() {
            "PQ" | "INT" | "REAL" => {
                let raw = element.attr("value")?;
                match finite_number(raw) {
                    Some(value) => Some(TypedValue::Numeric {
                        value,
                        unit: element
                            .attr("unit")
                            .filter(|unit| *unit != "1")
                            .map(str::to_string),
                    }),
                    None => {
                        self.warn(format!("non-numeric {value_type} value `{raw}`"), &path);
                        None
                    }
                }
            }
            "CD" | "CE" | "CV" | "CO" => match coded_value(element) {
                Some(coded) => Some(TypedValue::Coded(coded)),
                None => {
                    let original = element
                        .child("originalText")
                        .and_then(Element::non_empty_text);
                    if original.is_none() {
                        self.warn("coded value without code or original text", &path);
                    }
                    original.map(TypedValue::Text)
                }
            },
            "TS" => {
                let raw = element.attr("value")?;
                match parse_hl7_timestamp(raw) {
                    Some(at) => Some(TypedValue::Timestamp(at)),
                    None => {
                        self.warn(format!("unparseable timestamp `{raw}`"), &path);
                        None
                    }
                }
            }
            "ED" => element.non_empty_text().map(|data| TypedValue::Complex {
                media_type: element.attr("mediaType").map(str::to_string),
                data,
            }),
            "RTO" | "RTO_PQ_PQ" | "RTO_INT_INT" => {
                let part = |name: &str| {
                    element
                        .child(name)
                        .and_then(|part| part.attr("value"))
                        .and_then(finite_number)
                };
                match (part("numerator"), part("denominator")) {
                    (Some(numerator), Some(denominator)) => Some(TypedValue::Ratio {
                        numerator,
                        denominator,
                    }),
                    _ => {
                        self.warn("ratio without numeric numerator and denominator", &path);
                        None
                    }
                }
            }
            "BL" => element
                .attr("value")
                .map(|flag| TypedValue::Text(flag.to_string())),
            "ST" => element.non_empty_text().map(TypedValue::Text),
            other => {
                debug!(value_type = other, path = %path, "unsupported value type read as text");
                self.warn(format!("unsupported value type {other}"), &path);
                element.non_empty_text().map(TypedValue::Text)
            }
        }
    }

    fn interval(&mut self, element: &Element, path: &str) -> TimeInterval {
        let path = format!("{path}/effectiveTime");
        let mut interval = TimeInterval {
            center: self.timestamp_attr(Some(element), &path),
            ..TimeInterval::default()
        };
        interval.low = self.timestamp_attr(element.child("low"), &path);
        interval.high = self.timestamp_attr(element.child("high"), &path);
        if interval.center.is_none() {
            interval.center = self.timestamp_attr(element.child("center"), &path);
        }
        interval
    }

    fn timestamp_attr(
        &mut self,
        element: Option<&Element>,
        path: &str,
    ) -> Option<chrono::DateTime<chrono::Utc>> {
        let raw = element?.attr("value")?;
        let parsed = parse_hl7_timestamp(raw);
        if parsed.is_none() {
            self.warn(format!("unparseable timestamp `{raw}`"), path);
        }
        parsed
    }
}

fn external_id(element: &Element) -> Option<ExternalId> {
    let root = element.attr("root")?;
    let mut id = ExternalId::new(root.trim());
    if let Some(extension) = element.attr("extension") {
        id = id.with_extension(extension.trim());
    }
    Some(id)
}

/// Decimal literal as a finite number. `f64` parsing also accepts `NaN` and
/// `inf`, which are not HL7 numbers.
fn finite_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn coded_value(element: &Element) -> Option<CodedValue> {
    let code = element.attr("code")?;
    let system = element.attr("codeSystem")?;
    let mut coded = CodedValue::new(code.trim(), system.trim());
    if let Some(display) = element.attr("displayName") {
        coded = coded.with_display_name(display.trim());
    }
    if let Some(name) = element.attr("codeSystemName") {
        coded = coded.with_code_system_name(name.trim());
    }
    Some(coded)
}

fn person_name(entity: &Element) -> Option<String> {
    let name = entity
        .child("assignedPerson")
        .or_else(|| entity.child("representedOrganization"))?
        .child("name")?;
    let given: Vec<String> = name
        .children_named("given")
        .filter_map(Element::non_empty_text)
        .collect();
    let family = name.child("family").and_then(Element::non_empty_text);
    let parts: Vec<String> = given.into_iter().chain(family).collect();
    if parts.is_empty() {
        name.non_empty_text()
    } else {
        Some(parts.join(" "))
    }
}
