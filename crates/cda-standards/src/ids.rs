//! Well-known template identifiers understood by the bundled processors.
//!
//! Sets are listed the way conforming documents declare them; dispatch
//! compares whole sets, so each constant is the complete declared set.

/// HL7 CDA general header constraints.
pub const HL7_GENERAL_HEADER: &str = "2.16.840.1.113883.10.20.3";
/// IHE PCC Medical Documents.
pub const IHE_MEDICAL_DOCUMENTS: &str = "1.3.6.1.4.1.19376.1.5.3.1.1.1";
/// IHE PCC Medical Summary.
pub const IHE_MEDICAL_SUMMARY: &str = "1.3.6.1.4.1.19376.1.5.3.1.1.2";
/// HL7 Continuity of Care Document.
pub const CCD_DOCUMENT: &str = "2.16.840.1.113883.10.20.1";

pub const MEDICAL_SUMMARY_DOCUMENT: &[&str] = &[
    HL7_GENERAL_HEADER,
    IHE_MEDICAL_DOCUMENTS,
    IHE_MEDICAL_SUMMARY,
];
pub const CCD_DOCUMENT_SET: &[&str] = &[CCD_DOCUMENT];

pub const IHE_VITAL_SIGNS_SECTION: &str = "1.3.6.1.4.1.19376.1.5.3.1.3.25";
pub const IHE_CODED_VITAL_SIGNS_SECTION: &str = "1.3.6.1.4.1.19376.1.5.3.1.1.5.3.2";

pub const VITAL_SIGNS_SECTION: &[&str] = &[IHE_VITAL_SIGNS_SECTION];
/// Coded Vital Signs is a specialization and declares both ids.
pub const CODED_VITAL_SIGNS_SECTION: &[&str] =
    &[IHE_VITAL_SIGNS_SECTION, IHE_CODED_VITAL_SIGNS_SECTION];

pub const VITAL_SIGNS_ORGANIZER: &[&str] = &[
    "1.3.6.1.4.1.19376.1.5.3.1.4.13.1",
    "2.16.840.1.113883.10.20.1.32",
    "2.16.840.1.113883.10.20.1.35",
];

pub const VITAL_SIGN_OBSERVATION: &[&str] = &[
    "1.3.6.1.4.1.19376.1.5.3.1.4.13",
    "1.3.6.1.4.1.19376.1.5.3.1.4.13.2",
    "2.16.840.1.113883.10.20.1.31",
];

pub const ACTIVE_PROBLEMS_SECTION: &[&str] = &[
    "1.3.6.1.4.1.19376.1.5.3.1.3.6",
    "2.16.840.1.113883.10.20.1.11",
];

pub const PROBLEM_CONCERN_ENTRY: &[&str] = &[
    "1.3.6.1.4.1.19376.1.5.3.1.4.5.1",
    "1.3.6.1.4.1.19376.1.5.3.1.4.5.2",
    "2.16.840.1.113883.10.20.1.27",
];

pub const PROBLEM_OBSERVATION: &[&str] = &[
    "1.3.6.1.4.1.19376.1.5.3.1.4.5",
    "2.16.840.1.113883.10.20.1.28",
];

pub const ENCOUNTERS_SECTION: &[&str] = &[
    "1.3.6.1.4.1.19376.1.5.3.1.1.5.3.3",
    "2.16.840.1.113883.10.20.1.3",
];

pub const ENCOUNTER_ENTRY: &[&str] = &[
    "1.3.6.1.4.1.19376.1.5.3.1.4.14",
    "2.16.840.1.113883.10.20.1.21",
];

pub const LOINC: &str = "2.16.840.1.113883.6.1";
pub const SNOMED_CT: &str = "2.16.840.1.113883.6.96";
pub const UCUM: &str = "2.16.840.1.113883.6.8";
pub const ACT_CODE: &str = "2.16.840.1.113883.5.4";

/// LOINC section code for vital signs.
pub const VITAL_SIGNS_CODE: &str = "8716-3";
/// LOINC section code for the problem list.
pub const PROBLEM_LIST_CODE: &str = "11450-4";
/// LOINC section code for encounters.
pub const ENCOUNTERS_CODE: &str = "46240-8";
