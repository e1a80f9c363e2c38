//! Bundled node processors.
//!
//! Each family module exposes factory functions that build a configured
//! processor. Template-specific processors are enumerated by
//! [`builtin_descriptors`]; the `generic` factories back the per-kind
//! fallbacks of the registry.
//!
//! | Processor | Node kind | Output |
//! |-----------|-----------|--------|
//! | `medical-summary`, `continuity-of-care-document` | Document | Visit |
//! | `vital-signs-section`, `coded-vital-signs-section`, `active-problems-section`, `encounters-section` | Section | Section |
//! | `vital-signs-organizer` | Organizer | Obs group |
//! | `vital-sign-observation` | Observation | Obs |
//! | `problem-concern` | Act | pass-through |
//! | `problem-observation` | Observation | ActiveListItem |
//! | `encounter-entry` | Encounter | Encounter |

pub(crate) mod common;
pub(crate) mod document;
pub(crate) mod encounter;
pub(crate) mod entry;
pub(crate) mod organizer;
pub(crate) mod reference;
pub(crate) mod section;

use cda_standards::ids;

use crate::registry::ProcessorDescriptor;

/// Every template-specific processor shipped with the engine.
pub fn builtin_descriptors() -> Vec<ProcessorDescriptor> {
    vec![
        ProcessorDescriptor::new(
            document::MEDICAL_SUMMARY,
            ids::MEDICAL_SUMMARY_DOCUMENT,
            document::medical_summary,
        ),
        ProcessorDescriptor::new(
            document::CONTINUITY_OF_CARE,
            ids::CCD_DOCUMENT_SET,
            document::continuity_of_care,
        ),
        ProcessorDescriptor::new(
            section::VITAL_SIGNS,
            ids::VITAL_SIGNS_SECTION,
            section::vital_signs,
        ),
        ProcessorDescriptor::new(
            section::CODED_VITAL_SIGNS,
            ids::CODED_VITAL_SIGNS_SECTION,
            section::coded_vital_signs,
        ),
        ProcessorDescriptor::new(
            section::ACTIVE_PROBLEMS,
            ids::ACTIVE_PROBLEMS_SECTION,
            section::active_problems,
        ),
        ProcessorDescriptor::new(
            section::ENCOUNTERS,
            ids::ENCOUNTERS_SECTION,
            section::encounters,
        ),
        ProcessorDescriptor::new(
            organizer::VITAL_SIGNS_ORGANIZER,
            ids::VITAL_SIGNS_ORGANIZER,
            organizer::vital_signs,
        ),
        ProcessorDescriptor::new(
            entry::VITAL_SIGN_OBSERVATION,
            ids::VITAL_SIGN_OBSERVATION,
            entry::vital_sign,
        ),
        ProcessorDescriptor::new(
            entry::PROBLEM_CONCERN,
            ids::PROBLEM_CONCERN_ENTRY,
            entry::problem_concern,
        ),
        ProcessorDescriptor::new(
            entry::PROBLEM_OBSERVATION,
            ids::PROBLEM_OBSERVATION,
            entry::problem_observation,
        ),
        ProcessorDescriptor::new(
            encounter::ENCOUNTER_ENTRY,
            ids::ENCOUNTER_ENTRY,
            encounter::encounter_entry,
        ),
    ]
}
