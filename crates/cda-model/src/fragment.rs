//! Normalized clinical-record fragments built by an import.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::concept::ConceptRef;
use crate::header::{Participant, PatientScope};
use crate::template::TemplateIdSet;
use crate::value::{CodedValue, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(Uuid);

impl FragmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for FragmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    Visit,
    Encounter,
    Section,
    Obs,
    ActiveListItem,
}

/// One node of the output record tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: FragmentId,
    pub body: FragmentBody,
    /// Child fragments in source order.
    pub children: Vec<Fragment>,
}

impl Fragment {
    pub fn new(body: FragmentBody) -> Self {
        Self {
            id: FragmentId::new(),
            body,
            children: Vec::new(),
        }
    }

    pub fn with_id(id: FragmentId, body: FragmentBody) -> Self {
        Self {
            id,
            body,
            children: Vec::new(),
        }
    }

    pub fn kind(&self) -> FragmentKind {
        self.body.kind()
    }

    /// Accession number of a versioned fact, if this fragment is one.
    pub fn accession_number(&self) -> Option<&str> {
        match &self.body {
            FragmentBody::Obs(obs) => obs.accession_number.as_deref(),
            FragmentBody::ActiveListItem(item) => item.accession_number.as_deref(),
            FragmentBody::Encounter(encounter) => encounter.accession_number.as_deref(),
            FragmentBody::Visit(_) | FragmentBody::Section(_) => None,
        }
    }

    pub fn is_voided(&self) -> bool {
        match &self.body {
            FragmentBody::Obs(obs) => obs.voided,
            FragmentBody::ActiveListItem(item) => item.voided,
            FragmentBody::Encounter(encounter) => encounter.voided,
            FragmentBody::Visit(_) | FragmentBody::Section(_) => false,
        }
    }

    /// Mark a versioned fact as superseded.
    pub fn void(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        match &mut self.body {
            FragmentBody::Obs(obs) => {
                obs.voided = true;
                obs.void_reason = Some(reason);
            }
            FragmentBody::ActiveListItem(item) => {
                item.voided = true;
                item.void_reason = Some(reason);
            }
            FragmentBody::Encounter(encounter) => {
                encounter.voided = true;
                encounter.void_reason = Some(reason);
            }
            FragmentBody::Visit(_) | FragmentBody::Section(_) => {}
        }
    }

    pub fn previous_version(&self) -> Option<FragmentId> {
        match &self.body {
            FragmentBody::Obs(obs) => obs.previous_version,
            FragmentBody::ActiveListItem(item) => item.previous_version,
            FragmentBody::Encounter(encounter) => encounter.previous_version,
            FragmentBody::Visit(_) | FragmentBody::Section(_) => None,
        }
    }

    pub fn as_obs(&self) -> Option<&Obs> {
        match &self.body {
            FragmentBody::Obs(obs) => Some(obs),
            _ => None,
        }
    }

    pub fn find(&self, id: FragmentId) -> Option<&Fragment> {
        self.iter().find(|fragment| fragment.id == id)
    }

    pub fn find_mut(&mut self, id: FragmentId) -> Option<&mut Fragment> {
        if self.id == id {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_mut(id))
    }

    /// Pre-order traversal of this fragment and all descendants.
    pub fn iter(&self) -> FragmentIter<'_> {
        FragmentIter { stack: vec![self] }
    }

    pub fn count(&self, kind: FragmentKind) -> usize {
        self.iter().filter(|fragment| fragment.kind() == kind).count()
    }
}

pub struct FragmentIter<'a> {
    stack: Vec<&'a Fragment>,
}

impl<'a> Iterator for FragmentIter<'a> {
    type Item = &'a Fragment;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FragmentBody {
    Visit(Visit),
    Encounter(Encounter),
    Section(SectionRecord),
    Obs(Obs),
    ActiveListItem(ActiveListItem),
}

impl FragmentBody {
    pub fn kind(&self) -> FragmentKind {
        match self {
            FragmentBody::Visit(_) => FragmentKind::Visit,
            FragmentBody::Encounter(_) => FragmentKind::Encounter,
            FragmentBody::Section(_) => FragmentKind::Section,
            FragmentBody::Obs(_) => FragmentKind::Obs,
            FragmentBody::ActiveListItem(_) => FragmentKind::ActiveListItem,
        }
    }
}

/// Root fragment of an imported document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub patient: PatientScope,
    /// Rendered document id.
    pub document_id: Option<String>,
    pub document_type: Option<CodedValue>,
    pub title: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub stop: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub providers: Vec<Participant>,
    pub confidentiality: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub encounter_type: Option<ConceptRef>,
    pub start: Option<DateTime<Utc>>,
    pub stop: Option<DateTime<Utc>>,
    pub accession_number: Option<String>,
    pub previous_version: Option<FragmentId>,
    pub voided: bool,
    pub void_reason: Option<String>,
}

/// Section-level grouping with its narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub code: Option<CodedValue>,
    pub title: Option<String>,
    pub narrative: Option<String>,
    pub template_ids: TemplateIdSet,
}

/// Observation-like fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obs {
    pub concept: ConceptRef,
    pub value: Option<ObsValue>,
    pub obs_datetime: Option<DateTime<Utc>>,
    pub accession_number: Option<String>,
    pub group_parent: Option<FragmentId>,
    pub encounter: Option<FragmentId>,
    pub previous_version: Option<FragmentId>,
    pub status: Option<Status>,
    pub comment: Option<String>,
    pub voided: bool,
    pub void_reason: Option<String>,
}

impl Obs {
    pub fn new(concept: ConceptRef) -> Self {
        Self {
            concept,
            value: None,
            obs_datetime: None,
            accession_number: None,
            group_parent: None,
            encounter: None,
            previous_version: None,
            status: None,
            comment: None,
            voided: false,
            void_reason: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObsValue {
    Numeric { value: f64, unit: Option<String> },
    Coded { answer: ConceptRef },
    Text { value: String },
    Datetime { value: DateTime<Utc> },
    Complex { media_type: Option<String>, data: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveList {
    Problems,
    Allergies,
}

/// Entry on a patient's active list (e.g. a problem under concern).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveListItem {
    pub list: ActiveList,
    pub concept: ConceptRef,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub status: Option<Status>,
    pub accession_number: Option<String>,
    pub previous_version: Option<FragmentId>,
    pub voided: bool,
    pub void_reason: Option<String>,
}
