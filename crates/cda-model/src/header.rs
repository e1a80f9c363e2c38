//! Document header: who, where, and when, independent of clinical content.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::{CodedValue, ExternalId, TimeInterval};

/// Identifies the patient every fact in an import belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientScope(String);

impl PatientScope {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role a provider played in producing the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderRole {
    Author,
    LegalAuthenticator,
    Authenticator,
    DataEnterer,
    Informant,
    Performer,
    Other(String),
}

impl ProviderRole {
    /// Map a CDA header participation element name to a role.
    pub fn from_element(name: &str) -> Self {
        match name {
            "author" => ProviderRole::Author,
            "legalAuthenticator" => ProviderRole::LegalAuthenticator,
            "authenticator" => ProviderRole::Authenticator,
            "dataEnterer" => ProviderRole::DataEnterer,
            "informant" => ProviderRole::Informant,
            "performer" => ProviderRole::Performer,
            other => ProviderRole::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub role: ProviderRole,
    pub id: Option<ExternalId>,
    pub name: Option<String>,
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Custodian {
    pub id: Option<ExternalId>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHeader {
    pub id: Option<ExternalId>,
    pub code: Option<CodedValue>,
    pub title: Option<String>,
    pub effective_time: Option<DateTime<Utc>>,
    /// Confidentiality code (e.g. `N`, `R`, `V`).
    pub confidentiality: Option<String>,
    pub patient_id: Option<ExternalId>,
    pub participants: Vec<Participant>,
    pub custodian: Option<Custodian>,
    /// `documentationOf/serviceEvent/effectiveTime`, bounding the visit.
    pub service_event: Option<TimeInterval>,
}

impl DocumentHeader {
    pub fn authors(&self) -> impl Iterator<Item = &Participant> {
        self.participants
            .iter()
            .filter(|participant| participant.role == ProviderRole::Author)
    }
}
