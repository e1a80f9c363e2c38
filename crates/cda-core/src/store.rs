//! Persistence collaborators: record repository and concept store.
//!
//! The engine never performs storage I/O itself; it hands a complete
//! [`PersistBatch`] to a [`RecordRepository`] once per document and asks a
//! [`ConceptStore`] for vocabulary. In-memory implementations back the CLI
//! and tests.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::RwLock;

use cda_model::{
    ConceptId, ConceptMapping, ConceptRef, ConceptSpec, Fragment, FragmentId, ImportError,
    PatientScope,
};
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint was violated by a concurrent writer.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StoreError> for ImportError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict(message) => ImportError::PersistenceConflict(message),
            other => ImportError::Persistence(other.to_string()),
        }
    }
}

/// A fact superseded by the batch it travels with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoidRequest {
    pub fragment: FragmentId,
    pub accession: String,
    pub reason: String,
}

/// Everything one document import writes, applied all-or-nothing.
#[derive(Debug, Clone)]
pub struct PersistBatch {
    pub scope: PatientScope,
    pub root: Fragment,
    pub voids: Vec<VoidRequest>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersistedRecord {
    pub scope: PatientScope,
    pub root: Fragment,
    pub voided: Vec<FragmentId>,
    pub saved_at: DateTime<Utc>,
}

impl PersistedRecord {
    pub fn id(&self) -> FragmentId {
        self.root.id
    }
}

/// A fact that was voided and is no longer current for its accession number.
#[derive(Debug, Clone, PartialEq)]
pub struct Retired {
    pub fragment: FragmentId,
    /// Live fact at the end of its replacement chain, with that fact's
    /// accession number.
    pub current: Option<(String, Fragment)>,
}

pub trait RecordRepository: Send + Sync {
    /// Current (non-voided) fact with this accession number for the patient.
    fn find_by_accession(
        &self,
        accession: &str,
        scope: &PatientScope,
    ) -> Result<Option<Fragment>, StoreError>;

    /// The superseded fact last stored under this accession number, when the
    /// accession has no current fact. `None` for accessions never voided.
    fn find_retired(
        &self,
        accession: &str,
        scope: &PatientScope,
    ) -> Result<Option<Retired>, StoreError>;

    /// Persist a fragment tree and apply its voids atomically. Fails with
    /// [`StoreError::Conflict`] when a void target is no longer current or a
    /// new accession collides with a live fact.
    fn save(&self, batch: PersistBatch) -> Result<PersistedRecord, StoreError>;
}

pub trait ConceptStore: Send + Sync {
    fn find_by_mapping(&self, mapping: &ConceptMapping) -> Result<Option<ConceptRef>, StoreError>;

    /// Create a concept registered under `spec.mapping`. Fails with
    /// [`StoreError::Conflict`] if the mapping is already taken.
    fn create_concept(&self, spec: ConceptSpec) -> Result<ConceptRef, StoreError>;

    fn is_member(&self, set: ConceptId, member: ConceptId) -> Result<bool, StoreError>;

    fn add_member(&self, set: ConceptId, member: ConceptId) -> Result<(), StoreError>;
}

type LiveKey = (PatientScope, String);

#[derive(Debug, Default)]
struct RecordTable {
    records: Vec<PersistedRecord>,
    /// Current fact per patient and accession: record index and fragment.
    live: HashMap<LiveKey, (usize, FragmentId)>,
    /// Voided fact per patient and accession, and the fragment that replaced it.
    retired: HashMap<LiveKey, (FragmentId, Option<FragmentId>)>,
}

impl RecordTable {
    fn find(&self, id: FragmentId) -> Option<&Fragment> {
        self.records.iter().find_map(|record| record.root.find(id))
    }

    /// Follow replacements from `next` until a current fact is reached.
    fn current_successor(
        &self,
        scope: &PatientScope,
        mut next: Option<FragmentId>,
    ) -> Option<(String, Fragment)> {
        for _ in 0..=self.retired.len() {
            let fragment = self.find(next?)?;
            let accession = fragment.accession_number()?.to_string();
            if !fragment.is_voided() {
                return Some((accession, fragment.clone()));
            }
            next = self.retired.get(&(scope.clone(), accession))?.1;
        }
        None
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRecordRepository {
    table: RwLock<RecordTable>,
}

impl InMemoryRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.table.read().map_or(0, |table| table.records.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Any stored fragment by id, voided or not.
    pub fn fragment(&self, id: FragmentId) -> Option<Fragment> {
        let table = self.table.read().ok()?;
        table
            .records
            .iter()
            .find_map(|record| record.root.find(id).cloned())
    }

    pub fn records(&self) -> Vec<PersistedRecord> {
        self.table
            .read()
            .map(|table| table.records.clone())
            .unwrap_or_default()
    }
}

impl RecordRepository for InMemoryRecordRepository {
    fn find_by_accession(
        &self,
        accession: &str,
        scope: &PatientScope,
    ) -> Result<Option<Fragment>, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::Poisoned)?;
        let key = (scope.clone(), accession.to_string());
        Ok(table
            .live
            .get(&key)
            .and_then(|(index, id)| table.records.get(*index)?.root.find(*id))
            .cloned())
    }

    fn find_retired(
        &self,
        accession: &str,
        scope: &PatientScope,
    ) -> Result<Option<Retired>, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::Poisoned)?;
        let key = (scope.clone(), accession.to_string());
        Ok(table.retired.get(&key).map(|(fragment, successor)| Retired {
            fragment: *fragment,
            current: table.current_successor(scope, *successor),
        }))
    }

    fn save(&self, batch: PersistBatch) -> Result<PersistedRecord, StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::Poisoned)?;
        let PersistBatch { scope, root, voids } = batch;

        let mut released = HashSet::new();
        for void in &voids {
            let key = (scope.clone(), void.accession.clone());
            match table.live.get(&key) {
                Some((_, id)) if *id == void.fragment => {
                    released.insert(void.accession.as_str());
                }
                _ => {
                    return Err(StoreError::Conflict(format!(
                        "fact {} ({}) is no longer current",
                        void.fragment, void.accession
                    )));
                }
            }
        }

        let mut incoming = BTreeSet::new();
        for fragment in root.iter().filter(|fragment| !fragment.is_voided()) {
            let Some(accession) = fragment.accession_number() else {
                continue;
            };
            if !incoming.insert(accession) {
                return Err(StoreError::Conflict(format!(
                    "accession {accession} appears twice in one record"
                )));
            }
            let key = (scope.clone(), accession.to_string());
            if table.live.contains_key(&key) && !released.contains(accession) {
                return Err(StoreError::Conflict(format!(
                    "accession {accession} already exists for patient {scope}"
                )));
            }
        }

        let mut voided = Vec::with_capacity(voids.len());
        for void in &voids {
            let key = (scope.clone(), void.accession.clone());
            if let Some((index, id)) = table.live.remove(&key)
                && let Some(fragment) = table
                    .records
                    .get_mut(index)
                    .and_then(|record| record.root.find_mut(id))
            {
                fragment.void(void.reason.clone());
                voided.push(id);
            }
            let successor = root
                .iter()
                .find(|fragment| fragment.previous_version() == Some(void.fragment))
                .map(|fragment| fragment.id);
            table.retired.insert(key, (void.fragment, successor));
        }

        let index = table.records.len();
        for fragment in root.iter().filter(|fragment| !fragment.is_voided()) {
            if let Some(accession) = fragment.accession_number() {
                let key = (scope.clone(), accession.to_string());
                table.retired.remove(&key);
                table.live.insert(key, (index, fragment.id));
            }
        }
        let record = PersistedRecord {
            scope,
            root,
            voided,
            saved_at: Utc::now(),
        };
        table.records.push(record.clone());
        Ok(record)
    }
}

#[derive(Debug, Default)]
struct ConceptTable {
    next_id: u64,
    by_mapping: HashMap<ConceptMapping, ConceptRef>,
    specs: BTreeMap<ConceptId, ConceptSpec>,
    members: HashMap<ConceptId, BTreeSet<ConceptId>>,
}

#[derive(Debug, Default)]
pub struct InMemoryConceptStore {
    table: RwLock<ConceptTable>,
}

impl InMemoryConceptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.table.read().map_or(0, |table| table.specs.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn spec(&self, id: ConceptId) -> Option<ConceptSpec> {
        self.table.read().ok()?.specs.get(&id).cloned()
    }
}

impl ConceptStore for InMemoryConceptStore {
    fn find_by_mapping(&self, mapping: &ConceptMapping) -> Result<Option<ConceptRef>, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::Poisoned)?;
        Ok(table.by_mapping.get(mapping).cloned())
    }

    fn create_concept(&self, spec: ConceptSpec) -> Result<ConceptRef, StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::Poisoned)?;
        if table.by_mapping.contains_key(&spec.mapping) {
            return Err(StoreError::Conflict(format!(
                "mapping {} already registered",
                spec.mapping
            )));
        }
        table.next_id += 1;
        let concept = ConceptRef {
            id: ConceptId(table.next_id),
            datatype: spec.datatype,
            name: spec.name.clone(),
        };
        table.by_mapping.insert(spec.mapping.clone(), concept.clone());
        table.specs.insert(concept.id, spec);
        Ok(concept)
    }

    fn is_member(&self, set: ConceptId, member: ConceptId) -> Result<bool, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::Poisoned)?;
        Ok(table
            .members
            .get(&set)
            .is_some_and(|members| members.contains(&member)))
    }

    fn add_member(&self, set: ConceptId, member: ConceptId) -> Result<(), StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::Poisoned)?;
        if !table.specs.contains_key(&set) {
            return Err(StoreError::NotFound(set.to_string()));
        }
        table.members.entry(set).or_default().insert(member);
        Ok(())
    }
}
