//! Coded value to internal concept resolution.
//!
//! Resolution is idempotent per `(code, code system)`: concurrent imports
//! that meet the same unknown code serialize on a per-key lock, so at most
//! one of them creates the concept and the rest find it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use cda_model::{
    CodedValue, ConceptDatatype, ConceptMapping, ConceptRef, ConceptSpec, ImportError,
    ImportResult, Node, TypedValueKind, ValidationIssue,
};
use tracing::{debug, info, warn};

use crate::store::{ConceptStore, StoreError};

/// Attempts at creating one concept before a store conflict is surfaced.
pub const MAX_CREATE_ATTEMPTS: usize = 3;

#[derive(Default)]
struct KeyedLocks {
    locks: Mutex<HashMap<ConceptMapping, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    fn lock_for(&self, mapping: &ConceptMapping) -> ImportResult<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| poisoned())?;
        Ok(Arc::clone(locks.entry(mapping.clone()).or_default()))
    }
}

fn poisoned() -> ImportError {
    ImportError::from(StoreError::Poisoned)
}

/// Name a newly created concept gets: the source display name, else
/// `<system>:<code>` with the most readable system label available.
pub fn concept_name(coded: &CodedValue, system_name: Option<&str>) -> String {
    if let Some(display) = coded
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|display| !display.is_empty())
    {
        return display.to_string();
    }
    let system = system_name
        .or(coded.code_system_name.as_deref())
        .map(str::trim)
        .filter(|system| !system.is_empty())
        .unwrap_or(coded.code_system.trim());
    format!("{system}:{}", coded.code.trim())
}

pub struct VocabularyResolver {
    store: Arc<dyn ConceptStore>,
    cache: RwLock<HashMap<ConceptMapping, ConceptRef>>,
    locks: KeyedLocks,
}

impl VocabularyResolver {
    pub fn new(store: Arc<dyn ConceptStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
            locks: KeyedLocks::default(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ConceptStore> {
        &self.store
    }

    /// Existing concept for a coded value, without creating anything.
    pub fn resolve(&self, coded: &CodedValue) -> ImportResult<Option<ConceptRef>> {
        let mapping = ConceptMapping::from(coded);
        if mapping.code.is_empty() || mapping.code_system.is_empty() {
            return Ok(None);
        }
        self.lookup(&mapping)
    }

    /// Existing concept, or a new one typed for `shape`.
    pub fn resolve_or_create(
        &self,
        coded: &CodedValue,
        shape: TypedValueKind,
        system_name: Option<&str>,
    ) -> ImportResult<ConceptRef> {
        let mapping = ConceptMapping::from(coded);
        if mapping.code.is_empty() || mapping.code_system.is_empty() {
            return Err(unresolved(coded));
        }
        if let Some(concept) = self.cached(&mapping)? {
            return Ok(concept);
        }

        let lock = self.locks.lock_for(&mapping)?;
        let _guard = lock.lock().map_err(|_| poisoned())?;
        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            if let Some(concept) = self.lookup(&mapping)? {
                return Ok(concept);
            }
            let spec = ConceptSpec {
                mapping: mapping.clone(),
                name: concept_name(coded, system_name),
                datatype: ConceptDatatype::for_value_kind(shape),
            };
            match self.store.create_concept(spec) {
                Ok(concept) => {
                    info!(
                        concept = %concept.id,
                        mapping = %mapping,
                        datatype = ?concept.datatype,
                        "created concept"
                    );
                    self.remember(mapping, concept.clone())?;
                    return Ok(concept);
                }
                Err(StoreError::Conflict(message)) => {
                    warn!(%mapping, attempt, %message, "concept creation conflicted, looking up again");
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(ImportError::PersistenceConflict(format!(
            "concept {mapping} could not be created after {MAX_CREATE_ATTEMPTS} attempts"
        )))
    }

    /// Make `member` a permitted answer of `set`. In strict mode a missing
    /// membership is a validation failure of `node` instead.
    pub fn ensure_member(
        &self,
        set: &ConceptRef,
        member: &ConceptRef,
        strict: bool,
        node: &Node,
    ) -> ImportResult<()> {
        if self.store.is_member(set.id, member.id)? {
            return Ok(());
        }
        if strict {
            let issue = ValidationIssue::error(
                "vocabulary-membership",
                format!("{} is not a permitted member of {}", member.name, set.name),
            )
            .at(node);
            return Err(ImportError::ValidationFailed {
                node: node.to_string(),
                issues: vec![issue].into(),
            });
        }
        self.store.add_member(set.id, member.id)?;
        debug!(set = %set.id, member = %member.id, "added vocabulary member");
        Ok(())
    }

    fn cached(&self, mapping: &ConceptMapping) -> ImportResult<Option<ConceptRef>> {
        let cache = self.cache.read().map_err(|_| poisoned())?;
        Ok(cache.get(mapping).cloned())
    }

    fn lookup(&self, mapping: &ConceptMapping) -> ImportResult<Option<ConceptRef>> {
        if let Some(concept) = self.cached(mapping)? {
            return Ok(Some(concept));
        }
        let found = self.store.find_by_mapping(mapping)?;
        if let Some(concept) = &found {
            self.remember(mapping.clone(), concept.clone())?;
        }
        Ok(found)
    }

    fn remember(&self, mapping: ConceptMapping, concept: ConceptRef) -> ImportResult<()> {
        let mut cache = self.cache.write().map_err(|_| poisoned())?;
        cache.insert(mapping, concept);
        Ok(())
    }
}

pub(crate) fn unresolved(coded: &CodedValue) -> ImportError {
    ImportError::VocabularyUnresolved {
        code: coded.code.clone(),
        code_system: coded.code_system.clone(),
    }
}
