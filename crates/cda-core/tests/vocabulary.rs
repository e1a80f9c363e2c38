use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use cda_core::{
    ConceptStore, InMemoryConceptStore, MAX_CREATE_ATTEMPTS, StoreError, VocabularyResolver,
};
use cda_model::{
    CodedValue, ConceptDatatype, ConceptId, ConceptMapping, ConceptRef, ConceptSpec, ImportError,
    Node, NodeKind, TypedValueKind,
};

const LOINC: &str = "2.16.840.1.113883.6.1";

fn systolic() -> CodedValue {
    CodedValue::new("8480-6", LOINC).with_display_name("Systolic blood pressure")
}

#[test]
fn sequential_resolution_is_idempotent() {
    let store = Arc::new(InMemoryConceptStore::new());
    let resolver = VocabularyResolver::new(Arc::clone(&store) as Arc<dyn ConceptStore>);
    let first = resolver
        .resolve_or_create(&systolic(), TypedValueKind::Numeric, Some("LOINC"))
        .expect("first");
    let second = resolver
        .resolve_or_create(&systolic(), TypedValueKind::Numeric, Some("LOINC"))
        .expect("second");
    assert_eq!(first, second);
    assert_eq!(store.len(), 1);
    assert_eq!(first.name, "Systolic blood pressure");
    assert_eq!(first.datatype, ConceptDatatype::Numeric);
}

#[test]
fn whitespace_variants_share_a_concept() {
    let store = Arc::new(InMemoryConceptStore::new());
    let resolver = VocabularyResolver::new(Arc::clone(&store) as Arc<dyn ConceptStore>);
    let plain = resolver
        .resolve_or_create(&CodedValue::new("8480-6", LOINC), TypedValueKind::Numeric, None)
        .expect("plain");
    let padded = resolver
        .resolve_or_create(
            &CodedValue::new(" 8480-6 ", format!(" {LOINC}")),
            TypedValueKind::Numeric,
            None,
        )
        .expect("padded");
    assert_eq!(plain.id, padded.id);
    assert_eq!(store.len(), 1);
}

#[test]
fn concurrent_imports_create_one_concept() {
    let store = Arc::new(InMemoryConceptStore::new());
    let resolver = Arc::new(VocabularyResolver::new(
        Arc::clone(&store) as Arc<dyn ConceptStore>
    ));
    let workers = 8;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                resolver
                    .resolve_or_create(&systolic(), TypedValueKind::Numeric, None)
                    .expect("resolve")
            })
        })
        .collect();
    let concepts: Vec<ConceptRef> = handles
        .into_iter()
        .map(|handle| handle.join().expect("worker"))
        .collect();

    assert_eq!(store.len(), 1);
    assert!(concepts.windows(2).all(|pair| pair[0] == pair[1]));
}

/// Simulates another process winning the creation race once.
struct RacingStore {
    inner: InMemoryConceptStore,
    raced: AtomicUsize,
}

impl ConceptStore for RacingStore {
    fn find_by_mapping(&self, mapping: &ConceptMapping) -> Result<Option<ConceptRef>, StoreError> {
        self.inner.find_by_mapping(mapping)
    }

    fn create_concept(&self, spec: ConceptSpec) -> Result<ConceptRef, StoreError> {
        if self.raced.fetch_add(1, Ordering::SeqCst) == 0 {
            self.inner.create_concept(spec.clone())?;
            return Err(StoreError::Conflict(format!("{} taken", spec.mapping)));
        }
        self.inner.create_concept(spec)
    }

    fn is_member(&self, set: ConceptId, member: ConceptId) -> Result<bool, StoreError> {
        self.inner.is_member(set, member)
    }

    fn add_member(&self, set: ConceptId, member: ConceptId) -> Result<(), StoreError> {
        self.inner.add_member(set, member)
    }
}

#[test]
fn conflict_is_retried_by_looking_up_again() {
    let store = Arc::new(RacingStore {
        inner: InMemoryConceptStore::new(),
        raced: AtomicUsize::new(0),
    });
    let resolver = VocabularyResolver::new(Arc::clone(&store) as Arc<dyn ConceptStore>);
    let concept = resolver
        .resolve_or_create(&systolic(), TypedValueKind::Numeric, None)
        .expect("resolved after conflict");
    assert_eq!(store.inner.len(), 1);
    assert_eq!(store.raced.load(Ordering::SeqCst), 1);
    assert_eq!(
        store
            .inner
            .find_by_mapping(&ConceptMapping::from(&systolic()))
            .expect("lookup"),
        Some(concept)
    );
}

/// Every creation conflicts and nothing is ever found.
struct HostileStore {
    attempts: AtomicUsize,
}

impl ConceptStore for HostileStore {
    fn find_by_mapping(&self, _mapping: &ConceptMapping) -> Result<Option<ConceptRef>, StoreError> {
        Ok(None)
    }

    fn create_concept(&self, spec: ConceptSpec) -> Result<ConceptRef, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Conflict(spec.mapping.to_string()))
    }

    fn is_member(&self, _set: ConceptId, _member: ConceptId) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn add_member(&self, _set: ConceptId, _member: ConceptId) -> Result<(), StoreError> {
        Ok(())
    }
}

#[test]
fn persistent_conflict_surfaces_after_bounded_retries() {
    let store = Arc::new(HostileStore {
        attempts: AtomicUsize::new(0),
    });
    let resolver = VocabularyResolver::new(Arc::clone(&store) as Arc<dyn ConceptStore>);
    let error = resolver
        .resolve_or_create(&systolic(), TypedValueKind::Numeric, None)
        .expect_err("never resolves");
    assert!(matches!(error, ImportError::PersistenceConflict(_)));
    assert!(error.is_retryable());
    assert_eq!(store.attempts.load(Ordering::SeqCst), MAX_CREATE_ATTEMPTS);
}

#[test]
fn strict_membership_rejects_unknown_answers() {
    let store = Arc::new(InMemoryConceptStore::new());
    let resolver = VocabularyResolver::new(Arc::clone(&store) as Arc<dyn ConceptStore>);
    let set = resolver
        .resolve_or_create(
            &CodedValue::new("46680005", "2.16.840.1.113883.6.96"),
            TypedValueKind::None,
            None,
        )
        .expect("set");
    let member = resolver
        .resolve_or_create(&systolic(), TypedValueKind::Numeric, None)
        .expect("member");
    let node = Node::new(NodeKind::Observation);

    let error = resolver
        .ensure_member(&set, &member, true, &node)
        .expect_err("strict");
    let issues = error.issues().expect("validation issues");
    assert_eq!(issues.error_count(), 1);
    assert!(!store.is_member(set.id, member.id).expect("lookup"));

    resolver
        .ensure_member(&set, &member, false, &node)
        .expect("lenient");
    assert!(store.is_member(set.id, member.id).expect("lookup"));
    resolver
        .ensure_member(&set, &member, true, &node)
        .expect("already a member");
}
