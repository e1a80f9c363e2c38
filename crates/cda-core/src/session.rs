//! Per-document mutable state threaded through the tree walk.

use cda_model::{
    CodedValue, ConceptRef, DocumentHeader, ImportPolicy, ImportResult, Node, PatientScope,
    TypedValueKind, ValidationIssue, ValidationIssues,
};
use cda_standards::TemplateCatalog;
use tracing::warn;

use crate::store::{RecordRepository, VoidRequest};
use crate::versioning::{Version, VersioningResolver};
use crate::vocabulary::{VocabularyResolver, unresolved};

/// Position in a session's accumulated state, for undoing a skipped section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionMark {
    warnings: usize,
    voids: usize,
    versioning: usize,
}

pub struct ImportSession<'s> {
    scope: &'s PatientScope,
    policy: &'s ImportPolicy,
    header: &'s DocumentHeader,
    catalog: &'s TemplateCatalog,
    vocabulary: &'s VocabularyResolver,
    versioning: VersioningResolver<'s>,
    warnings: ValidationIssues,
    voids: Vec<VoidRequest>,
}

impl<'s> ImportSession<'s> {
    pub fn new(
        scope: &'s PatientScope,
        policy: &'s ImportPolicy,
        header: &'s DocumentHeader,
        catalog: &'s TemplateCatalog,
        vocabulary: &'s VocabularyResolver,
        repository: &'s dyn RecordRepository,
    ) -> Self {
        Self {
            scope,
            policy,
            header,
            catalog,
            vocabulary,
            versioning: VersioningResolver::new(repository, scope, policy),
            warnings: ValidationIssues::new(),
            voids: Vec::new(),
        }
    }

    pub fn scope(&self) -> &PatientScope {
        self.scope
    }

    pub fn policy(&self) -> &ImportPolicy {
        self.policy
    }

    pub fn header(&self) -> &DocumentHeader {
        self.header
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        self.catalog
    }

    pub fn warn(&mut self, issue: ValidationIssue) {
        warn!(code = %issue.code, node = issue.node.as_deref().unwrap_or("-"), "{}", issue.message);
        self.warnings.push(issue);
    }

    /// Record issues that were already reported elsewhere.
    pub fn extend_warnings<I>(&mut self, issues: I)
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        for issue in issues {
            self.warnings.push(issue);
        }
    }

    pub fn warnings(&self) -> &ValidationIssues {
        &self.warnings
    }

    /// Concept for a coded value, created on demand when the policy allows.
    pub fn resolve_concept(
        &mut self,
        coded: &CodedValue,
        shape: TypedValueKind,
    ) -> ImportResult<ConceptRef> {
        if self.policy.auto_create_concepts {
            let system = self.catalog.code_system_name(coded.code_system.trim());
            self.vocabulary.resolve_or_create(coded, shape, system)
        } else {
            self.vocabulary
                .resolve(coded)?
                .ok_or_else(|| unresolved(coded))
        }
    }

    /// Register `member` as a permitted answer of `set`, or reject it under a
    /// strict vocabulary.
    pub fn ensure_member(
        &mut self,
        set: &ConceptRef,
        member: &ConceptRef,
        node: &Node,
    ) -> ImportResult<()> {
        self.vocabulary
            .ensure_member(set, member, self.policy.strict_vocabulary, node)
    }

    /// Accession number and predecessor for a node that becomes a versioned
    /// fact. Any void is queued for the final save.
    pub fn resolve_version(&mut self, node: &Node) -> ImportResult<Version> {
        let version = self.versioning.resolve(node)?;
        for warning in &version.warnings {
            self.warn(warning.clone());
        }
        if let Some(void) = &version.void {
            self.voids.push(void.clone());
        }
        Ok(version)
    }

    pub fn mark(&self) -> SessionMark {
        SessionMark {
            warnings: self.warnings.len(),
            voids: self.voids.len(),
            versioning: self.versioning.mark(),
        }
    }

    /// Drop warnings, voids and claimed accessions recorded since `mark`.
    /// Concepts created in the meantime are kept.
    pub fn rollback(&mut self, mark: SessionMark) {
        self.warnings.truncate(mark.warnings);
        self.voids.truncate(mark.voids);
        self.versioning.rollback(mark.versioning);
    }

    pub fn into_parts(self) -> (ValidationIssues, Vec<VoidRequest>) {
        (self.warnings, self.voids)
    }
}
