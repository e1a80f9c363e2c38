//! Replacement and duplicate detection for versioned facts.
//!
//! Accession numbers are rendered from node ids through the policy's
//! identifier template and looked up per patient. A `RPLC` reference
//! supersedes the live fact it names; an id that collides with a live fact
//! without one is a duplicate unless the policy allows updating in place.
//! A superseded accession never becomes current again on its own: reusing
//! it is a duplicate, or under `update_existing` a replace of whatever
//! fact superseded it.
//!
//! The resolver also tracks what the current document has claimed and
//! superseded so far, so two entries of one document cannot share an
//! accession or void the same predecessor twice. That bookkeeping is
//! journaled and can be rolled back when an optional section is skipped.

use std::collections::BTreeSet;

use cda_model::{
    ExternalReference, Fragment, FragmentId, ImportError, ImportPolicy, ImportResult, Node,
    PatientScope, ValidationIssue,
};
use tracing::{debug, info};

use crate::store::{RecordRepository, VoidRequest};

/// Void reason recorded on a superseded fact.
pub const REPLACED_REASON: &str = "Replaced";

/// Outcome of resolving one node's identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Version {
    pub accession: Option<String>,
    pub previous_version: Option<FragmentId>,
    pub void: Option<VoidRequest>,
    pub warnings: Vec<ValidationIssue>,
}

#[derive(Debug, Clone)]
enum Claim {
    Accession(String),
    Superseded(String),
}

pub struct VersioningResolver<'s> {
    repository: &'s dyn RecordRepository,
    scope: &'s PatientScope,
    policy: &'s ImportPolicy,
    claimed: BTreeSet<String>,
    superseded: BTreeSet<String>,
    journal: Vec<Claim>,
}

impl<'s> VersioningResolver<'s> {
    pub fn new(
        repository: &'s dyn RecordRepository,
        scope: &'s PatientScope,
        policy: &'s ImportPolicy,
    ) -> Self {
        Self {
            repository,
            scope,
            policy,
            claimed: BTreeSet::new(),
            superseded: BTreeSet::new(),
            journal: Vec::new(),
        }
    }

    /// Live fact named by the first replace reference, if any. Later replace
    /// references are reported as warnings and ignored.
    pub fn resolve_previous(
        &self,
        references: &[ExternalReference],
        node: &Node,
    ) -> ImportResult<(Option<(String, Fragment)>, Vec<ValidationIssue>)> {
        let mut warnings = Vec::new();
        let mut replacements = references.iter().filter(|reference| reference.is_replacement());
        let Some(first) = replacements.next() else {
            return Ok((None, warnings));
        };
        for ignored in replacements {
            warnings.push(
                ValidationIssue::warning(
                    "replacement-ignored",
                    format!("only the first replace reference is honored; ignoring {}", ignored.id),
                )
                .at(node),
            );
        }

        let target = first.id.format(&self.policy.identifier_format);
        match self.live_fact(&target)? {
            Some(fragment) => Ok((Some((target, fragment)), warnings)),
            None => {
                warnings.push(
                    ValidationIssue::warning(
                        "replacement-target-missing",
                        format!("no current fact {target} to replace; importing as new"),
                    )
                    .at(node),
                );
                Ok((None, warnings))
            }
        }
    }

    /// Accession number, predecessor and void for a node about to become a
    /// versioned fact. The accession is claimed for the rest of the document.
    pub fn resolve(&mut self, node: &Node) -> ImportResult<Version> {
        let accession = node
            .id
            .as_ref()
            .map(|id| id.format(&self.policy.identifier_format));
        let (mut previous, warnings) = self.resolve_previous(&node.references, node)?;

        if let Some(accession) = &accession {
            if self.claimed.contains(accession) || self.superseded.contains(accession) {
                return Err(self.duplicate(accession));
            }
            let replaces_own = previous
                .as_ref()
                .is_some_and(|(target, _)| target == accession);
            if !replaces_own && let Some((target, existing)) = self.colliding_fact(accession)? {
                if previous.is_none() && self.policy.update_existing {
                    info!(
                        accession = %accession,
                        replaces = %target,
                        fact = %existing.id,
                        "id collision treated as implicit replace"
                    );
                    previous = Some((target, existing));
                } else {
                    return Err(self.duplicate(accession));
                }
            }
            self.claimed.insert(accession.clone());
            self.journal.push(Claim::Accession(accession.clone()));
        }

        let void = previous.map(|(target, fragment)| {
            debug!(accession = %target, fact = %fragment.id, "superseding fact");
            self.superseded.insert(target.clone());
            self.journal.push(Claim::Superseded(target.clone()));
            VoidRequest {
                fragment: fragment.id,
                accession: target,
                reason: REPLACED_REASON.to_string(),
            }
        });

        Ok(Version {
            accession,
            previous_version: void.as_ref().map(|void| void.fragment),
            void,
            warnings,
        })
    }

    pub fn mark(&self) -> usize {
        self.journal.len()
    }

    /// Forget every claim made since `mark`.
    pub fn rollback(&mut self, mark: usize) {
        while self.journal.len() > mark {
            match self.journal.pop() {
                Some(Claim::Accession(accession)) => {
                    self.claimed.remove(&accession);
                }
                Some(Claim::Superseded(accession)) => {
                    self.superseded.remove(&accession);
                }
                None => break,
            }
        }
    }

    /// A stored fact that is still current, as seen by this document.
    fn live_fact(&self, accession: &str) -> ImportResult<Option<Fragment>> {
        if self.superseded.contains(accession) {
            return Ok(None);
        }
        Ok(self.repository.find_by_accession(accession, self.scope)?)
    }

    /// Stored fact an id collides with: the live fact under `accession`, or,
    /// when that accession was superseded, the fact that currently replaces
    /// it. A superseded accession with no current successor is a collision
    /// that nothing can replace.
    fn colliding_fact(&self, accession: &str) -> ImportResult<Option<(String, Fragment)>> {
        if let Some(existing) = self.live_fact(accession)? {
            return Ok(Some((accession.to_string(), existing)));
        }
        let Some(retired) = self.repository.find_retired(accession, self.scope)? else {
            return Ok(None);
        };
        debug!(accession, fact = %retired.fragment, "id names a superseded fact");
        match retired.current {
            Some((target, current)) if !self.superseded.contains(&target) => {
                Ok(Some((target, current)))
            }
            _ => Err(self.duplicate(accession)),
        }
    }

    fn duplicate(&self, accession: &str) -> ImportError {
        ImportError::DuplicateEntry {
            accession: accession.to_string(),
            patient: self.scope.to_string(),
        }
    }
}
