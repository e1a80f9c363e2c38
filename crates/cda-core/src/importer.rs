//! Single entry point for importing one document.
//!
//! `Start → HeaderParsed → BodyWalked → Saved → Done`. Any error ends the
//! import before `Saved`, so nothing is persisted for a failed document.

use std::fmt;
use std::sync::{Arc, RwLock};

use cda_ingest::{DocumentParser, ParsedDocument};
use cda_model::{
    Fragment, ImportError, ImportPolicy, ImportResult, ParseError, PatientScope, TemplateId,
    ValidationIssue, ValidationIssues,
};
use cda_standards::TemplateCatalog;
use tracing::{debug, info, info_span};

use crate::registry::ProcessorRegistry;
use crate::session::ImportSession;
use crate::store::{PersistBatch, PersistedRecord, RecordRepository};
use crate::vocabulary::VocabularyResolver;
use crate::walker::Walker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImportStage {
    Start,
    HeaderParsed,
    BodyWalked,
    Saved,
    Done,
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ImportStage::Start => "start",
            ImportStage::HeaderParsed => "header-parsed",
            ImportStage::BodyWalked => "body-walked",
            ImportStage::Saved => "saved",
            ImportStage::Done => "done",
        };
        f.write_str(label)
    }
}

/// Which documents a subscriber hears about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscription {
    /// Documents in which any node declares this template id.
    Template(TemplateId),
    Any,
}

impl Subscription {
    pub fn template(id: impl Into<TemplateId>) -> Self {
        Subscription::Template(id.into())
    }

    pub fn matches(&self, document: &ParsedDocument) -> bool {
        match self {
            Subscription::Any => true,
            Subscription::Template(id) => document
                .root
                .iter()
                .any(|node| node.template_ids.contains(id.as_str())),
        }
    }
}

pub type Subscriber = Box<dyn Fn(&ParsedDocument, &PersistedRecord) + Send + Sync>;

/// A persisted document and the warnings collected on the way.
#[derive(Debug, Clone)]
pub struct ImportedRecord {
    pub record: PersistedRecord,
    pub warnings: ValidationIssues,
}

impl ImportedRecord {
    pub fn root(&self) -> &Fragment {
        &self.record.root
    }
}

pub struct Importer {
    registry: Arc<ProcessorRegistry>,
    catalog: Arc<TemplateCatalog>,
    policy: ImportPolicy,
    parser: Arc<dyn DocumentParser>,
    repository: Arc<dyn RecordRepository>,
    vocabulary: Arc<VocabularyResolver>,
    subscribers: RwLock<Vec<(Subscription, Subscriber)>>,
}

impl Importer {
    pub fn new(
        registry: Arc<ProcessorRegistry>,
        catalog: Arc<TemplateCatalog>,
        policy: ImportPolicy,
        parser: Arc<dyn DocumentParser>,
        repository: Arc<dyn RecordRepository>,
        vocabulary: Arc<VocabularyResolver>,
    ) -> Self {
        Self {
            registry,
            catalog,
            policy,
            parser,
            repository,
            vocabulary,
            subscribers: RwLock::new(Vec::new()),
        }
    }

    pub fn policy(&self) -> &ImportPolicy {
        &self.policy
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    /// Notify `callback` after every successful import matching
    /// `subscription`. Callbacks run in registration order.
    pub fn subscribe<F>(&self, subscription: Subscription, callback: F) -> ImportResult<()>
    where
        F: Fn(&ParsedDocument, &PersistedRecord) + Send + Sync + 'static,
    {
        let mut subscribers = self
            .subscribers
            .write()
            .map_err(|_| ImportError::Persistence("subscriber list poisoned".to_string()))?;
        subscribers.push((subscription, Box::new(callback)));
        Ok(())
    }

    pub fn import_document(
        &self,
        bytes: &[u8],
        scope: &PatientScope,
    ) -> ImportResult<ImportedRecord> {
        let span = info_span!("import", patient = %scope);
        let _entered = span.enter();
        stage(ImportStage::Start);
        let document = self.parser.parse(bytes)?;
        self.import_parsed(&document, scope)
    }

    pub fn import_parsed(
        &self,
        document: &ParsedDocument,
        scope: &PatientScope,
    ) -> ImportResult<ImportedRecord> {
        if document.has_errors() {
            return Err(ParseError::Rejected {
                issues: document.issues.clone(),
            }
            .into());
        }

        let mut session = ImportSession::new(
            scope,
            &self.policy,
            &document.header,
            &self.catalog,
            &self.vocabulary,
            self.repository.as_ref(),
        );
        session.extend_warnings(document.issues.iter().cloned().map(ValidationIssue::from));
        stage(ImportStage::HeaderParsed);

        let contract = self.catalog.contract_for(&document.root.template_ids);
        if let Some(contract) = contract {
            debug!(contract = %contract.name, "document contract");
        }
        let root = Walker::new(&self.registry, contract).walk_document(&document.root, &mut session)?;
        stage(ImportStage::BodyWalked);

        let (warnings, voids) = session.into_parts();
        let record = self.repository.save(PersistBatch {
            scope: scope.clone(),
            root,
            voids,
        })?;
        stage(ImportStage::Saved);
        info!(
            record = %record.id(),
            facts = record.root.iter().filter(|fragment| fragment.accession_number().is_some()).count(),
            voided = record.voided.len(),
            warnings = warnings.len(),
            "document imported"
        );

        self.notify(document, &record)?;
        stage(ImportStage::Done);
        Ok(ImportedRecord { record, warnings })
    }

    fn notify(&self, document: &ParsedDocument, record: &PersistedRecord) -> ImportResult<()> {
        let subscribers = self
            .subscribers
            .read()
            .map_err(|_| ImportError::Persistence("subscriber list poisoned".to_string()))?;
        for (subscription, callback) in subscribers.iter() {
            if subscription.matches(document) {
                callback(document, record);
            }
        }
        Ok(())
    }
}

fn stage(stage: ImportStage) {
    debug!(%stage, "import stage");
}
