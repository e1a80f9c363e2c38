//! Importing a batch of files against shared in-memory stores.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result, anyhow};
use cda_core::{
    ImportedRecord, Importer, InMemoryConceptStore, InMemoryRecordRepository, VocabularyResolver,
    default_registry,
};
use cda_ingest::XmlDocumentParser;
use cda_model::{ImportPolicy, PatientScope, ValidationIssue};
use cda_standards::TemplateCatalog;
use serde::Serialize;
use tracing::{error, info, info_span};

/// Importer over the bundled registry, the bundled (or given) template
/// catalogue and fresh in-memory stores.
pub fn build_importer(policy: ImportPolicy, catalog: Option<&Path>) -> Result<Importer> {
    let registry = default_registry().context("build processor registry")?;
    let catalog = match catalog {
        Some(path) => TemplateCatalog::load(path)
            .with_context(|| format!("load template catalog {}", path.display()))?,
        None => TemplateCatalog::bundled().context("load bundled template catalog")?,
    };
    Ok(Importer::new(
        registry,
        Arc::new(catalog),
        policy,
        Arc::new(XmlDocumentParser::new()),
        Arc::new(InMemoryRecordRepository::new()),
        Arc::new(VocabularyResolver::new(Arc::new(InMemoryConceptStore::new()))),
    ))
}

#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Result<ImportedRecord>,
}

impl FileOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Import every file on its own worker thread. Outcomes come back in the
/// order of `paths`.
pub fn import_files(importer: &Importer, paths: &[PathBuf], scope: &PatientScope) -> Vec<FileOutcome> {
    thread::scope(|threads| {
        let workers: Vec<_> = paths
            .iter()
            .map(|path| threads.spawn(move || import_file(importer, path, scope)))
            .collect();
        workers
            .into_iter()
            .zip(paths)
            .map(|(worker, path)| FileOutcome {
                path: path.clone(),
                result: worker
                    .join()
                    .unwrap_or_else(|_| Err(anyhow!("import worker panicked"))),
            })
            .collect()
    })
}

fn import_file(importer: &Importer, path: &Path, scope: &PatientScope) -> Result<ImportedRecord> {
    let span = info_span!("file", path = %path.display());
    let _entered = span.enter();
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    match importer.import_document(&bytes, scope) {
        Ok(imported) => {
            info!(warnings = imported.warnings.len(), "imported");
            Ok(imported)
        }
        Err(failure) => {
            error!(error = %failure, "import failed");
            Err(failure).with_context(|| format!("import {}", path.display()))
        }
    }
}

/// Serializable view of one outcome, for `--json` and the summary tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub file: String,
    pub imported: bool,
    pub record: Option<String>,
    /// Versioned facts written (fragments carrying an accession number).
    pub facts: usize,
    pub voided: usize,
    pub warnings: Vec<ValidationIssue>,
    pub error: Option<String>,
}

impl From<&FileOutcome> for FileReport {
    fn from(outcome: &FileOutcome) -> Self {
        let file = outcome.path.display().to_string();
        match &outcome.result {
            Ok(imported) => FileReport {
                file,
                imported: true,
                record: Some(imported.record.id().to_string()),
                facts: imported
                    .root()
                    .iter()
                    .filter(|fragment| fragment.accession_number().is_some())
                    .count(),
                voided: imported.record.voided.len(),
                warnings: imported.warnings.iter().cloned().collect(),
                error: None,
            },
            Err(failure) => FileReport {
                file,
                imported: false,
                record: None,
                facts: 0,
                voided: 0,
                warnings: Vec::new(),
                error: Some(format!("{failure:#}")),
            },
        }
    }
}

pub fn reports(outcomes: &[FileOutcome]) -> Vec<FileReport> {
    outcomes.iter().map(FileReport::from).collect()
}
