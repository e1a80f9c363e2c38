use anyhow::{Context, Result};
use cda_cli::config::{render_policy, resolve_policy};
use cda_cli::run::{FileReport, build_importer, import_files, reports};
use cda_cli::summary::templates_table;
use cda_core::default_registry;
use cda_model::PatientScope;
use tracing::{info, info_span};

use crate::cli::{ImportArgs, PolicyArgs};

pub fn run_import(args: &ImportArgs) -> Result<Vec<FileReport>> {
    let scope = PatientScope::new(args.patient.trim());
    let span = info_span!("batch", patient = %scope, files = args.files.len());
    let _entered = span.enter();

    let policy = resolve_policy(args.policy.policy_file.as_deref(), args.policy.overrides())?;
    let importer = build_importer(policy, args.catalog.as_deref())?;
    let outcomes = import_files(&importer, &args.files, &scope);
    let imported = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    info!(imported, failed = outcomes.len() - imported, "batch complete");
    Ok(reports(&outcomes))
}

pub fn run_templates() -> Result<()> {
    let registry = default_registry().context("build processor registry")?;
    println!("{}", templates_table(&registry));
    Ok(())
}

pub fn run_policy(args: &PolicyArgs) -> Result<()> {
    let policy = resolve_policy(args.policy_file.as_deref(), args.overrides())?;
    print!("{}", render_policy(&policy)?);
    Ok(())
}

pub fn print_json(reports: &[FileReport]) -> Result<()> {
    let rendered = serde_json::to_string_pretty(reports).context("render JSON report")?;
    println!("{rendered}");
    Ok(())
}
