//! Import policy loading: a TOML file, then command-line overrides.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use cda_model::ImportPolicy;
use tracing::debug;

/// Flags that adjust a loaded policy. Each flag only ever tightens or
/// switches a setting on; an unset flag leaves the file's value alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyOverrides {
    pub strict: bool,
    pub no_validate: bool,
    pub update_existing: bool,
    pub no_auto_create: bool,
}

impl PolicyOverrides {
    pub fn apply(self, mut policy: ImportPolicy) -> ImportPolicy {
        if self.strict {
            policy.strict_vocabulary = true;
            policy.auto_create_concepts = false;
        }
        if self.no_validate {
            policy.validation_enabled = false;
        }
        if self.update_existing {
            policy.update_existing = true;
        }
        if self.no_auto_create {
            policy.auto_create_concepts = false;
        }
        policy
    }
}

/// Read a policy file. Missing keys keep their defaults.
pub fn load_policy(path: &Path) -> Result<ImportPolicy> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read policy file {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parse policy file {}", path.display()))
}

/// Effective policy: the file (or defaults) with overrides applied.
pub fn resolve_policy(path: Option<&Path>, overrides: PolicyOverrides) -> Result<ImportPolicy> {
    let base = match path {
        Some(path) => load_policy(path)?,
        None => ImportPolicy::default(),
    };
    let policy = overrides.apply(base);
    if !policy.identifier_format.contains("{root}") {
        bail!(
            "identifier_format `{}` has no {{root}} placeholder",
            policy.identifier_format
        );
    }
    debug!(
        validation = policy.validation_enabled,
        strict_vocabulary = policy.strict_vocabulary,
        auto_create = policy.auto_create_concepts,
        update_existing = policy.update_existing,
        "effective import policy"
    );
    Ok(policy)
}

pub fn render_policy(policy: &ImportPolicy) -> Result<String> {
    toml::to_string(policy).context("render policy as TOML")
}
