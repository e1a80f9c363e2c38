//! CLI argument definitions for the CDA importer.

use std::path::PathBuf;

use cda_cli::config::PolicyOverrides;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "cda-import",
    version,
    about = "Import HL7 CDA documents into patient records",
    long_about = "Import HL7 CDA R2 documents into patient records.\n\n\
                  Each node is dispatched by its exact template-id set, validated,\n\
                  and turned into visits, sections, observations and problem-list items."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow clinical values in trace logs.
    ///
    /// Values are protected health information and are redacted by default.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Import documents for one patient.
    Import(ImportArgs),

    /// List registered processors and the template sets they declare.
    Templates,

    /// Print the effective import policy as TOML.
    Policy(PolicyArgs),
}

#[derive(Parser)]
pub struct ImportArgs {
    /// CDA documents to import.
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Patient the documents belong to.
    #[arg(long = "patient", value_name = "ID")]
    pub patient: String,

    #[command(flatten)]
    pub policy: PolicyArgs,

    /// Template catalog TOML to use instead of the bundled one.
    #[arg(long = "catalog", value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Print results as JSON instead of tables.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Args)]
pub struct PolicyArgs {
    /// Import policy TOML file.
    #[arg(long = "policy", value_name = "FILE")]
    pub policy_file: Option<PathBuf>,

    /// Closed vocabulary: no concept creation, no new set members.
    #[arg(long = "strict")]
    pub strict: bool,

    /// Skip rule validation.
    #[arg(long = "no-validate")]
    pub no_validate: bool,

    /// Treat an id collision without a replace reference as a replace.
    #[arg(long = "update-existing")]
    pub update_existing: bool,

    /// Fail on unknown codes instead of creating concepts.
    #[arg(long = "no-auto-create")]
    pub no_auto_create: bool,
}

impl PolicyArgs {
    pub fn overrides(&self) -> PolicyOverrides {
        PolicyOverrides {
            strict: self.strict,
            no_validate: self.no_validate,
            update_existing: self.update_existing,
            no_auto_create: self.no_auto_create,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
