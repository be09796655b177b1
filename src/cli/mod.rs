pub mod check;
pub mod index;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{IdKind, MonikerMode, OutputFormat};

#[derive(Parser)]
#[command(
    name = "waypost",
    version,
    about = "Streaming LSIF dump generator for multi-project workspaces",
    long_about = "Waypost consumes a semantic snapshot exported by a compiler frontend and \
                  streams a Language Server Index Format dump: the precomputed graph behind \
                  go-to-definition, find-references, hover and implementations."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index a workspace snapshot into an LSIF dump
    Index(IndexArgs),
    /// Validate the stream properties of an existing dump
    Check {
        /// Path to the dump file (line or array framing)
        #[arg(value_name = "DUMP")]
        dump: PathBuf,
    },
}

#[derive(Args)]
pub struct IndexArgs {
    /// Path to the workspace snapshot (JSON)
    #[arg(value_name = "SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Workspace root anchoring document URIs; defaults to the snapshot's directory
    #[arg(long, value_name = "DIR")]
    pub workspace_root: Option<PathBuf>,

    /// Output file; stdout when omitted
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Output framing
    #[arg(long, value_enum, default_value = "line")]
    pub format: OutputFormat,

    /// ID generation policy
    #[arg(long, value_enum, default_value = "number")]
    pub id: IdKind,

    /// Moniker mode; strict releases document-local state eagerly and
    /// reports suspicious locality decisions
    #[arg(long, value_enum, default_value = "lenient")]
    pub moniker: MonikerMode,

    /// Display name for the first project
    #[arg(long, value_name = "NAME")]
    pub project_name: Option<String>,

    /// Omit document contents from the dump
    #[arg(long)]
    pub no_contents: bool,

    /// Treat each compilation unit as standalone
    #[arg(long)]
    pub no_project_references: bool,

    /// Single package manifest used for export monikers
    #[arg(long, value_name = "MANIFEST")]
    pub package: Option<PathBuf>,

    /// Per-project manifest bindings, as PROJECT=MANIFEST (repeatable)
    #[arg(long = "published-package", value_name = "PROJECT=MANIFEST")]
    pub published_packages: Vec<String>,

    /// Repository URL overriding auto-detected source-control metadata
    #[arg(long, value_name = "URL")]
    pub repository_url: Option<String>,

    /// Probe version control for repository, commit and branch
    #[arg(long)]
    pub probe_repository: bool,

    /// Write the progress trace to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    pub reporter_file: Option<PathBuf>,

    /// Suppress the progress trace entirely
    #[arg(long, conflicts_with = "reporter_file")]
    pub quiet: bool,
}
