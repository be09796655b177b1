use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{Result, WaypostError};

/// How graph element IDs are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IdKind {
    #[default]
    Number,
    Uuid,
}

/// Moniker handling mode. `Strict` puts the data manager into `free` mode:
/// document-local state is released as soon as its document closes and
/// suspicious locality decisions are reported. `Lenient` keeps document-local
/// symbols until project close and stays silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MonikerMode {
    Strict,
    #[default]
    Lenient,
}

/// Output framing for the emitted element stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON value per line.
    #[default]
    Line,
    /// A single top-level JSON array.
    Json,
    /// vis.js network data (nodes/edges), for graph visualization.
    Vis,
    /// GraphSON records for graph-database ingestion.
    #[serde(rename = "graphson")]
    #[value(name = "graphson")]
    GraphSon,
}

/// Source-control metadata override, used instead of probing the repository.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOverride {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    pub commit_id: Option<String>,
    pub branch: Option<String>,
}

/// A (manifest, project) pair for multi-package workspaces.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishedPackage {
    pub manifest: PathBuf,
    pub project: String,
}

/// Configuration recognized by the indexing core.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Anchor for document URIs. Must be an absolute path.
    pub workspace_root: PathBuf,
    /// Display name for the first project.
    pub project_name: Option<String>,
    /// Omit document contents from the dump.
    pub no_contents: bool,
    /// Treat each compilation unit as standalone.
    pub no_project_references: bool,
    pub moniker: MonikerMode,
    pub id: IdKind,
    pub output_format: OutputFormat,
    /// Single manifest path used to compute export monikers.
    pub package: Option<PathBuf>,
    /// Per-project manifests for multi-package workspaces.
    pub published_packages: Vec<PublishedPackage>,
    /// Overrides auto-detected source-control metadata.
    pub source: Option<SourceOverride>,
    /// Invoke version control to fill commit and branch information.
    pub probe_repository: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("."),
            project_name: None,
            no_contents: false,
            no_project_references: false,
            moniker: MonikerMode::default(),
            id: IdKind::default(),
            output_format: OutputFormat::default(),
            package: None,
            published_packages: Vec::new(),
            source: None,
            probe_repository: false,
        }
    }
}

impl Config {
    /// Pre-pipeline validation of option combinations.
    pub fn validate(&self) -> Result<()> {
        if self.package.is_some() && !self.published_packages.is_empty() {
            return Err(WaypostError::Configuration(
                "`package` and `publishedPackages` are mutually exclusive".to_string(),
            ));
        }
        if let Some(manifest) = &self.package {
            if !manifest.is_file() {
                return Err(WaypostError::Configuration(format!(
                    "package manifest not found: {}",
                    manifest.display()
                )));
            }
        }
        for published in &self.published_packages {
            if !published.manifest.is_file() {
                return Err(WaypostError::Configuration(format!(
                    "package manifest not found: {}",
                    published.manifest.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_options_are_exclusive() {
        let config = Config {
            package: Some(PathBuf::from("package.json")),
            published_packages: vec![PublishedPackage {
                manifest: PathBuf::from("a/package.json"),
                project: "a".to_string(),
            }],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }
}
