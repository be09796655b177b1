use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, WaypostError};
use crate::graph::Repository;

pub const MANIFEST_FILE: &str = "package.json";

/// The subset of a package manifest the indexer reads: identity, entry
/// points, the declared dependency map and the repository pointer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub name: String,
    pub version: Option<String>,
    pub main: Option<String>,
    pub typings: Option<String>,
    #[serde(default)]
    pub dependencies: HashMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: HashMap<String, String>,
    pub repository: Option<ManifestRepository>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ManifestRepository {
    Url(String),
    Detailed {
        #[serde(rename = "type")]
        kind: String,
        url: String,
    },
}

impl PackageManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            WaypostError::Configuration(format!("invalid manifest {}: {e}", path.display()))
        })
    }

    pub fn repository(&self) -> Option<Repository> {
        match &self.repository {
            Some(ManifestRepository::Url(url)) => Some(Repository {
                kind: "git".to_string(),
                url: url.clone(),
                commit_id: None,
                branch: None,
            }),
            Some(ManifestRepository::Detailed { kind, url }) => Some(Repository {
                kind: kind.clone(),
                url: url.clone(),
                commit_id: None,
                branch: None,
            }),
            None => None,
        }
    }
}

/// Walks upward from `start` (a file or directory) until a directory holding
/// a package manifest is found. Returns the manifest path.
pub fn find_manifest_upward(start: &Path) -> Option<PathBuf> {
    let mut dir = if start.is_dir() {
        Some(start)
    } else {
        start.parent()
    };
    while let Some(current) = dir {
        let candidate = current.join(MANIFEST_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}
