use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Result, WaypostError};
use crate::graph::{MonikerKind, Repository, UniquenessLevel};
use crate::package::{find_manifest_upward, PackageManifest};

/// Default moniker scheme and package manager for the npm ecosystem.
pub const SCHEME: &str = "npm";
pub const MANAGER: &str = "npm";

/// A fully resolved moniker, ready for the data manager to intern.
#[derive(Debug, Clone)]
pub struct MonikerSpec {
    pub scheme: String,
    pub identifier: String,
    pub kind: MonikerKind,
    pub unique: UniquenessLevel,
    pub package: Option<PackageSpec>,
}

#[derive(Debug, Clone)]
pub struct PackageSpec {
    pub name: String,
    pub manager: String,
    pub version: String,
    pub repository: Option<Repository>,
}

impl PackageSpec {
    pub fn from_manifest(manifest: &PackageManifest) -> Self {
        Self {
            name: manifest.name.clone(),
            manager: MANAGER.to_string(),
            version: manifest.version.clone().unwrap_or_else(|| "0.0.0".to_string()),
            repository: manifest.repository(),
        }
    }
}

/// Strips the source extension from a file name, treating `.d.ts` as one
/// extension.
pub(crate) fn strip_source_extension(name: &str) -> &str {
    if let Some(stripped) = name.strip_suffix(".d.ts") {
        return stripped;
    }
    match name.rfind('.') {
        Some(index) if index > 0 => &name[..index],
        _ => name,
    }
}

/// The forward-slash module path of `file` relative to `base`, without its
/// source extension. `None` when the file is outside `base`.
pub fn module_path(file: &Path, base: &Path) -> Option<String> {
    let relative = file.strip_prefix(base).ok()?;
    let mut parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let last = parts.pop()?;
    parts.push(strip_source_extension(&last).to_string());
    Some(parts.join("/"))
}

/// The fallback moniker for symbols neither resolver claims: its identifier
/// is the symbol's canonical identity, which is deterministic for a fixed
/// program.
pub fn local_moniker(scheme: &str, identifier: &str) -> MonikerSpec {
    MonikerSpec {
        scheme: scheme.to_string(),
        identifier: identifier.to_string(),
        kind: MonikerKind::Local,
        unique: UniquenessLevel::Document,
        package: None,
    }
}

struct OwnedPackage {
    manifest_path: PathBuf,
    root: PathBuf,
    manifest: PackageManifest,
}

/// Matches symbols to the package their declaration lives in. Lookups walk
/// upward from the declaring file to the owning manifest; the per-directory
/// cache is seeded before project walks so resolution inside a walk stays
/// off the filesystem.
pub struct ImportResolver {
    scheme: String,
    owners: HashMap<PathBuf, Option<Arc<OwnedPackage>>>,
}

impl ImportResolver {
    pub fn new(scheme: &str) -> Self {
        Self {
            scheme: scheme.to_string(),
            owners: HashMap::new(),
        }
    }

    /// Pre-resolves the owning package of every given file.
    pub fn seed<'p>(&mut self, files: impl IntoIterator<Item = &'p Path>) {
        for file in files {
            let _ = self.owner_of(file);
        }
    }

    fn owner_of(&mut self, file: &Path) -> Option<Arc<OwnedPackage>> {
        let dir = file.parent()?.to_path_buf();
        if let Some(cached) = self.owners.get(&dir) {
            return cached.clone();
        }
        let owner = find_manifest_upward(&dir).and_then(|manifest_path| {
            let root = manifest_path.parent()?.to_path_buf();
            match PackageManifest::load(&manifest_path) {
                Ok(manifest) => Some(Arc::new(OwnedPackage {
                    manifest_path,
                    root,
                    manifest,
                })),
                Err(e) => {
                    tracing::warn!(
                        "skipping unreadable manifest {}: {e}",
                        manifest_path.display()
                    );
                    None
                }
            }
        });
        self.owners.insert(dir, owner.clone());
        owner
    }

    /// Returns an `import` moniker when the declaring file belongs to a
    /// package other than the indexing project's own (`own_manifest`).
    pub fn resolve(
        &mut self,
        declaring_file: &Path,
        symbol_path: &str,
        own_manifest: Option<&Path>,
    ) -> Option<MonikerSpec> {
        let owner = self.owner_of(declaring_file)?;
        if own_manifest == Some(owner.manifest_path.as_path()) {
            return None;
        }
        let module = module_path(declaring_file, &owner.root)?;
        Some(MonikerSpec {
            scheme: self.scheme.clone(),
            identifier: format!("{}:{}:{}", owner.manifest.name, module, symbol_path),
            kind: MonikerKind::Import,
            unique: UniquenessLevel::Scheme,
            package: Some(PackageSpec::from_manifest(&owner.manifest)),
        })
    }
}

/// Computes `export` monikers against the current project's manifest.
/// Constructed per project, only when a manifest is bound.
pub struct ExportResolver {
    scheme: String,
    project_root: PathBuf,
    manifest: PackageManifest,
}

impl ExportResolver {
    pub fn new(manifest_path: &Path, project_root: &Path) -> Result<Self> {
        if !manifest_path.is_file() {
            return Err(WaypostError::Configuration(format!(
                "package manifest not found: {}",
                manifest_path.display()
            )));
        }
        Ok(Self {
            scheme: SCHEME.to_string(),
            project_root: project_root.to_path_buf(),
            manifest: PackageManifest::load(manifest_path)?,
        })
    }

    pub fn package(&self) -> PackageSpec {
        PackageSpec::from_manifest(&self.manifest)
    }

    /// Returns an `export` moniker for exported symbols declared under the
    /// project root.
    pub fn resolve(
        &self,
        declaring_file: &Path,
        symbol_path: &str,
        exported: bool,
    ) -> Option<MonikerSpec> {
        if !exported {
            return None;
        }
        let module = module_path(declaring_file, &self.project_root)?;
        Some(MonikerSpec {
            scheme: self.scheme.clone(),
            identifier: format!("{}:{}:{}", self.manifest.name, module, symbol_path),
            kind: MonikerKind::Export,
            unique: UniquenessLevel::Scheme,
            package: Some(self.package()),
        })
    }
}
