// rdl-common/src/manifest.rs
//! The declared dependency manifest of a host application.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::dependency::{Dependency, Relocation};
use crate::error::{RdlError, Result};

/// Supplies the statically declared dependencies and repositories of a host.
///
/// Read once per run; the loader never writes back to it.
pub trait ManifestProvider: Send + Sync {
    fn list_dependencies(&self) -> Result<Vec<Dependency>>;

    fn list_repositories(&self) -> Result<Vec<String>>;

    /// The host's own package relocation, if it declares one. Its target is
    /// used as the private namespace for compatibility relocations.
    fn relocation(&self) -> Option<Relocation> {
        None
    }
}

#[derive(Debug, Deserialize)]
struct DependencyEntry {
    group: String,
    name: String,
    version: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    #[serde(default, rename = "dependency")]
    dependencies: Vec<DependencyEntry>,
    #[serde(default)]
    repositories: Vec<String>,
    relocation: Option<Relocation>,
}

/// A TOML manifest:
///
/// ```toml
/// repositories = ["https://repo.example.org/releases"]
///
/// [relocation]
/// from = "com.example.host"
/// to = "com.example.host.libs"
///
/// [[dependency]]
/// group = "org.spongepowered"
/// name = "configurate-yaml"
/// version = "4.1.2"
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileManifest {
    dependencies: Vec<Dependency>,
    repositories: Vec<String>,
    relocation: Option<Relocation>,
}

impl FileManifest {
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!("Reading manifest from {}", path.display());
        let raw = fs::read_to_string(path).map_err(|e| {
            RdlError::Manifest(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let file: ManifestFile = toml::from_str(raw)?;

        let mut dependencies = Vec::with_capacity(file.dependencies.len());
        for entry in file.dependencies {
            if [&entry.group, &entry.name, &entry.version]
                .iter()
                .any(|part| part.trim().is_empty())
            {
                return Err(RdlError::Manifest(format!(
                    "dependency '{}:{}:{}' has an empty coordinate",
                    entry.group, entry.name, entry.version
                )));
            }
            dependencies.push(Dependency::new(entry.group, entry.name, entry.version));
        }

        for repository in &file.repositories {
            Url::parse(repository).map_err(|e| RdlError::Url(repository.clone(), e))?;
        }

        debug!(
            "Manifest declares {} dependencies and {} repositories",
            dependencies.len(),
            file.repositories.len()
        );
        Ok(Self {
            dependencies,
            repositories: file.repositories,
            relocation: file.relocation,
        })
    }

    pub fn new(dependencies: Vec<Dependency>, repositories: Vec<String>) -> Self {
        Self {
            dependencies,
            repositories,
            relocation: None,
        }
    }

    pub fn with_relocation(mut self, relocation: Relocation) -> Self {
        self.relocation = Some(relocation);
        self
    }
}

impl ManifestProvider for FileManifest {
    fn list_dependencies(&self) -> Result<Vec<Dependency>> {
        Ok(self.dependencies.clone())
    }

    fn list_repositories(&self) -> Result<Vec<String>> {
        Ok(self.repositories.clone())
    }

    fn relocation(&self) -> Option<Relocation> {
        self.relocation.clone()
    }
}
