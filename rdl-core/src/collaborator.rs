// rdl-core/src/collaborator.rs
//! Capabilities the loader relies on but does not implement: transitive
//! discovery against artifact repositories, and making an artifact usable by
//! the host process.

use std::fmt;

use rdl_common::dependency::{Dependency, Relocation};
use rdl_common::error::Result;
use url::Url;

/// Plain Maven-style coordinates as exchanged with collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Artifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl Artifact {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }
}

impl From<&Dependency> for Artifact {
    fn from(dependency: &Dependency) -> Self {
        Self::new(dependency.group(), dependency.name(), dependency.version())
    }
}

impl From<Artifact> for Dependency {
    fn from(artifact: Artifact) -> Self {
        Dependency::new(artifact.group_id, artifact.artifact_id, artifact.version)
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub artifact: Artifact,
    /// Scopes resolver-side state to one root resolution.
    pub isolation_id: String,
    pub isolated_load: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub artifact: Artifact,
    pub relocations: Vec<Relocation>,
}

/// Discovers the transitive closure of an artifact.
pub trait ResolutionCollaborator: Send + Sync {
    /// Registers the repositories to search, in priority order.
    fn configure_repositories(&self, _repositories: &[Url]) -> Result<()> {
        Ok(())
    }

    fn find_transitive(&self, request: &ResolveRequest) -> Result<Vec<Artifact>>;
}

/// Fetches an artifact and makes it available to the host.
///
/// Implementations report a locked or in-use target file with an error for
/// which [`RdlError::is_file_contention`] holds; the loader retries those.
///
/// [`RdlError::is_file_contention`]: rdl_common::RdlError::is_file_contention
pub trait LoadCollaborator: Send + Sync {
    fn configure_repositories(&self, _repositories: &[Url]) -> Result<()> {
        Ok(())
    }

    fn load(&self, request: &LoadRequest) -> Result<()>;
}
