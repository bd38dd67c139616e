// rdl-repo/src/repository.rs
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use rdl_common::error::{RdlError, Result};
use rdl_core::{Artifact, LoadCollaborator, LoadRequest, ResolutionCollaborator, ResolveRequest};
use tracing::{debug, warn};
use url::Url;

use crate::layout;
use crate::metadata::ModuleMetadata;

/// Resolves and installs artifacts from local Maven-layout repositories.
///
/// Installed jars land under `install_dir` in the same layout, with the
/// relocation rules of each load written next to the jar.
pub struct FileRepository {
    roots: RwLock<Vec<PathBuf>>,
    install_dir: PathBuf,
    /// Resolved closures keyed by isolation identifier and root artifact.
    /// The identifier only carries the artifact name, so the root is part
    /// of the key.
    sessions: Mutex<HashMap<(String, Artifact), Vec<Artifact>>>,
}

impl FileRepository {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self::with_roots(install_dir, Vec::new())
    }

    pub fn with_roots(install_dir: impl Into<PathBuf>, roots: Vec<PathBuf>) -> Self {
        Self {
            roots: RwLock::new(roots),
            install_dir: install_dir.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn installed_jar(&self, artifact: &Artifact) -> PathBuf {
        layout::jar_path(&self.install_dir, artifact)
    }

    fn roots(&self) -> Result<Vec<PathBuf>> {
        self.roots
            .read()
            .map(|roots| roots.clone())
            .map_err(|_| RdlError::Runtime("repository roots lock poisoned".to_string()))
    }

    fn set_roots(&self, repositories: &[Url]) -> Result<()> {
        let roots: Vec<PathBuf> = repositories.iter().filter_map(layout::local_root).collect();
        debug!("Using {} local repositories: {:?}", roots.len(), roots);
        let mut guard = self
            .roots
            .write()
            .map_err(|_| RdlError::Runtime("repository roots lock poisoned".to_string()))?;
        *guard = roots;
        Ok(())
    }

    fn find_in_roots(
        roots: &[PathBuf],
        artifact: &Artifact,
        path_of: fn(&Path, &Artifact) -> PathBuf,
    ) -> Option<PathBuf> {
        roots
            .iter()
            .map(|root| path_of(root, artifact))
            .find(|path| path.is_file())
    }

    fn read_metadata(roots: &[PathBuf], artifact: &Artifact) -> Result<Option<ModuleMetadata>> {
        let Some(path) = Self::find_in_roots(roots, artifact, layout::module_path) else {
            return Ok(None);
        };
        rdl_aio::read_json(&path).map(Some).map_err(|e| {
            RdlError::Resolution(
                artifact.to_string(),
                format!("bad module metadata {}: {e}", path.display()),
            )
        })
    }

    fn resolve_closure(roots: &[PathBuf], root: &Artifact) -> Result<Vec<Artifact>> {
        ensure_safe(root, RdlError::Resolution)?;
        let root_metadata = Self::read_metadata(roots, root)?;
        if root_metadata.is_none() && Self::find_in_roots(roots, root, layout::jar_path).is_none()
        {
            return Err(RdlError::Resolution(
                root.to_string(),
                format!("not found in {} repositories", roots.len()),
            ));
        }

        let mut visited = HashSet::from([root.clone()]);
        let mut queue: VecDeque<Artifact> = root_metadata
            .map(|m| m.runtime_dependencies())
            .unwrap_or_default()
            .into();
        let mut closure = Vec::new();

        while let Some(artifact) = queue.pop_front() {
            if !visited.insert(artifact.clone()) {
                continue;
            }
            ensure_safe(&artifact, |coordinates, reason| {
                RdlError::Resolution(root.to_string(), format!("dependency {coordinates} {reason}"))
            })?;
            match Self::read_metadata(roots, &artifact)? {
                Some(metadata) => queue.extend(metadata.runtime_dependencies()),
                None => debug!("No module metadata for {}, treating as leaf", artifact),
            }
            closure.push(artifact);
        }
        Ok(closure)
    }
}

impl ResolutionCollaborator for FileRepository {
    fn configure_repositories(&self, repositories: &[Url]) -> Result<()> {
        self.set_roots(repositories)
    }

    fn find_transitive(&self, request: &ResolveRequest) -> Result<Vec<Artifact>> {
        let session_key = (request.isolation_id.clone(), request.artifact.clone());
        if request.isolated_load {
            let sessions = self
                .sessions
                .lock()
                .map_err(|_| RdlError::Runtime("resolver sessions lock poisoned".to_string()))?;
            if let Some(closure) = sessions.get(&session_key) {
                debug!("Reusing closure of session {}", request.isolation_id);
                return Ok(closure.clone());
            }
        }

        let roots = self.roots()?;
        let closure = Self::resolve_closure(&roots, &request.artifact)?;
        debug!(
            "Resolved {} artifacts for {} (session {})",
            closure.len(),
            request.artifact,
            request.isolation_id
        );

        if request.isolated_load {
            if let Ok(mut sessions) = self.sessions.lock() {
                sessions.insert(session_key, closure.clone());
            }
        }
        Ok(closure)
    }
}

impl LoadCollaborator for FileRepository {
    fn configure_repositories(&self, repositories: &[Url]) -> Result<()> {
        self.set_roots(repositories)
    }

    fn load(&self, request: &LoadRequest) -> Result<()> {
        let artifact = &request.artifact;
        ensure_safe(artifact, RdlError::LoadError)?;
        let roots = self.roots()?;
        let source = Self::find_in_roots(&roots, artifact, layout::jar_path).ok_or_else(|| {
            RdlError::LoadError(
                artifact.to_string(),
                format!("jar not found in {} repositories", roots.len()),
            )
        })?;

        let target = self.installed_jar(artifact);
        if is_same_size(&source, &target) {
            debug!("{} already installed at {}", artifact, target.display());
        } else {
            let bytes = rdl_aio::atomic_copy_file(&source, &target)?;
            debug!("Installed {} ({} bytes) to {}", artifact, bytes, target.display());
        }

        let sidecar = layout::relocations_path(&self.install_dir, artifact);
        if request.relocations.is_empty() {
            rdl_aio::remove_file_if_exists(&sidecar)?;
        } else {
            rdl_aio::write_json_atomic(&sidecar, &request.relocations)?;
        }
        Ok(())
    }
}

fn ensure_safe(artifact: &Artifact, error: impl FnOnce(String, String) -> RdlError) -> Result<()> {
    if layout::is_safe(artifact) {
        Ok(())
    } else {
        warn!("Refusing artifact with unsafe coordinates {}", artifact);
        Err(error(
            artifact.to_string(),
            "has coordinates that are not valid path segments".to_string(),
        ))
    }
}

fn is_same_size(source: &Path, target: &Path) -> bool {
    match (fs::metadata(source), fs::metadata(target)) {
        (Ok(s), Ok(t)) => s.len() == t.len(),
        (Ok(_), Err(_)) => false,
        (Err(e), _) => {
            warn!("Cannot stat {}: {}", source.display(), e);
            false
        }
    }
}
