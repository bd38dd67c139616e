// rdl-repo/src/layout.rs
//! Maven directory layout: `group/as/dirs/name/version/name-version.ext`.

use std::path::{Path, PathBuf};

use rdl_core::Artifact;
use tracing::warn;
use url::Url;

/// Whether the coordinates stay below a root when used as path segments:
/// no empty, `.` or `..` segment and no separator or drive marker.
pub fn is_safe(artifact: &Artifact) -> bool {
    let group_ok = artifact.group_id.split('.').all(|segment| {
        segment.is_empty() || is_safe_segment(segment)
    }) && !artifact.group_id.trim_matches('.').is_empty();
    group_ok && is_safe_segment(&artifact.artifact_id) && is_safe_segment(&artifact.version)
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', ':', '\0'])
}

/// Directory holding every file of one artifact version, relative to a root.
pub fn version_dir(root: &Path, artifact: &Artifact) -> PathBuf {
    let mut dir = root.to_path_buf();
    for segment in artifact.group_id.split('.').filter(|s| !s.is_empty()) {
        dir.push(segment);
    }
    dir.join(&artifact.artifact_id).join(&artifact.version)
}

pub fn file_name(artifact: &Artifact, extension: &str) -> String {
    format!("{}-{}.{}", artifact.artifact_id, artifact.version, extension)
}

pub fn jar_path(root: &Path, artifact: &Artifact) -> PathBuf {
    version_dir(root, artifact).join(file_name(artifact, "jar"))
}

pub fn module_path(root: &Path, artifact: &Artifact) -> PathBuf {
    version_dir(root, artifact).join(file_name(artifact, "module"))
}

pub fn relocations_path(root: &Path, artifact: &Artifact) -> PathBuf {
    version_dir(root, artifact).join(file_name(artifact, "relocations.json"))
}

/// The local directory behind a repository URL. Only `file` URLs have one.
pub fn local_root(repository: &Url) -> Option<PathBuf> {
    if repository.scheme() != "file" {
        warn!(
            "Skipping repository {}: only file repositories are supported",
            repository
        );
        return None;
    }
    match repository.to_file_path() {
        Ok(path) => Some(path),
        Err(()) => {
            warn!("Skipping repository {}: not a local path", repository);
            None
        }
    }
}
