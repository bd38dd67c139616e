// rdl-core/src/cache.rs
// Persists the resolved dependency graph between runs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rdl_common::config::Config;
use rdl_common::dependency::Dependency;
use rdl_common::error::{RdlError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Bumped whenever the on-disk layout changes; other versions read as a miss.
const CACHE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    format: u32,
    dependencies: Vec<Dependency>,
}

/// Snapshot of the last fully resolved dependency set.
pub struct DependencyCache {
    path: PathBuf,
}

impl DependencyCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cache_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted set. A missing, unreadable or corrupt cache is
    /// a cache miss and yields an empty set.
    pub fn load_cache(&self) -> HashSet<Dependency> {
        if !self.path.is_file() {
            debug!("No dependency cache at {}", self.path.display());
            return HashSet::new();
        }

        match rdl_aio::read_json::<CacheFile>(&self.path) {
            Ok(file) if file.format == CACHE_FORMAT_VERSION => {
                debug!(
                    "Loaded {} cached dependencies from {}",
                    file.dependencies.len(),
                    self.path.display()
                );
                file.dependencies.into_iter().collect()
            }
            Ok(file) => {
                warn!(
                    "Ignoring dependency cache {} with unsupported format {}",
                    self.path.display(),
                    file.format
                );
                HashSet::new()
            }
            Err(e) => {
                warn!(
                    "Ignoring unreadable dependency cache {}: {}",
                    self.path.display(),
                    e
                );
                HashSet::new()
            }
        }
    }

    /// Atomically replaces the snapshot with `dependencies`, transitive
    /// children included.
    pub fn save_cache<'a, I>(&self, dependencies: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Dependency>,
    {
        let mut dependencies: Vec<Dependency> = dependencies.into_iter().cloned().collect();
        dependencies.sort_by_key(|d| d.to_string());

        let file = CacheFile {
            format: CACHE_FORMAT_VERSION,
            dependencies,
        };
        rdl_aio::write_json_atomic(&self.path, &file).map_err(|e| {
            RdlError::Cache(format!(
                "Failed to write dependency cache {}: {e}",
                self.path.display()
            ))
        })?;
        debug!(
            "Saved {} dependencies to {}",
            file.dependencies.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Deletes the snapshot. Returns whether there was one.
    pub fn clear(&self) -> Result<bool> {
        rdl_aio::remove_file_if_exists(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved_set() -> HashSet<Dependency> {
        let mut yaml = Dependency::new("org.spongepowered", "configurate-yaml", "4.1.2");
        yaml.transitive_dependencies = vec![
            Dependency::new("org.yaml", "snakeyaml", "1.33"),
            Dependency::new("org.spongepowered", "configurate-core", "4.1.2"),
        ];
        let mut xseries = Dependency::new("com.github.cryptomorin", "XSeries-xseries", "9.8.0");
        xseries.transitive_resolved = true;
        [yaml, xseries, Dependency::new("com.google.code.gson", "gson", "2.10")]
            .into_iter()
            .collect()
    }

    fn by_identity(set: &HashSet<Dependency>, probe: &Dependency) -> Dependency {
        set.get(probe).cloned().unwrap()
    }

    #[test]
    fn save_then_load_round_trips_nested_transitives() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DependencyCache::new(dir.path().join("lib").join("dependencies.json"));
        let original = resolved_set();

        cache.save_cache(&original).unwrap();
        let loaded = cache.load_cache();

        assert_eq!(loaded, original);
        for dep in &original {
            let back = by_identity(&loaded, dep);
            assert_eq!(back.transitive_resolved, dep.transitive_resolved);
            assert_eq!(back.transitive_dependencies, dep.transitive_dependencies);
        }
    }

    #[test]
    fn missing_cache_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DependencyCache::new(dir.path().join("dependencies.json"));
        assert!(cache.load_cache().is_empty());
    }

    #[test]
    fn corrupt_cache_degrades_to_miss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dependencies.json");
        std::fs::write(&path, b"{\"format\": 1, \"dependencies\": [").unwrap();
        assert!(DependencyCache::new(&path).load_cache().is_empty());
    }

    #[test]
    fn unknown_format_degrades_to_miss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dependencies.json");
        std::fs::write(&path, br#"{"format": 99, "dependencies": []}"#).unwrap();
        assert!(DependencyCache::new(&path).load_cache().is_empty());
    }

    #[test]
    fn save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DependencyCache::new(dir.path().join("dependencies.json"));
        cache.save_cache(&resolved_set()).unwrap();

        let only = Dependency::new("g", "only", "1");
        cache.save_cache([&only]).unwrap();

        let loaded = cache.load_cache();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains(&only));
    }

    #[test]
    fn clear_removes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DependencyCache::new(dir.path().join("dependencies.json"));
        assert!(!cache.clear().unwrap());
        cache.save_cache(&resolved_set()).unwrap();
        assert!(cache.clear().unwrap());
        assert!(cache.load_cache().is_empty());
    }
}
