use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rdl_common::{Config, Dependency, FileManifest, RdlError, Result};
use rdl_core::{
    Artifact, DependencyCache, LoadCollaborator, LoadRequest, LoaderContext, Orchestrator,
    ResolutionCollaborator, ResolveRequest,
};
use tempfile::TempDir;
use url::Url;

/// In-memory repository standing in for both collaborators.
#[derive(Default)]
struct FakeRepository {
    graph: HashMap<String, Vec<Artifact>>,
    unresolvable: Vec<String>,
    broken: Vec<String>,
    resolve_calls: Mutex<Vec<ResolveRequest>>,
    load_calls: Mutex<HashMap<String, usize>>,
    repositories: Mutex<Vec<Url>>,
}

impl FakeRepository {
    fn with_children(mut self, root: &str, children: &[&str]) -> Self {
        let artifacts = children.iter().map(|c| artifact(c)).collect();
        self.graph.insert(root.to_string(), artifacts);
        self
    }

    fn resolve_count(&self) -> usize {
        self.resolve_calls.lock().unwrap().len()
    }

    fn load_count(&self, coordinates: &str) -> usize {
        self.load_calls
            .lock()
            .unwrap()
            .get(coordinates)
            .copied()
            .unwrap_or(0)
    }

    fn total_loads(&self) -> usize {
        self.load_calls.lock().unwrap().values().sum()
    }
}

impl ResolutionCollaborator for FakeRepository {
    fn configure_repositories(&self, repositories: &[Url]) -> Result<()> {
        *self.repositories.lock().unwrap() = repositories.to_vec();
        Ok(())
    }

    fn find_transitive(&self, request: &ResolveRequest) -> Result<Vec<Artifact>> {
        self.resolve_calls.lock().unwrap().push(request.clone());
        let key = request.artifact.to_string();
        if self.unresolvable.contains(&key) {
            return Err(RdlError::Resolution(key, "not found in any repository".into()));
        }
        std::thread::sleep(Duration::from_millis(5));
        Ok(self.graph.get(&key).cloned().unwrap_or_default())
    }
}

impl LoadCollaborator for FakeRepository {
    fn load(&self, request: &LoadRequest) -> Result<()> {
        let key = request.artifact.to_string();
        *self.load_calls.lock().unwrap().entry(key.clone()).or_insert(0) += 1;
        std::thread::sleep(Duration::from_millis(5));
        if self.broken.contains(&key) {
            return Err(RdlError::LoadError(key, "corrupt archive".into()));
        }
        Ok(())
    }
}

fn artifact(coordinates: &str) -> Artifact {
    let parts: Vec<&str> = coordinates.split(':').collect();
    Artifact::new(parts[0], parts[1], parts[2])
}

fn dependency(coordinates: &str) -> Dependency {
    artifact(coordinates).into()
}

fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::with_data_dir(dir.path());
    config.session_id = "test".to_string();
    config.default_repositories = vec!["https://repo.example.org/maven2".to_string()];
    config.worker_threads = 4;
    config.retry_delay = Duration::from_millis(10);
    config.progress_initial_delay = Duration::from_millis(5);
    config.progress_interval = Duration::from_millis(5);
    config
}

fn run(
    config: Config,
    manifest: FileManifest,
    repository: &Arc<FakeRepository>,
) -> (Result<rdl_core::LoadReport>, usize) {
    let completions = Arc::new(AtomicUsize::new(0));
    let context = LoaderContext::start(config).unwrap();
    let orchestrator = Orchestrator::new(
        context,
        Arc::new(manifest),
        repository.clone(),
        repository.clone(),
    );
    let counter = Arc::clone(&completions);
    let result = orchestrator.load(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (result, completions.load(Ordering::SeqCst))
}

fn manifest(coordinates: &[&str]) -> FileManifest {
    FileManifest::new(
        coordinates.iter().map(|c| dependency(c)).collect(),
        vec!["file:///opt/host-repo".to_string()],
    )
}

#[test]
fn cold_start_resolves_persists_and_loads_everything_once() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let repository = Arc::new(
        FakeRepository::default()
            .with_children(
                "org.spongepowered:configurate-yaml:4.1.2",
                &["org.yaml:snakeyaml:1.33", "io.leangen:geantyref:1.3"],
            )
            .with_children("net.kyori:adventure-api:4.14", &["io.leangen:geantyref:1.3"]),
    );
    let declared = manifest(&[
        "org.spongepowered:configurate-yaml:4.1.2",
        "net.kyori:adventure-api:4.14",
        "com.github.cryptomorin:XSeries-xseries:9.8.0",
        "org.yaml:snakeyaml:1.33",
    ]);

    let (result, completions) = run(config.clone(), declared, &repository);
    let report = result.unwrap();

    assert_eq!(completions, 1);
    assert!(!report.cache_hit);
    assert_eq!(report.declared, 4);
    assert_eq!(report.loaded, 5);
    assert!(report.resolution_failures.is_empty());

    // the excluded root never reaches the resolver
    assert_eq!(repository.resolve_count(), 3);
    let requests = repository.resolve_calls.lock().unwrap();
    assert!(requests
        .iter()
        .all(|r| r.isolation_id == format!("test_{}", r.artifact.artifact_id)));
    drop(requests);

    for coordinates in [
        "org.spongepowered:configurate-yaml:4.1.2",
        "net.kyori:adventure-api:4.14",
        "com.github.cryptomorin:XSeries-xseries:9.8.0",
        "org.yaml:snakeyaml:1.33",
        "io.leangen:geantyref:1.3",
    ] {
        assert_eq!(repository.load_count(coordinates), 1, "{coordinates}");
    }

    let cached = DependencyCache::from_config(&config).load_cache();
    assert_eq!(cached.len(), 4);
    let yaml = cached
        .get(&dependency("org.spongepowered:configurate-yaml:4.1.2"))
        .unwrap();
    assert_eq!(yaml.transitive_dependencies.len(), 2);
    let xseries = cached
        .get(&dependency("com.github.cryptomorin:XSeries-xseries:9.8.0"))
        .unwrap();
    assert!(xseries.transitive_resolved);
    assert!(xseries.transitive_dependencies.is_empty());

    let repositories = repository.repositories.lock().unwrap();
    let repositories: Vec<&str> = repositories.iter().map(Url::as_str).collect();
    assert_eq!(
        repositories,
        ["https://repo.example.org/maven2", "file:///opt/host-repo"]
    );
}

#[test]
fn warm_start_loads_from_cache_without_resolving() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let mut yaml = dependency("org.spongepowered:configurate-yaml:4.1.2");
    yaml.transitive_dependencies = vec![
        dependency("org.yaml:snakeyaml:1.33"),
        dependency("io.leangen:geantyref:1.3"),
    ];
    let gson = dependency("com.google.code.gson:gson:2.10");
    DependencyCache::from_config(&config)
        .save_cache([&yaml, &gson])
        .unwrap();

    let repository = Arc::new(FakeRepository::default());
    let declared = manifest(&[
        "org.spongepowered:configurate-yaml:4.1.2",
        "com.google.code.gson:gson:2.10",
    ]);

    let (result, completions) = run(config, declared, &repository);
    let report = result.unwrap();

    assert_eq!(completions, 1);
    assert!(report.cache_hit);
    assert_eq!(repository.resolve_count(), 0);
    assert_eq!(repository.total_loads(), 4);
    assert_eq!(repository.load_count("io.leangen:geantyref:1.3"), 1);
}

#[test]
fn new_declaration_triggers_full_resolution() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    DependencyCache::from_config(&config)
        .save_cache([&dependency("com.google.code.gson:gson:2.10")])
        .unwrap();

    let repository = Arc::new(FakeRepository::default());
    let declared = manifest(&["com.google.code.gson:gson:2.10", "org.example:extra:1.0"]);

    let (result, completions) = run(config.clone(), declared, &repository);

    assert!(!result.unwrap().cache_hit);
    assert_eq!(completions, 1);
    assert_eq!(repository.resolve_count(), 2);
    assert_eq!(DependencyCache::from_config(&config).load_cache().len(), 2);
}

#[test]
fn resolution_failure_is_contained() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let repository = Arc::new(FakeRepository {
        unresolvable: vec!["org.example:lost:1.0".to_string()],
        ..FakeRepository::default().with_children("org.example:ok:1.0", &["org.example:dep:1.0"])
    });
    let declared = manifest(&["org.example:lost:1.0", "org.example:ok:1.0"]);

    let (result, completions) = run(config.clone(), declared, &repository);
    let report = result.unwrap();

    assert_eq!(completions, 1);
    assert_eq!(report.resolution_failures.len(), 1);
    assert_eq!(
        report.resolution_failures[0].0,
        dependency("org.example:lost:1.0")
    );
    assert_eq!(repository.load_count("org.example:lost:1.0"), 1);
    assert_eq!(repository.load_count("org.example:dep:1.0"), 1);

    // the failed root is persisted with an empty transitive list
    let cached = DependencyCache::from_config(&config).load_cache();
    assert_eq!(cached.len(), 2);
    let lost = cached.get(&dependency("org.example:lost:1.0")).unwrap();
    assert!(lost.transitive_dependencies.is_empty());
    let ok = cached.get(&dependency("org.example:ok:1.0")).unwrap();
    assert_eq!(ok.transitive_dependencies, vec![dependency("org.example:dep:1.0")]);
}

#[test]
fn failed_resolution_does_not_defeat_the_cache() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let repository = Arc::new(FakeRepository {
        unresolvable: vec!["org.example:lost:1.0".to_string()],
        ..FakeRepository::default().with_children("org.example:ok:1.0", &["org.example:dep:1.0"])
    });
    let declared = || manifest(&["org.example:lost:1.0", "org.example:ok:1.0"]);

    let (first, _) = run(config.clone(), declared(), &repository);
    assert!(!first.unwrap().cache_hit);
    assert_eq!(repository.resolve_count(), 2);

    for _ in 0..2 {
        let (again, completions) = run(config.clone(), declared(), &repository);
        assert!(again.unwrap().cache_hit);
        assert_eq!(completions, 1);
    }
    assert_eq!(repository.resolve_count(), 2);
    assert_eq!(repository.load_count("org.example:dep:1.0"), 3);
}

#[test]
fn load_failure_fails_the_run_without_completion() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let repository = Arc::new(FakeRepository {
        broken: vec!["org.example:broken:1.0".to_string()],
        ..Default::default()
    });
    let declared = manifest(&["org.example:broken:1.0", "org.example:fine:1.0"]);

    let (result, completions) = run(config.clone(), declared, &repository);

    assert!(matches!(result, Err(RdlError::LoadError(..))));
    assert_eq!(completions, 0);
    assert_eq!(repository.load_count("org.example:broken:1.0"), 1);
    // the graph was persisted before loading started
    assert_eq!(DependencyCache::from_config(&config).load_cache().len(), 2);
}

#[test]
fn empty_manifest_completes_immediately() {
    let dir = TempDir::new().unwrap();
    let repository = Arc::new(FakeRepository::default());

    let (result, completions) = run(test_config(&dir), manifest(&[]), &repository);

    let report = result.unwrap();
    assert!(report.cache_hit);
    assert_eq!(report.loaded, 0);
    assert_eq!(completions, 1);
    assert_eq!(repository.total_loads(), 0);
}
