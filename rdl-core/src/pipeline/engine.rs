use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rdl_common::dependency::Dependency;
use rdl_common::error::{RdlError, Result};
use rdl_common::manifest::ManifestProvider;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use super::worker::{self, TaskOutcome};
use crate::cache::DependencyCache;
use crate::collaborator::{LoadCollaborator, ResolutionCollaborator};
use crate::context::LoaderContext;
use crate::load::{Loader, RetryPolicy};
use crate::progress::{ProgressReporter, ResolutionProgress};
use crate::resolve::TransitiveResolver;

/// Private namespace used when the manifest declares no relocation.
pub const DEFAULT_PRIVATE_NAMESPACE: &str = "rdl.libs";

/// Summary of a completed load run.
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// Distinct dependencies declared by the manifest.
    pub declared: usize,
    /// Distinct artifacts loaded, transitive children included.
    pub loaded: usize,
    pub cache_hit: bool,
    /// Roots whose transitive discovery failed; they were loaded without
    /// their children.
    pub resolution_failures: Vec<(Dependency, RdlError)>,
    pub elapsed: Duration,
}

impl LoadReport {
    /// `elapsed` cut to whole milliseconds, for display.
    pub fn elapsed_millis(&self) -> Duration {
        let millis = self.elapsed.as_millis();
        Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
    }
}

/// Drives one run: read the cache, resolve what is missing, persist the
/// resolved graph, then load everything.
pub struct Orchestrator {
    context: LoaderContext,
    manifest: Arc<dyn ManifestProvider>,
    resolution: Arc<dyn ResolutionCollaborator>,
    loading: Arc<dyn LoadCollaborator>,
}

impl Orchestrator {
    pub fn new(
        context: LoaderContext,
        manifest: Arc<dyn ManifestProvider>,
        resolution: Arc<dyn ResolutionCollaborator>,
        loading: Arc<dyn LoadCollaborator>,
    ) -> Self {
        Self {
            context,
            manifest,
            resolution,
            loading,
        }
    }

    /// Runs the full sequence and shuts the context down afterwards.
    ///
    /// `on_complete` fires once, and only if every dependency was loaded.
    #[instrument(skip_all, fields(session = %self.context.config().session_id))]
    pub fn load<F: FnOnce()>(self, on_complete: F) -> Result<LoadReport> {
        let result = self.context.block_on(self.run(Instant::now()));

        match &result {
            Ok(report) => {
                info!(
                    "Loaded {} libraries ({} artifacts) in {}.",
                    report.declared,
                    report.loaded,
                    humantime::format_duration(report.elapsed_millis())
                );
                on_complete();
            }
            Err(e) => error!("Failed to load libraries: {}", e),
        }

        self.context.shutdown();
        result
    }

    async fn run(&self, started: Instant) -> Result<LoadReport> {
        let config = self.context.config();
        if config.is_first_run() {
            info!("Initializing first-time setup.. This may take up to a minute depending on your connection.");
        } else {
            info!("Loading libraries... this might take a few seconds.");
        }

        let declared = distinct(self.manifest.list_dependencies()?);
        let repositories =
            collect_repositories(&config.default_repositories, &self.manifest.list_repositories()?)?;
        self.resolution.configure_repositories(&repositories)?;
        self.loading.configure_repositories(&repositories)?;

        let private_namespace = self
            .manifest
            .relocation()
            .map(|relocation| relocation.to)
            .unwrap_or_else(|| DEFAULT_PRIVATE_NAMESPACE.to_string());
        let loader = Arc::new(Loader::new(
            Arc::clone(&self.loading),
            self.context.in_flight(),
            self.context.workers().clone(),
            RetryPolicy::from_config(config),
            private_namespace,
        ));

        let cache = Arc::new(DependencyCache::from_config(config));
        let cached = {
            let cache = Arc::clone(&cache);
            tokio::task::spawn_blocking(move || cache.load_cache())
                .await
                .map_err(|e| RdlError::TaskJoin(e.to_string()))?
        };
        let missing = missing_dependencies(&declared, &cached);
        let declared_count = declared.len();

        let (cache_hit, resolution_failures, outcomes) = if missing.is_empty() {
            info!("Library cache found, loading cached libraries...");
            let cached: Vec<Dependency> = cached.into_iter().collect();
            let outcomes = worker::load_all(&loader, &cached).await?;
            (true, Vec::new(), outcomes)
        } else {
            debug!(
                "{} of {} declared dependencies are not cached: {:?}",
                missing.len(),
                declared_count,
                missing.iter().map(|d| d.to_string()).collect::<Vec<_>>()
            );
            let (resolved, failures) = self.resolve_declared(declared).await;

            // Failed roots are kept with an empty transitive list, so the
            // next run with the same declaration is a cache hit.
            let snapshot = resolved.clone();
            {
                let cache = Arc::clone(&cache);
                tokio::task::spawn_blocking(move || cache.save_cache(&snapshot))
                    .await
                    .map_err(|e| RdlError::TaskJoin(e.to_string()))??;
            }

            let outcomes = worker::load_all(&loader, &resolved).await?;
            (false, failures, outcomes)
        };

        let mut first_failure = None;
        for outcome in &outcomes {
            if let Some(e) = outcome.error() {
                error!("Failed to load {}: {}", outcome.dependency(), e);
                first_failure.get_or_insert_with(|| e.clone());
            }
        }
        if let Some(e) = first_failure {
            return Err(e);
        }

        Ok(LoadReport {
            declared: declared_count,
            loaded: outcomes.len(),
            cache_hit,
            resolution_failures,
            elapsed: started.elapsed(),
        })
    }

    /// Resolves every declared dependency while the progress reporter
    /// samples. Failed roots are kept with an empty transitive list.
    async fn resolve_declared(
        &self,
        declared: Vec<Dependency>,
    ) -> (Vec<Dependency>, Vec<(Dependency, RdlError)>) {
        let config = self.context.config();
        let resolver = Arc::new(TransitiveResolver::new(
            Arc::clone(&self.resolution),
            config.transitive_excluded.clone(),
            config.session_id.clone(),
        ));
        let progress = Arc::new(ResolutionProgress::new(declared.len()));
        let reporter = ProgressReporter::spawn(
            self.context.scheduler(),
            Arc::clone(&progress),
            config.progress_initial_delay,
            config.progress_interval,
        );

        let outcomes =
            worker::resolve_all(self.context.workers(), resolver, declared, progress).await;
        reporter.finish().await;

        let mut resolved = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                TaskOutcome::ResolutionFailed(dep, e) => {
                    warn!("Continuing without transitive dependencies of {}", dep);
                    failures.push((dep.coordinates_only(), e));
                    resolved.push(dep);
                }
                other => resolved.push(other.dependency().clone()),
            }
        }
        (resolved, failures)
    }
}

/// `declared − cached`, compared by coordinates only.
pub fn missing_dependencies(
    declared: &[Dependency],
    cached: &HashSet<Dependency>,
) -> Vec<Dependency> {
    declared
        .iter()
        .filter(|dep| !cached.contains(*dep))
        .cloned()
        .collect()
}

/// Drops repeated identities, keeping the first occurrence.
fn distinct(dependencies: Vec<Dependency>) -> Vec<Dependency> {
    let mut seen = HashSet::new();
    dependencies
        .into_iter()
        .filter(|dep| seen.insert(dep.coordinates_only()))
        .collect()
}

/// Configured defaults first, then the manifest's repositories, without
/// duplicates.
fn collect_repositories(defaults: &[String], declared: &[String]) -> Result<Vec<Url>> {
    let mut repositories: Vec<Url> = Vec::new();
    for raw in defaults.iter().chain(declared) {
        let url = Url::parse(raw).map_err(|e| RdlError::Url(raw.clone(), e))?;
        if !repositories.contains(&url) {
            repositories.push(url);
        }
    }
    Ok(repositories)
}
