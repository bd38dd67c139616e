use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use rdl_common::dependency::Dependency;
use rdl_common::error::{RdlError, Result};
use tokio::runtime::Handle;
use tracing::{debug, error};

use crate::load::Loader;
use crate::progress::ResolutionProgress;
use crate::resolve::TransitiveResolver;

/// Result of one resolution or load task.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Resolved(Dependency),
    ResolutionFailed(Dependency, RdlError),
    Loaded(Dependency),
    LoadFailed(Dependency, RdlError),
}

impl TaskOutcome {
    pub fn dependency(&self) -> &Dependency {
        match self {
            TaskOutcome::Resolved(dep)
            | TaskOutcome::ResolutionFailed(dep, _)
            | TaskOutcome::Loaded(dep)
            | TaskOutcome::LoadFailed(dep, _) => dep,
        }
    }

    pub fn error(&self) -> Option<&RdlError> {
        match self {
            TaskOutcome::ResolutionFailed(_, e) | TaskOutcome::LoadFailed(_, e) => Some(e),
            TaskOutcome::Resolved(_) | TaskOutcome::Loaded(_) => None,
        }
    }
}

/// Resolves every dependency concurrently on the worker pool. Returns one
/// outcome per input, in input order, once all of them are done.
pub(super) async fn resolve_all(
    workers: &Handle,
    resolver: Arc<TransitiveResolver>,
    dependencies: Vec<Dependency>,
    progress: Arc<ResolutionProgress>,
) -> Vec<TaskOutcome> {
    let tasks: Vec<_> = dependencies
        .into_iter()
        .map(|mut dependency| {
            let fallback = dependency.coordinates_only();
            let resolver = Arc::clone(&resolver);
            let progress = Arc::clone(&progress);
            let task = workers.spawn_blocking(move || {
                let result = resolver.resolve_transitive(&mut dependency);
                progress.mark_done();
                match result {
                    Ok(()) => TaskOutcome::Resolved(dependency),
                    Err(e) => TaskOutcome::ResolutionFailed(dependency, e),
                }
            });
            (fallback, task)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(tasks.len());
    for (fallback, task) in tasks {
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                error!("Resolution task for {} panicked: {}", fallback, join_error);
                progress.mark_done();
                TaskOutcome::ResolutionFailed(fallback, RdlError::TaskJoin(join_error.to_string()))
            }
        };
        outcomes.push(outcome);
    }
    outcomes
}

/// Loads every dependency and its transitive children concurrently. Returns
/// one outcome per distinct identity once every load has settled.
pub(super) async fn load_all(
    loader: &Arc<Loader>,
    dependencies: &[Dependency],
) -> Result<Vec<TaskOutcome>> {
    let mut identities = Vec::new();
    let mut handles = Vec::new();
    for dependency in dependencies {
        for (identity, handle) in loader.load_with_transitives(dependency)? {
            identities.push(identity);
            handles.push(handle);
        }
    }
    debug!(
        "Waiting on {} load requests for {} dependencies",
        handles.len(),
        dependencies.len()
    );

    let results = join_all(handles).await;

    let mut seen = HashSet::new();
    Ok(identities
        .into_iter()
        .zip(results)
        .filter(|(identity, _)| seen.insert(identity.clone()))
        .map(|(identity, result)| match result {
            Ok(()) => TaskOutcome::Loaded(identity),
            Err(e) => TaskOutcome::LoadFailed(identity, e),
        })
        .collect())
}
