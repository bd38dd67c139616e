// rdl-core/src/load.rs

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use rdl_common::config::Config;
use rdl_common::dependency::{Dependency, Relocation};
use rdl_common::error::{RdlError, Result};
use tokio::runtime::Handle;
use tracing::{debug, error, warn};

use crate::collaborator::{Artifact, LoadCollaborator, LoadRequest};

/// A load that is running or has finished. Every clone resolves to the same
/// outcome.
pub type LoadHandle = Shared<BoxFuture<'static, Result<()>>>;

/// Identity-keyed loads of the current run.
pub type InFlightLoads = Arc<Mutex<HashMap<Dependency, LoadHandle>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            attempts: config.retry_attempts,
            delay: config.retry_delay,
        }
    }
}

/// Runs `operation` until it succeeds, retrying filesystem-contention
/// failures up to `policy.attempts` times in total with a fixed delay in
/// between. Any other failure is returned immediately.
pub async fn retry_with_delay<T, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_file_contention() => {
                if attempt >= policy.attempts {
                    error!("{} still in use after {} attempts: {}", label, attempt, e);
                    return Err(RdlError::RetriesExhausted(
                        label.to_string(),
                        attempt,
                        Box::new(e),
                    ));
                }
                warn!(
                    "{} is in use (attempt {}/{}), retrying in {:?}",
                    label, attempt, policy.attempts, policy.delay
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Loads dependencies through the load collaborator, at most once per
/// identity per run.
pub struct Loader {
    collaborator: Arc<dyn LoadCollaborator>,
    in_flight: InFlightLoads,
    workers: Handle,
    retry: RetryPolicy,
    private_namespace: String,
}

impl Loader {
    pub fn new(
        collaborator: Arc<dyn LoadCollaborator>,
        in_flight: InFlightLoads,
        workers: Handle,
        retry: RetryPolicy,
        private_namespace: impl Into<String>,
    ) -> Self {
        Self {
            collaborator,
            in_flight,
            workers,
            retry,
            private_namespace: private_namespace.into(),
        }
    }

    pub fn load_request(&self, dependency: &Dependency) -> LoadRequest {
        LoadRequest {
            artifact: Artifact::from(dependency),
            relocations: Relocation::rules_for(dependency.name(), &self.private_namespace),
        }
    }

    /// Starts loading `dependency`, or attaches to the load already started
    /// for the same identity.
    pub fn load(self: &Arc<Self>, dependency: &Dependency) -> Result<LoadHandle> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|_| RdlError::Runtime("in-flight load map poisoned".to_string()))?;

        match in_flight.entry(dependency.coordinates_only()) {
            Entry::Occupied(existing) => {
                debug!("Attaching to in-flight load of {}", dependency);
                Ok(existing.get().clone())
            }
            Entry::Vacant(slot) => {
                let loader = Arc::clone(self);
                let target = slot.key().clone();
                let task = self
                    .workers
                    .spawn(async move { loader.load_now(target).await });
                let handle = async move {
                    match task.await {
                        Ok(result) => result,
                        Err(e) => Err(RdlError::TaskJoin(e.to_string())),
                    }
                }
                .boxed()
                .shared();
                Ok(slot.insert(handle).clone())
            }
        }
    }

    /// Starts the loads of every transitive child and of `dependency` itself.
    pub fn load_with_transitives(
        self: &Arc<Self>,
        dependency: &Dependency,
    ) -> Result<Vec<(Dependency, LoadHandle)>> {
        dependency
            .with_transitives()
            .map(|dep| {
                self.load(dep)
                    .map(|handle| (dep.coordinates_only(), handle))
            })
            .collect()
    }

    async fn load_now(&self, dependency: Dependency) -> Result<()> {
        let request = self.load_request(&dependency);
        debug!(
            "Loading {} ({} relocation rule(s))",
            dependency,
            request.relocations.len()
        );

        let label = dependency.to_string();
        retry_with_delay(self.retry, &label, || {
            let collaborator = Arc::clone(&self.collaborator);
            let request = request.clone();
            async move {
                tokio::task::spawn_blocking(move || collaborator.load(&request))
                    .await
                    .map_err(|e| RdlError::TaskJoin(e.to_string()))?
            }
        })
        .await?;

        debug!("Loaded {}", dependency);
        Ok(())
    }
}
