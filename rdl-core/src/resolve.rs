// rdl-core/src/resolve.rs

use std::collections::HashSet;
use std::sync::Arc;

use rdl_common::dependency::Dependency;
use rdl_common::error::{RdlError, Result};
use tracing::{debug, error};

use crate::collaborator::{Artifact, ResolutionCollaborator, ResolveRequest};

/// One level of transitive flattening per root dependency.
pub struct TransitiveResolver {
    collaborator: Arc<dyn ResolutionCollaborator>,
    excluded: Vec<String>,
    session_id: String,
}

impl TransitiveResolver {
    pub fn new(
        collaborator: Arc<dyn ResolutionCollaborator>,
        excluded: Vec<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            collaborator,
            excluded,
            session_id: session_id.into(),
        }
    }

    pub fn is_excluded(&self, dependency: &Dependency) -> bool {
        dependency.name_matches_any(&self.excluded)
    }

    pub fn isolation_id(&self, dependency: &Dependency) -> String {
        format!("{}_{}", self.session_id, dependency.name())
    }

    /// Populates the transitive fields of `dependency` in place.
    ///
    /// Excluded names are marked resolved without contacting the resolver.
    /// On a resolver failure the dependency keeps an empty transitive list;
    /// the error is logged here and returned for the caller to record.
    pub fn resolve_transitive(&self, dependency: &mut Dependency) -> Result<()> {
        dependency.transitive_dependencies.clear();

        if self.is_excluded(dependency) {
            debug!("Skipping transitive resolution for excluded {}", dependency);
            dependency.transitive_resolved = true;
            return Ok(());
        }
        dependency.transitive_resolved = false;

        let request = ResolveRequest {
            artifact: Artifact::from(&*dependency),
            isolation_id: self.isolation_id(dependency),
            isolated_load: true,
        };

        match self.collaborator.find_transitive(&request) {
            Ok(artifacts) => {
                let mut seen = HashSet::new();
                seen.insert(dependency.coordinates_only());
                dependency.transitive_dependencies = artifacts
                    .into_iter()
                    .map(Dependency::from)
                    .filter(|child| seen.insert(child.clone()))
                    .collect();
                debug!(
                    "Resolved {} transitive dependencies for {}",
                    dependency.transitive_dependencies.len(),
                    dependency
                );
                Ok(())
            }
            Err(e) => {
                error!("Failed to resolve transitive dependencies of {}: {}", dependency, e);
                Err(RdlError::Resolution(dependency.to_string(), e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingResolver {
        requests: Mutex<Vec<ResolveRequest>>,
        fail: bool,
    }

    impl ResolutionCollaborator for RecordingResolver {
        fn find_transitive(&self, request: &ResolveRequest) -> Result<Vec<Artifact>> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(RdlError::Resolution(
                    request.artifact.to_string(),
                    "repository unreachable".into(),
                ));
            }
            Ok(vec![
                Artifact::new("org.yaml", "snakeyaml", "1.33"),
                request.artifact.clone(),
                Artifact::new("org.yaml", "snakeyaml", "1.33"),
                Artifact::new("io.leangen.geantyref", "geantyref", "1.3.13"),
            ])
        }
    }

    fn resolver(collaborator: Arc<RecordingResolver>) -> TransitiveResolver {
        TransitiveResolver::new(collaborator, vec!["xseries".to_string()], "host")
    }

    #[test]
    fn excluded_names_never_reach_the_resolver() {
        let collaborator = Arc::new(RecordingResolver::default());
        let mut dep = Dependency::new("com.github.cryptomorin", "XSeries-xseries", "9.8.0");

        resolver(collaborator.clone()).resolve_transitive(&mut dep).unwrap();

        assert!(dep.transitive_resolved);
        assert!(dep.transitive_dependencies.is_empty());
        assert!(collaborator.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn children_are_flattened_without_self_or_duplicates() {
        let collaborator = Arc::new(RecordingResolver::default());
        let mut dep = Dependency::new("org.spongepowered", "configurate-yaml", "4.1.2");

        resolver(collaborator.clone()).resolve_transitive(&mut dep).unwrap();

        assert!(!dep.transitive_resolved);
        let children: Vec<String> = dep
            .transitive_dependencies
            .iter()
            .map(|d| d.to_string())
            .collect();
        assert_eq!(
            children,
            ["org.yaml:snakeyaml:1.33", "io.leangen.geantyref:geantyref:1.3.13"]
        );
        assert!(dep
            .transitive_dependencies
            .iter()
            .all(|c| c.transitive_dependencies.is_empty()));
    }

    #[test]
    fn request_carries_isolation_id_and_flag() {
        let collaborator = Arc::new(RecordingResolver::default());
        let mut dep = Dependency::new("org.spongepowered", "configurate-yaml", "4.1.2");

        resolver(collaborator.clone()).resolve_transitive(&mut dep).unwrap();

        let requests = collaborator.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].isolation_id, "host_configurate-yaml");
        assert!(requests[0].isolated_load);
        assert_eq!(requests[0].artifact, Artifact::from(&dep));
    }

    #[test]
    fn resolver_failure_leaves_empty_transitives() {
        let collaborator = Arc::new(RecordingResolver {
            fail: true,
            ..Default::default()
        });
        let mut dep = Dependency::new("org.example", "core", "1.0");
        dep.transitive_dependencies
            .push(Dependency::new("org.example", "stale", "0.1"));

        let err = resolver(collaborator).resolve_transitive(&mut dep).unwrap_err();

        assert!(matches!(err, RdlError::Resolution(..)));
        assert!(dep.transitive_dependencies.is_empty());
        assert!(!dep.transitive_resolved);
    }
}
