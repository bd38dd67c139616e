// rdl-common/src/dependency/definition.rs
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// An artifact identified by group/name/version, optionally carrying its
/// resolved transitive children.
///
/// Equality and hashing only look at the coordinates. Two values with the
/// same coordinates but different resolution state are the same dependency
/// for cache and in-flight load lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    group: String,
    name: String,
    version: String,
    /// Set when transitive discovery was skipped on purpose (excluded name).
    #[serde(default)]
    pub transitive_resolved: bool,
    #[serde(default)]
    pub transitive_dependencies: Vec<Dependency>,
}

impl Dependency {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
            transitive_resolved: false,
            transitive_dependencies: Vec::new(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns a copy carrying only the coordinates.
    pub fn coordinates_only(&self) -> Self {
        Self::new(&self.group, &self.name, &self.version)
    }

    /// Whether the name contains any of the given substrings (case-sensitive).
    pub fn name_matches_any<S: AsRef<str>>(&self, patterns: &[S]) -> bool {
        patterns
            .iter()
            .any(|pattern| self.name.contains(pattern.as_ref()))
    }

    /// The children first, then the dependency itself.
    pub fn with_transitives(&self) -> impl Iterator<Item = &Dependency> {
        self.transitive_dependencies
            .iter()
            .chain(std::iter::once(self))
    }
}

impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.group == other.group && self.name == other.name && self.version == other.version
    }
}

impl Eq for Dependency {}

impl Hash for Dependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group.hash(state);
        self.name.hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}
