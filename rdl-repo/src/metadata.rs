// rdl-repo/src/metadata.rs
//! The subset of Gradle module metadata (`*.module`) needed to find runtime
//! dependencies.

use std::collections::HashMap;

use rdl_core::Artifact;
use serde::Deserialize;

const USAGE_ATTRIBUTE: &str = "org.gradle.usage";
const RUNTIME_USAGE: &str = "java-runtime";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleMetadata {
    pub format_version: String,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

#[derive(Debug, Deserialize)]
pub struct Variant {
    pub name: String,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub dependencies: Vec<ModuleDependency>,
}

#[derive(Debug, Deserialize)]
pub struct ModuleDependency {
    pub group: String,
    pub module: String,
    #[serde(default)]
    pub version: Option<VersionConstraint>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VersionConstraint {
    pub strictly: Option<String>,
    pub requires: Option<String>,
    pub prefers: Option<String>,
}

impl VersionConstraint {
    fn selected(&self) -> Option<&str> {
        self.strictly
            .as_deref()
            .or(self.requires.as_deref())
            .or(self.prefers.as_deref())
    }
}

impl Variant {
    fn is_runtime(&self) -> bool {
        match self.attributes.get(USAGE_ATTRIBUTE) {
            Some(usage) => usage.as_str() == Some(RUNTIME_USAGE),
            None => self.name.contains("runtime"),
        }
    }
}

impl ModuleMetadata {
    /// Direct runtime dependencies, in declaration order, without repeats.
    /// Entries without a version are skipped.
    pub fn runtime_dependencies(&self) -> Vec<Artifact> {
        let mut found: Vec<Artifact> = Vec::new();
        for variant in self.variants.iter().filter(|v| v.is_runtime()) {
            for dependency in &variant.dependencies {
                let Some(version) = dependency.version.as_ref().and_then(|v| v.selected()) else {
                    continue;
                };
                let artifact = Artifact::new(&dependency.group, &dependency.module, version);
                if !found.contains(&artifact) {
                    found.push(artifact);
                }
            }
        }
        found
    }
}
