use serde::{Deserialize, Serialize};

/// Package prefix of the legacy YAML library bundled by older hosts.
pub const LEGACY_YAML_PACKAGE: &str = "org.yaml.snakeyaml";

/// Name markers of artifacts that must see the private YAML copy.
const YAML_MARKERS: [&str; 2] = ["yaml", "configurate"];

/// A package namespace rewrite applied by the loading collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relocation {
    pub from: String,
    pub to: String,
}

impl Relocation {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Relocation rules for the artifact `name`.
    ///
    /// Only YAML-related artifacts get a rule: the legacy YAML package is
    /// moved under `private_namespace`. Everything else loads unrelocated.
    pub fn rules_for(name: &str, private_namespace: &str) -> Vec<Relocation> {
        if YAML_MARKERS.iter().any(|marker| name.contains(marker)) {
            vec![Relocation::new(
                LEGACY_YAML_PACKAGE,
                format!("{private_namespace}.snakeyaml"),
            )]
        } else {
            Vec::new()
        }
    }
}
