// rdl-common/src/lib.rs
pub mod config;
pub mod dependency;
pub mod error;
pub mod manifest;

// Re-export key types
pub use config::Config;
pub use dependency::{Dependency, Relocation};
pub use error::{RdlError, Result};
pub use manifest::{FileManifest, ManifestProvider};
