// rdl-repo/src/lib.rs
//! Collaborators backed by local Maven-layout repositories.
pub mod layout;
pub mod metadata;
pub mod repository;

pub use metadata::ModuleMetadata;
pub use repository::FileRepository;
