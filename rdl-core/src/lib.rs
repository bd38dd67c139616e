// rdl-core/src/lib.rs
//! Resolution, caching and concurrent loading of runtime dependencies.

pub mod cache;
pub mod collaborator;
pub mod context;
pub mod load;
pub mod pipeline;
pub mod progress;
pub mod resolve;

pub use cache::DependencyCache;
pub use collaborator::{
    Artifact, LoadCollaborator, LoadRequest, ResolutionCollaborator, ResolveRequest,
};
pub use context::LoaderContext;
pub use load::{Loader, RetryPolicy};
pub use pipeline::{LoadReport, Orchestrator, TaskOutcome};
pub use progress::{ProgressReporter, ProgressSample};
pub use resolve::TransitiveResolver;
